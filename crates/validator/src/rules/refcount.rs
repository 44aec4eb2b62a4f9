/// Declared reference counts must match the uses inside one extended block.
///
/// Pass 1 walks the block's trees and counts every reference down from the
/// declared count; pass 2 walks them again and flags every node whose count
/// did not land on zero. A positive remainder means the node is also used
/// outside the block (or over-counted); a negative one means it is used more
/// often than declared.

use super::{BlockValidationRule, RuleId};
use crate::checklist::NodeChecklist;
use crate::diagnostics::RuleContext;
use crate::error::ValidationError;
use crate::node_state::NodeSideTable;
use jitval_tril::{MethodIl, NodeId, TreeTopId};

#[derive(Debug, Default)]
pub struct ValidateNodeRefCountWithinBlock {
    checklist: NodeChecklist,
}

impl ValidateNodeRefCountWithinBlock {
    pub fn new() -> Self {
        Self::default()
    }

    fn block_roots(il: &MethodIl, first: TreeTopId, exit: TreeTopId) -> Vec<NodeId> {
        let mut roots = vec![];
        let mut current = Some(first);
        let mut remaining = il.num_treetops();
        while let Some(tt) = current {
            if remaining == 0 {
                break;
            }
            remaining -= 1;
            if let Some(root) = il.treetop(tt).and_then(|t| t.node) {
                roots.push(root);
            }
            if tt == exit {
                break;
            }
            current = il.next_treetop(tt);
        }
        roots
    }

    fn count_references(&mut self, il: &MethodIl, root: NodeId, scratch: &mut NodeSideTable<i64>) {
        if !self.checklist.add(root) {
            return;
        }
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = il.node(id) else { continue };
            for child in node.children.iter().rev().flatten() {
                let Some(child_node) = il.node(*child) else { continue };
                if self.checklist.contains(*child) {
                    if let Some(count) = scratch.get_mut(*child) {
                        *count -= 1;
                    }
                } else {
                    self.checklist.add(*child);
                    scratch.insert(*child, child_node.reference_count as i64 - 1);
                    stack.push(*child);
                }
            }
        }
    }

    fn check_counts(
        &mut self,
        il: &MethodIl,
        root: NodeId,
        scratch: &NodeSideTable<i64>,
        cx: &mut RuleContext<'_>,
    ) -> Result<(), ValidationError> {
        if !self.checklist.add(root) {
            return Ok(());
        }
        // Postorder, last child first.
        let mut stack: Vec<(NodeId, usize)> = vec![(root, 0)];
        while let Some(frame) = stack.last_mut() {
            let (id, done) = *frame;
            let Some(node) = il.node(id) else {
                stack.pop();
                continue;
            };
            let len = node.children.len();
            if done < len {
                frame.1 += 1;
                if let Some(child) = node.children[len - 1 - done] {
                    if il.node(child).is_some() && self.checklist.add(child) {
                        stack.push((child, 0));
                    }
                }
                continue;
            }
            stack.pop();
            let remaining = scratch.get(id).copied().unwrap_or(0);
            cx.check(node, remaining == 0, || {
                format!("Node accessed outside of its (extended) basic block: {} time(s)", remaining)
            })?;
        }
        Ok(())
    }
}

impl BlockValidationRule for ValidateNodeRefCountWithinBlock {
    fn id(&self) -> RuleId {
        RuleId::ValidateNodeRefCountWithinBlock
    }

    fn validate(
        &mut self,
        first: TreeTopId,
        exit: TreeTopId,
        cx: &mut RuleContext<'_>,
    ) -> Result<(), ValidationError> {
        let il = cx.il();
        let roots = Self::block_roots(il, first, exit);
        let mut scratch: NodeSideTable<i64> = NodeSideTable::new(il.node_capacity());

        self.checklist.clear();
        for &root in &roots {
            if let Some(node) = il.node(root) {
                scratch.insert(root, node.reference_count as i64);
            }
            self.count_references(il, root, &mut scratch);
        }

        self.checklist.clear();
        for &root in &roots {
            self.check_counts(il, root, &scratch, cx)?;
        }
        Ok(())
    }
}
