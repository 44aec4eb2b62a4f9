/// Node walks over the treetop list.
///
/// Both walks keep an explicit stack, so tree depth never touches the call
/// stack. Null children and handles that do not resolve are skipped; the
/// soundness rule is what reports them.

use crate::checklist::NodeChecklist;
use jitval_tril::il::TreeTopIter;
use jitval_tril::{MethodIl, NodeId, TreeTopId};

/// Every node reachable from the treetops, each once, in preorder.
pub fn preorder_nodes(il: &MethodIl) -> Vec<NodeId> {
    let mut visited = NodeChecklist::with_capacity(il.node_capacity());
    let mut order = Vec::with_capacity(il.node_capacity());
    let mut stack = vec![];

    for tt in il.treetops() {
        let Some(root) = il.treetop(tt).and_then(|t| t.node) else { continue };
        stack.push(root);
        while let Some(id) = stack.pop() {
            let Some(node) = il.node(id) else { continue };
            if !visited.add(id) {
                continue;
            }
            order.push(id);
            for child in node.children.iter().rev().flatten() {
                if !visited.contains(*child) {
                    stack.push(*child);
                }
            }
        }
    }
    order
}

struct Frame {
    node: NodeId,
    next_child: usize,
}

/// Postorder walk that yields every *occurrence* of a node.
///
/// A node's children are only walked on its first occurrence; later
/// references to it yield the node alone. Each item carries the treetop the
/// occurrence was found under.
pub struct PostorderOccurrences<'a> {
    il: &'a MethodIl,
    treetops: TreeTopIter<'a>,
    current: Option<TreeTopId>,
    stack: Vec<Frame>,
    visited: NodeChecklist,
}

impl<'a> PostorderOccurrences<'a> {
    pub fn new(il: &'a MethodIl) -> Self {
        Self {
            il,
            treetops: il.treetops(),
            current: None,
            stack: vec![],
            visited: NodeChecklist::with_capacity(il.node_capacity()),
        }
    }

    /// Visit `id`: a repeat occurrence is returned right away, a first one is
    /// pushed so its children come out first.
    fn enter(&mut self, id: NodeId) -> Option<NodeId> {
        if self.il.node(id).is_none() {
            return None;
        }
        if !self.visited.add(id) {
            return Some(id);
        }
        self.stack.push(Frame { node: id, next_child: 0 });
        None
    }
}

impl<'a> Iterator for PostorderOccurrences<'a> {
    type Item = (TreeTopId, NodeId);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(frame) = self.stack.last_mut() {
                let children = self.il.node(frame.node).map_or(&[][..], |n| &n.children[..]);
                if let Some(child) = children.get(frame.next_child).copied() {
                    frame.next_child += 1;
                    if let Some(child) = child {
                        if let Some(repeat) = self.enter(child) {
                            return self.current.map(|tt| (tt, repeat));
                        }
                    }
                    continue;
                }
                let done = self.stack.pop()?;
                return self.current.map(|tt| (tt, done.node));
            }

            let tt = self.treetops.next()?;
            self.current = Some(tt);
            if let Some(root) = self.il.treetop(tt).and_then(|t| t.node) {
                if let Some(repeat) = self.enter(root) {
                    return Some((tt, repeat));
                }
            }
        }
    }
}
