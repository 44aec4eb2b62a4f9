/// Soundness: the treetop list and the node graph are well formed.
///
/// Everything else (iterators, the other rules) presupposes this, so the walk
/// here follows raw links only and every failure is fatal.
///
/// 1. The start treetop exists; a stop treetop, if set, wraps a node.
/// 2. Walking `next` links from start to stop, every treetop wraps a node
///    that is not already the root of another treetop, and every `next`
///    treetop links back.
/// 3. Under every treetop root, children are present and no node is its own
///    ancestor.

use super::{MethodValidationRule, RuleId};
use crate::checklist::NodeChecklist;
use crate::diagnostics::RuleContext;
use crate::error::ValidationError;
use jitval_tril::il::Node;
use jitval_tril::{MethodIl, NodeId, TreeTopId};

#[derive(Debug, Default)]
pub struct SoundnessRule {
    treetop_nodes: NodeChecklist,
    ancestors: NodeChecklist,
    visited: NodeChecklist,
}

impl SoundnessRule {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_node_soundness(
        &mut self,
        il: &MethodIl,
        location: &Node,
        root: NodeId,
        cx: &mut RuleContext<'_>,
    ) -> Result<(), ValidationError> {
        // (node, next child index); a node is on the ancestor set while its frame is live.
        let mut stack: Vec<(NodeId, usize)> = vec![];
        self.enter(root, &mut stack, location, cx)?;

        while let Some(frame) = stack.last_mut() {
            let (id, index) = *frame;
            let children = il.node(id).map_or(&[][..], |n| &n.children[..]);
            let Some(&child) = children.get(index) else {
                stack.pop();
                self.ancestors.remove(id);
                continue;
            };
            frame.1 += 1;

            match child.filter(|c| il.node(*c).is_some()) {
                Some(child) => self.enter(child, &mut stack, location, cx)?,
                None => {
                    return cx.unsound(Some(location), format!("{} child {} must not be NULL", id, index));
                }
            }
        }
        Ok(())
    }

    fn enter(
        &mut self,
        id: NodeId,
        stack: &mut Vec<(NodeId, usize)>,
        location: &Node,
        cx: &mut RuleContext<'_>,
    ) -> Result<(), ValidationError> {
        cx.check_sound(Some(location), !self.ancestors.contains(id), || {
            format!("{} must not be its own ancestor", id)
        })?;
        if !self.visited.add(id) {
            return Ok(());
        }
        self.ancestors.add(id);
        stack.push((id, 0));
        Ok(())
    }
}

impl MethodValidationRule for SoundnessRule {
    fn id(&self) -> RuleId {
        RuleId::SoundnessRule
    }

    fn validate(&mut self, il: &MethodIl, cx: &mut RuleContext<'_>) -> Result<(), ValidationError> {
        self.treetop_nodes.clear();
        self.ancestors.clear();
        self.visited.clear();

        let Some(start) = il.first_treetop() else {
            return cx.unsound(None, "Start tree must exist");
        };
        let stop = il.stop_treetop();
        if let Some(stop) = stop {
            cx.check_sound(None, il.treetop_node(stop).is_some(), || {
                "Stop tree must have a node".to_string()
            })?;
        }

        let mut current = start;
        loop {
            if Some(current) == stop {
                break;
            }
            let Some(treetop) = il.treetop(current) else {
                return cx.unsound(None, format!("Tree {} does not exist", describe(current)));
            };
            let Some(node) = treetop.node.and_then(|n| il.node(n)) else {
                return cx.unsound(None, "Tree must have a node");
            };
            let id = node.global_index();

            cx.check_sound(Some(node), !self.treetop_nodes.contains(id), || {
                format!("Treetop node {} encountered twice", id)
            })?;
            self.treetop_nodes.add(id);

            match treetop.next {
                Some(next) => {
                    let next_node = il.treetop_node(next);
                    cx.check_sound(Some(node), next_node.is_some(), || {
                        format!("Tree after {} must have a node", id)
                    })?;
                    let back = il.treetop(next).and_then(|t| t.prev);
                    cx.check_sound(Some(node), back == Some(current), || {
                        let back_node = back
                            .and_then(|b| il.treetop_node(b))
                            .map_or("NULL".to_string(), |n| n.global_index().to_string());
                        let next_id = next_node.map_or("NULL".to_string(), |n| n.global_index().to_string());
                        format!(
                            "Doubly-linked treetop list must be consistent: {}->{}<-{}",
                            id, next_id, back_node
                        )
                    })?;
                }
                None => {
                    cx.check_sound(Some(node), stop.is_none(), || {
                        let stop_node = stop
                            .and_then(|s| il.treetop_node(s))
                            .map_or(NodeId(0), |n| n.global_index());
                        format!(
                            "Reached the end of the trees after {} without encountering the stop tree {}",
                            id, stop_node
                        )
                    })?;
                }
            }

            self.check_node_soundness(il, node, id, cx)?;

            match treetop.next {
                Some(next) => current = next,
                None => break,
            }
        }
        Ok(())
    }
}

fn describe(tt: TreeTopId) -> String {
    format!("#{}", tt.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidatorConfig;
    use crate::diagnostics::Severity;
    use crate::rules::Strictness;
    use jitval_tril::il::Symbol;
    use jitval_tril::{MethodBuilder, OpCode};

    fn run(il: &MethodIl) -> (Result<(), ValidationError>, Vec<String>) {
        let config = ValidatorConfig {
            echo_to_stderr: false,
            continue_after_error: true,
            ..ValidatorConfig::default()
        };
        let mut cx = RuleContext::new(il, &config, RuleId::SoundnessRule, Strictness::Strict);
        let result = SoundnessRule::new().validate(il, &mut cx);
        let messages = cx.into_defects().into_iter().map(|d| d.message).collect();
        (result, messages)
    }

    fn sound() -> (MethodIl, NodeId, NodeId) {
        let mut b = MethodBuilder::new("sound");
        b.begin_block(false);
        let x = b.load(OpCode::ILoad, Symbol::Parm(0));
        let y = b.load(OpCode::ILoad, Symbol::Parm(1));
        let sum = b.create(OpCode::IAdd, &[x, y]);
        b.store(OpCode::IStore, Symbol::Temp(0), sum);
        b.anchor(OpCode::IReturn, &[sum]);
        (b.finish(), x, sum)
    }

    #[test]
    fn test_sound_il_passes() {
        let (il, _, _) = sound();
        let (result, messages) = run(&il);
        assert!(result.is_ok());
        assert!(messages.is_empty());
    }

    #[test]
    fn test_missing_start() {
        let il = MethodIl::new("empty");
        let (result, messages) = run(&il);
        assert!(matches!(result, Err(ValidationError::Unsound { .. })));
        assert_eq!(messages, vec!["Start tree must exist"]);
    }

    #[test]
    fn test_corrupted_back_link() {
        let (mut il, _, _) = sound();
        let first = il.first_treetop().unwrap();
        let second = il.next_treetop(first).unwrap();
        let third = il.next_treetop(second).unwrap();
        il.treetop_mut(third).unwrap().prev = Some(first);

        let (result, messages) = run(&il);
        let err = result.unwrap_err();
        assert_eq!(err.defect().unwrap().severity, Severity::Unsound);
        let second_node = il.treetop(second).unwrap().node.unwrap();
        let third_node = il.treetop(third).unwrap().node.unwrap();
        let first_node = il.treetop(first).unwrap().node.unwrap();
        assert_eq!(
            messages,
            vec![format!(
                "Doubly-linked treetop list must be consistent: {}->{}<-{}",
                second_node, third_node, first_node
            )]
        );
    }

    #[test]
    fn test_self_ancestor() {
        let (mut il, x, sum) = sound();
        // x now has sum as a child: sum -> x -> sum
        il.node_mut(x).unwrap().children.push(Some(sum));
        let (result, messages) = run(&il);
        assert!(result.is_err());
        assert_eq!(messages, vec![format!("{} must not be its own ancestor", sum)]);
    }

    #[test]
    fn test_node_as_own_child() {
        let (mut il, x, _) = sound();
        il.node_mut(x).unwrap().children.push(Some(x));
        let (_, messages) = run(&il);
        assert_eq!(messages, vec![format!("{} must not be its own ancestor", x)]);
    }

    #[test]
    fn test_null_and_dangling_children() {
        let (mut il, _, sum) = sound();
        il.node_mut(sum).unwrap().children[1] = None;
        let (_, messages) = run(&il);
        assert_eq!(messages, vec![format!("{} child 1 must not be NULL", sum)]);

        let (mut il, _, sum) = sound();
        il.node_mut(sum).unwrap().children[0] = Some(NodeId(999));
        let (_, messages) = run(&il);
        assert_eq!(messages, vec![format!("{} child 0 must not be NULL", sum)]);
    }

    #[test]
    fn test_duplicate_treetop_root() {
        let mut b = MethodBuilder::new("dup");
        b.begin_block(false);
        let c = b.iconst(1);
        let ret = b.anchor(OpCode::IReturn, &[c]);
        b.append_treetop(ret);
        let il = b.finish();
        let (_, messages) = run(&il);
        assert_eq!(messages, vec![format!("Treetop node {} encountered twice", ret)]);
    }

    #[test]
    fn test_missing_stop_tree() {
        let (mut il, _, _) = sound();
        let orphan_node = il.add_node(OpCode::Return, vec![], jitval_tril::il::Payload::None);
        let orphan = il.add_treetop(Some(orphan_node));
        il.set_stop_treetop(Some(orphan));
        let (_, messages) = run(&il);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Reached the end of the trees after"));
        assert!(messages[0].ends_with(&format!("without encountering the stop tree {}", orphan_node)));
    }

    #[test]
    fn test_tree_without_node() {
        let (mut il, _, _) = sound();
        let first = il.first_treetop().unwrap();
        let second = il.next_treetop(first).unwrap();
        il.treetop_mut(second).unwrap().node = None;
        let (_, messages) = run(&il);
        let first_node = il.treetop(first).unwrap().node.unwrap();
        assert_eq!(messages, vec![format!("Tree after {} must have a node", first_node)]);
    }

    #[test]
    fn test_deep_tree_does_not_overflow() {
        let mut b = MethodBuilder::new("deep");
        b.begin_block(false);
        let mut value = b.iconst(0);
        for _ in 0..200_000 {
            value = b.create(OpCode::INeg, &[value]);
        }
        b.anchor(OpCode::IReturn, &[value]);
        let il = b.finish();
        let (result, _) = run(&il);
        assert!(result.is_ok());
    }
}
