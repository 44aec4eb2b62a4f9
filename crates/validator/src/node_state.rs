/// Per-node scratch state for a single validation call.
///
/// Scratch counters never live on the IL itself; each pass owns a
/// `NodeSideTable` sized to the method's node arena and drops it when done.

use crate::diagnostics::RuleContext;
use crate::error::ValidationError;
use crate::live_window::LiveNodeWindow;
use jitval_tril::NodeId;
use jitval_tril::il::Node;

/// Side table keyed by node. Each node also gets a dense local index the
/// first time it is inserted, so local indexes follow first-occurrence order.
#[derive(Debug, Clone)]
pub struct NodeSideTable<T> {
    entries: Vec<Option<(u32, T)>>,
    /// Nodes by local index.
    order: Vec<NodeId>,
}

impl<T> NodeSideTable<T> {
    pub fn new(capacity: usize) -> Self {
        let mut entries = Vec::with_capacity(capacity);
        entries.resize_with(capacity, || None);
        Self { entries, order: vec![] }
    }

    pub fn get(&self, node: NodeId) -> Option<&T> {
        self.entries.get(node.index()).and_then(Option::as_ref).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut T> {
        self.entries.get_mut(node.index()).and_then(Option::as_mut).map(|(_, v)| v)
    }

    /// Store `value` for `node`, keeping its local index if it already has one.
    pub fn insert(&mut self, node: NodeId, value: T) {
        let index = node.index();
        if index >= self.entries.len() {
            self.entries.resize_with(index + 1, || None);
        }
        let local = match &self.entries[index] {
            Some((local, _)) => *local,
            None => {
                self.order.push(node);
                (self.order.len() - 1) as u32
            }
        };
        self.entries[index] = Some((local, value));
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.get(node).is_some()
    }

    pub fn local_index(&self, node: NodeId) -> Option<u32> {
        self.entries.get(node.index()).and_then(Option::as_ref).map(|(local, _)| *local)
    }

    pub fn node_at(&self, local: u32) -> Option<NodeId> {
        self.order.get(local as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            *entry = None;
        }
        self.order.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeState {
    /// References still expected before the node dies.
    pub future_reference_count: u32,
}

/// Account for one occurrence of `node` in a walk of the method.
///
/// The first occurrence seeds the future reference count from the node's
/// declared count and makes the node live; every occurrence of a live node
/// consumes one reference, and the node dies when none remain.
pub fn update_node_state(
    node: &Node,
    states: &mut NodeSideTable<NodeState>,
    live: &mut LiveNodeWindow,
    cx: &mut RuleContext<'_>,
) -> Result<(), ValidationError> {
    let id = node.global_index();

    if !states.contains(id) {
        states.insert(id, NodeState { future_reference_count: node.reference_count });
        if node.reference_count == 0 {
            cx.check(node, node.opcode.is_treetop(), || {
                "Only nodes with isTreeTop opcodes can have refcount == 0".to_string()
            })?;
        } else if states.local_index(id).is_some_and(|local| live.add(local).is_err()) {
            // Below the window basis: the node belongs to an extended block already closed.
            return cx.fail(node, "Node has already gone dead");
        }
    }

    let local = states.local_index(id);
    if let Some(local) = local.filter(|l| live.contains(*l)) {
        let remaining = states.get(id).map_or(0, |s| s.future_reference_count);
        cx.check(node, remaining >= 1, || "Node already has reference count 0".to_string())?;
        let remaining = remaining.saturating_sub(1);
        states.insert(id, NodeState { future_reference_count: remaining });
        if remaining == 0 {
            live.remove(local);
        }
    } else {
        cx.check(node, node.opcode.is_treetop(), || "Node has already gone dead".to_string())?;
    }

    if cx.config().trace_live_nodes && !live.is_empty() {
        let names: Vec<String> = live_nodes(&*live, &*states).map(|n| n.to_string()).collect();
        log::trace!("Live nodes: {{{}}}", names.join(", "));
    }
    Ok(())
}

/// Live nodes in first-occurrence order.
pub fn live_nodes<'a, T>(
    live: &'a LiveNodeWindow,
    states: &'a NodeSideTable<T>,
) -> impl Iterator<Item = NodeId> + 'a {
    live.iter().filter_map(|local| states.node_at(local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidatorConfig;
    use crate::rules::{RuleId, Strictness};
    use jitval_tril::{MethodBuilder, MethodIl, OpCode};

    fn config() -> ValidatorConfig {
        ValidatorConfig { echo_to_stderr: false, continue_after_error: true, ..ValidatorConfig::default() }
    }

    fn method() -> (MethodIl, NodeId, NodeId) {
        let mut b = MethodBuilder::new("state");
        b.begin_block(false);
        let x = b.iconst(4);
        let sum = b.create(OpCode::IAdd, &[x, x]);
        let ret = b.anchor(OpCode::IReturn, &[sum]);
        (b.finish(), x, ret)
    }

    #[test]
    fn test_side_table() {
        let mut t: NodeSideTable<i64> = NodeSideTable::new(2);
        assert!(t.get(NodeId(1)).is_none());
        t.insert(NodeId(9), 7);
        t.insert(NodeId(1), -3);
        t.insert(NodeId(9), 8);
        assert_eq!(t.get(NodeId(1)), Some(&-3));
        *t.get_mut(NodeId(9)).unwrap() += 1;
        assert_eq!(t.get(NodeId(9)), Some(&9));

        // Local indexes follow first insertion, not node ids.
        assert_eq!(t.local_index(NodeId(9)), Some(0));
        assert_eq!(t.local_index(NodeId(1)), Some(1));
        assert_eq!(t.node_at(1), Some(NodeId(1)));
        assert_eq!(t.len(), 2);

        t.clear();
        assert!(!t.contains(NodeId(9)));
        assert!(t.is_empty());
        t.insert(NodeId(1), 0);
        assert_eq!(t.local_index(NodeId(1)), Some(0));
    }

    #[test]
    fn test_node_lives_until_last_reference() {
        let (il, x, _) = method();
        let config = config();
        let mut cx = RuleContext::new(&il, &config, RuleId::ValidateLivenessBoundaries, Strictness::Strict);
        let mut states = NodeSideTable::new(il.node_capacity());
        let mut live = LiveNodeWindow::new();
        let node = il.node(x).unwrap();

        update_node_state(node, &mut states, &mut live, &mut cx).unwrap();
        let local = states.local_index(x).unwrap();
        assert!(live.contains(local));
        assert_eq!(live_nodes(&live, &states).collect::<Vec<_>>(), vec![x]);
        assert_eq!(states.get(x).unwrap().future_reference_count, 1);

        update_node_state(node, &mut states, &mut live, &mut cx).unwrap();
        assert!(!live.contains(local));
        assert!(cx.defects().is_empty());

        update_node_state(node, &mut states, &mut live, &mut cx).unwrap();
        assert_eq!(cx.defects().len(), 1);
        assert_eq!(cx.defects()[0].message, "Node has already gone dead");
    }

    #[test]
    fn test_node_first_seen_below_basis_reported_once() {
        let (il, x, _) = method();
        let config = config();
        let mut cx = RuleContext::new(&il, &config, RuleId::ValidateLivenessBoundaries, Strictness::Strict);
        let mut states = NodeSideTable::new(il.node_capacity());
        let mut live = LiveNodeWindow::new();
        // A window that has already slid past local index 0.
        live.add(0).unwrap();
        live.remove(0);
        assert!(live.start_new_window());

        update_node_state(il.node(x).unwrap(), &mut states, &mut live, &mut cx).unwrap();
        let messages: Vec<&str> = cx.defects().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["Node has already gone dead"]);
    }

    #[test]
    fn test_treetop_opcode_may_have_zero_refcount() {
        let (il, x, ret) = method();
        let config = config();
        let mut cx = RuleContext::new(&il, &config, RuleId::ValidateLivenessBoundaries, Strictness::Strict);
        let mut states = NodeSideTable::new(il.node_capacity());
        let mut live = LiveNodeWindow::new();

        update_node_state(il.node(ret).unwrap(), &mut states, &mut live, &mut cx).unwrap();
        assert!(cx.defects().is_empty());
        assert!(live.is_empty());

        let mut broken = il.clone();
        broken.set_reference_count(x, 0);
        let mut cx = RuleContext::new(&broken, &config, RuleId::ValidateLivenessBoundaries, Strictness::Strict);
        let mut states = NodeSideTable::new(broken.node_capacity());
        update_node_state(broken.node(x).unwrap(), &mut states, &mut live, &mut cx).unwrap();
        assert_eq!(
            cx.defects()[0].message,
            "Only nodes with isTreeTop opcodes can have refcount == 0"
        );
    }
}
