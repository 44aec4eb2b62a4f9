/// No node may stay live across the end of an extended block.
///
/// One postorder walk over every node occurrence in the method keeps the
/// per-node future reference counts; whatever is still live at a `BBEnd`
/// that closes an extended block was referenced from outside that block.

use super::{MethodValidationRule, RuleId};
use crate::diagnostics::RuleContext;
use crate::error::ValidationError;
use crate::live_window::LiveNodeWindow;
use crate::node_state::{live_nodes, update_node_state, NodeSideTable, NodeState};
use crate::traversal::PostorderOccurrences;
use jitval_tril::il::Node;
use jitval_tril::{MethodIl, NodeId, OpCode};

#[derive(Debug, Default)]
pub struct ValidateLivenessBoundaries;

impl ValidateLivenessBoundaries {
    pub fn new() -> Self {
        Self
    }

    fn validate_end_of_extended_block(
        &self,
        bbend: &Node,
        states: &NodeSideTable<NodeState>,
        live: &mut LiveNodeWindow,
        cx: &mut RuleContext<'_>,
    ) -> Result<(), ValidationError> {
        let escaped: Vec<NodeId> = live_nodes(&*live, states).collect();
        for node in escaped {
            cx.fail(bbend, format!("Node cannot live across block boundary at {}", node))?;
        }

        // Nothing seen so far can be referenced again; keep the window compact.
        // Escaped nodes keep it where it is.
        live.start_new_window();
        Ok(())
    }
}

impl MethodValidationRule for ValidateLivenessBoundaries {
    fn id(&self) -> RuleId {
        RuleId::ValidateLivenessBoundaries
    }

    fn validate(&mut self, il: &MethodIl, cx: &mut RuleContext<'_>) -> Result<(), ValidationError> {
        let mut states: NodeSideTable<NodeState> = NodeSideTable::new(il.node_capacity());
        let mut live = LiveNodeWindow::new();

        for (tt, id) in PostorderOccurrences::new(il) {
            let Some(node) = il.node(id) else { continue };
            update_node_state(node, &mut states, &mut live, cx)?;

            if node.opcode != OpCode::BBEnd {
                continue;
            }
            let end_of_extended_block = match il.next_treetop(tt).and_then(|next| il.treetop_node(next)) {
                Some(next) => {
                    cx.check(node, next.opcode == OpCode::BBStart, || {
                        "Expected BBStart after BBEnd".to_string()
                    })?;
                    !(next.opcode == OpCode::BBStart && il.is_extension_of_previous(next))
                }
                None => true,
            };
            if end_of_extended_block {
                self.validate_end_of_extended_block(node, &states, &mut live, cx)?;
            }
        }
        Ok(())
    }
}
