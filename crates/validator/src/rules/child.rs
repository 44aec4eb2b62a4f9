/// Child count and child type checks against the opcode property table.
///
/// Opcodes that do not declare an arity are not checked by either rule.
/// Opcodes that may carry register dependencies accept one extra trailing
/// `GlRegDeps` child on top of their declared arity.

use super::{NodeValidationRule, RuleId};
use crate::diagnostics::RuleContext;
use crate::error::ValidationError;
use jitval_tril::il::Node;
use jitval_tril::OpCode;

#[derive(Debug, Default)]
pub struct ValidateChildCount;

impl ValidateChildCount {
    pub fn new() -> Self {
        Self
    }
}

impl NodeValidationRule for ValidateChildCount {
    fn id(&self) -> RuleId {
        RuleId::ValidateChildCount
    }

    fn validate(&mut self, node: &Node, cx: &mut RuleContext<'_>) -> Result<(), ValidationError> {
        let opcode = node.opcode;
        let Some(expected) = opcode.expected_child_count() else {
            return Ok(());
        };
        let actual = node.num_children();

        if !opcode.can_have_glregdeps() {
            cx.check(node, actual == expected, || {
                format!("Child count {} does not match expected value of {}", actual, expected)
            })
        } else if actual == expected + 1 {
            let last_is_glregdeps = node
                .child(actual - 1)
                .and_then(|c| cx.il().node(c))
                .is_some_and(|c| c.opcode == OpCode::GlRegDeps);
            cx.check(node, last_is_glregdeps, || {
                format!(
                    "Child count {} does not match expected value of {} ({} without GlRegDeps) and last child is not a GlRegDeps",
                    actual,
                    expected + 1,
                    expected
                )
            })
        } else {
            cx.check(node, actual == expected, || {
                format!(
                    "Child count {} matches neither expected values of {} (without GlRegDeps) nor {} (with GlRegDeps)",
                    actual,
                    expected,
                    expected + 1
                )
            })
        }
    }
}

#[derive(Debug, Default)]
pub struct ValidateChildTypes;

impl ValidateChildTypes {
    pub fn new() -> Self {
        Self
    }
}

impl NodeValidationRule for ValidateChildTypes {
    fn id(&self) -> RuleId {
        RuleId::ValidateChildTypes
    }

    fn validate(&mut self, node: &Node, cx: &mut RuleContext<'_>) -> Result<(), ValidationError> {
        let opcode = node.opcode;
        if opcode.expected_child_count().is_none() {
            return Ok(());
        }
        let il = cx.il();
        let count = node.num_children();

        for i in 0..count {
            let Some(child) = node.child(i).and_then(|c| il.node(c)) else { continue };
            if child.opcode == OpCode::GlRegDeps {
                cx.check(node, opcode.can_have_glregdeps() && i == count - 1, || {
                    format!("Unexpected GlRegDeps child {}", i)
                })?;
                continue;
            }
            let expected = opcode.expected_child_type(i);
            let actual = child.data_type();
            cx.check(node, expected.accepts(actual), || {
                format!("Child {} has unexpected type {} (expected {})", i, actual, expected)
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidatorConfig;
    use crate::rules::Strictness;
    use jitval_tril::il::{Payload, Symbol};
    use jitval_tril::{MethodBuilder, MethodIl, NodeId};

    fn messages(il: &MethodIl, node: NodeId, rule: &mut dyn NodeValidationRule) -> Vec<String> {
        let config = ValidatorConfig { echo_to_stderr: false, ..ValidatorConfig::default() };
        let mut cx = RuleContext::new(il, &config, rule.id(), Strictness::Lenient);
        rule.validate(il.node(node).unwrap(), &mut cx).unwrap();
        cx.into_defects().into_iter().map(|d| d.message).collect()
    }

    fn method_with(op: OpCode, build: impl FnOnce(&mut MethodBuilder) -> Vec<NodeId>) -> (MethodIl, NodeId) {
        let mut b = MethodBuilder::new("children");
        b.begin_block(false);
        let children = build(&mut b);
        let node = b.anchor(op, &children);
        (b.finish(), node)
    }

    #[test]
    fn test_exact_arity_passes() {
        let (il, node) = method_with(OpCode::IStore, |b| vec![b.iconst(1)]);
        assert!(messages(&il, node, &mut ValidateChildCount::new()).is_empty());
        assert!(messages(&il, node, &mut ValidateChildTypes::new()).is_empty());
    }

    #[test]
    fn test_extra_child_without_glregdeps_allowance() {
        let (il, node) = method_with(OpCode::IfICmpEq, |b| vec![b.iconst(1), b.iconst(2), b.iconst(3)]);
        // ificmpeq allows GlRegDeps, so the third child must be one
        assert_eq!(
            messages(&il, node, &mut ValidateChildCount::new()),
            vec!["Child count 3 does not match expected value of 3 (2 without GlRegDeps) and last child is not a GlRegDeps"]
        );

        let mut b = MethodBuilder::new("iadd");
        b.begin_block(false);
        let (x, y, z) = (b.iconst(1), b.iconst(2), b.iconst(3));
        let add = b.create(OpCode::IAdd, &[x, y, z]);
        b.anchor(OpCode::IReturn, &[add]);
        let il = b.finish();
        assert_eq!(
            messages(&il, add, &mut ValidateChildCount::new()),
            vec!["Child count 3 does not match expected value of 2"]
        );
    }

    #[test]
    fn test_trailing_glregdeps_allowed() {
        let (il, node) = method_with(OpCode::IfICmpLt, |b| {
            let deps = b.create(OpCode::GlRegDeps, &[]);
            vec![b.iconst(1), b.iconst(2), deps]
        });
        assert!(messages(&il, node, &mut ValidateChildCount::new()).is_empty());
        assert!(messages(&il, node, &mut ValidateChildTypes::new()).is_empty());
    }

    #[test]
    fn test_arity_off_by_two_with_allowance() {
        let (il, node) = method_with(OpCode::IfICmpNe, |b| vec![b.iconst(1)]);
        assert_eq!(
            messages(&il, node, &mut ValidateChildCount::new()),
            vec!["Child count 1 matches neither expected values of 2 (without GlRegDeps) nor 3 (with GlRegDeps)"]
        );
    }

    #[test]
    fn test_misplaced_glregdeps() {
        let (il, node) = method_with(OpCode::IStore, |b| vec![b.create(OpCode::GlRegDeps, &[])]);
        assert_eq!(
            messages(&il, node, &mut ValidateChildTypes::new()),
            vec!["Unexpected GlRegDeps child 0"]
        );
    }

    #[test]
    fn test_wrong_child_type() {
        let (il, node) = method_with(OpCode::IStore, |b| {
            vec![b.create_with(OpCode::DLoad, &[], Payload::Symbol(Symbol::Parm(0)))]
        });
        assert_eq!(
            messages(&il, node, &mut ValidateChildTypes::new()),
            vec!["Child 0 has unexpected type Double (expected Int32)"]
        );
    }

    #[test]
    fn test_unspecified_child_type_accepts_anything() {
        let (il, node) = method_with(OpCode::NullChk, |b| vec![b.load(OpCode::ALoad, Symbol::Parm(0))]);
        assert!(messages(&il, node, &mut ValidateChildTypes::new()).is_empty());
    }

    #[test]
    fn test_unconstrained_opcode_skipped() {
        let (il, node) = method_with(OpCode::Call, |b| vec![b.iconst(1), b.dconst(2.0), b.lconst(3)]);
        assert!(messages(&il, node, &mut ValidateChildCount::new()).is_empty());
        assert!(messages(&il, node, &mut ValidateChildTypes::new()).is_empty());
    }
}
