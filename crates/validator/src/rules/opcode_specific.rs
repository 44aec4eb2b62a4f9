/// Checks that only apply to particular opcodes.

use super::{NodeValidationRule, RuleId};
use crate::diagnostics::RuleContext;
use crate::error::ValidationError;
use jitval_tril::il::{DataType, Node};
use jitval_tril::OpCode;

/// `ireturn` returns a narrow integer: every child is an integral type no
/// wider than 32 bits (Int8, Int16 or Int32).
#[derive(Debug, Default)]
pub struct ValidateIreturnReturnType;

impl ValidateIreturnReturnType {
    pub fn new() -> Self {
        Self
    }
}

impl NodeValidationRule for ValidateIreturnReturnType {
    fn id(&self) -> RuleId {
        RuleId::ValidateIreturnReturnType
    }

    fn validate(&mut self, node: &Node, cx: &mut RuleContext<'_>) -> Result<(), ValidationError> {
        if node.opcode != OpCode::IReturn {
            return Ok(());
        }
        let il = cx.il();
        let pointer_bytes = cx.target().pointer_bytes();
        for child in node.children.iter().flatten().filter_map(|c| il.node(*c)) {
            let actual = child.data_type();
            cx.check(
                node,
                actual.is_integral() && actual.size(pointer_bytes) <= DataType::Int32.size(pointer_bytes),
                || format!("ireturn has an invalid child type {} (expected Int{{8,16,32}})", actual),
            )?;
        }
        Ok(())
    }
}

/// `aiadd`/`aiuadd` take a 32-bit index and only exist on 32-bit targets.
#[derive(Debug, Default)]
pub struct ValidateAxaddPlatformSpecificRequirement;

impl ValidateAxaddPlatformSpecificRequirement {
    pub fn new() -> Self {
        Self
    }
}

impl NodeValidationRule for ValidateAxaddPlatformSpecificRequirement {
    fn id(&self) -> RuleId {
        RuleId::ValidateAxaddPlatformSpecificRequirement
    }

    fn validate(&mut self, node: &Node, cx: &mut RuleContext<'_>) -> Result<(), ValidationError> {
        if !matches!(node.opcode, OpCode::AIAdd | OpCode::AIUAdd) {
            return Ok(());
        }
        let is_32bit = cx.target().is_32bit();
        cx.check(node, is_32bit, || {
            format!("{} is only valid on 32 bit platforms", node.opcode)
        })
    }
}

/// Commutative binary opcodes keep a constant operand on the right.
#[derive(Debug, Default)]
pub struct ValidateBinaryOpcodeChildLayout;

impl ValidateBinaryOpcodeChildLayout {
    pub fn new() -> Self {
        Self
    }
}

impl NodeValidationRule for ValidateBinaryOpcodeChildLayout {
    fn id(&self) -> RuleId {
        RuleId::ValidateBinaryOpcodeChildLayout
    }

    fn validate(&mut self, node: &Node, cx: &mut RuleContext<'_>) -> Result<(), ValidationError> {
        if !node.opcode.is_commutative() || node.num_children() != 2 {
            return Ok(());
        }
        let il = cx.il();
        let is_const = |i: usize| {
            node.child(i)
                .and_then(|c| il.node(c))
                .is_some_and(|c| c.opcode.is_load_const())
        };
        let misplaced = is_const(0) && !is_const(1);
        cx.check(node, !misplaced, || {
            format!(
                "Constant child 0 of commutative {} must be the rightmost child",
                node.opcode
            )
        })
    }
}

#[derive(Debug, Default)]
pub struct ValidateNoDeprecatedOpcodes;

impl ValidateNoDeprecatedOpcodes {
    pub fn new() -> Self {
        Self
    }
}

impl NodeValidationRule for ValidateNoDeprecatedOpcodes {
    fn id(&self) -> RuleId {
        RuleId::ValidateNoDeprecatedOpcodes
    }

    fn validate(&mut self, node: &Node, cx: &mut RuleContext<'_>) -> Result<(), ValidationError> {
        cx.check(node, !node.opcode.is_deprecated(), || {
            format!("Deprecated opcode {} encountered", node.opcode)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Target, ValidatorConfig};
    use crate::rules::Strictness;
    use jitval_tril::il::Symbol;
    use jitval_tril::{MethodBuilder, MethodIl, NodeId};

    fn messages_on(
        il: &MethodIl,
        node: NodeId,
        target: Target,
        rule: &mut dyn NodeValidationRule,
    ) -> Vec<String> {
        let config = ValidatorConfig { echo_to_stderr: false, target, ..ValidatorConfig::default() };
        let mut cx = RuleContext::new(il, &config, rule.id(), Strictness::Lenient);
        rule.validate(il.node(node).unwrap(), &mut cx).unwrap();
        cx.into_defects().into_iter().map(|d| d.message).collect()
    }

    fn ireturn_of(op: OpCode) -> (MethodIl, NodeId) {
        let mut b = MethodBuilder::new("ret");
        b.begin_block(false);
        let value = b.load(op, Symbol::Parm(0));
        let ret = b.anchor(OpCode::IReturn, &[value]);
        (b.finish(), ret)
    }

    #[test]
    fn test_ireturn_narrow_integers_pass() {
        for op in [OpCode::BLoad, OpCode::SLoad, OpCode::ILoad] {
            let (il, ret) = ireturn_of(op);
            assert!(messages_on(&il, ret, Target::host(), &mut ValidateIreturnReturnType::new()).is_empty());
        }
    }

    #[test]
    fn test_ireturn_float_child_fails() {
        let (il, ret) = ireturn_of(OpCode::FLoad);
        assert_eq!(
            messages_on(&il, ret, Target::host(), &mut ValidateIreturnReturnType::new()),
            vec!["ireturn has an invalid child type Float (expected Int{8,16,32})"]
        );
        let (il, ret) = ireturn_of(OpCode::LLoad);
        assert_eq!(
            messages_on(&il, ret, Target::host(), &mut ValidateIreturnReturnType::new()).len(),
            1
        );
    }

    #[test]
    fn test_ireturn_address_child_fails_on_every_target() {
        // A 32 bit address is as narrow as Int32 but still not an integer.
        let (il, ret) = ireturn_of(OpCode::ALoad);
        for target in [Target::BITS_32, Target::BITS_64] {
            assert_eq!(
                messages_on(&il, ret, target, &mut ValidateIreturnReturnType::new()),
                vec!["ireturn has an invalid child type Address (expected Int{8,16,32})"]
            );
        }
    }

    #[test]
    fn test_aiadd_depends_on_target() {
        let mut b = MethodBuilder::new("addr");
        b.begin_block(false);
        let base = b.load(OpCode::ALoad, Symbol::Parm(0));
        let index = b.iconst(8);
        let addr = b.create(OpCode::AIAdd, &[base, index]);
        b.anchor(OpCode::AReturn, &[addr]);
        let il = b.finish();

        assert!(messages_on(&il, addr, Target::BITS_32, &mut ValidateAxaddPlatformSpecificRequirement::new()).is_empty());
        assert_eq!(
            messages_on(&il, addr, Target::BITS_64, &mut ValidateAxaddPlatformSpecificRequirement::new()),
            vec!["aiadd is only valid on 32 bit platforms"]
        );
    }

    #[test]
    fn test_constant_on_left_of_commutative() {
        let mut b = MethodBuilder::new("layout");
        b.begin_block(false);
        let x = b.load(OpCode::ILoad, Symbol::Parm(0));
        let c = b.iconst(2);
        let bad = b.create(OpCode::IAdd, &[c, x]);
        let good = b.create(OpCode::IMul, &[bad, c]);
        let folded = b.create(OpCode::IAdd, &[c, c]);
        let sub = b.create(OpCode::ISub, &[c, good]);
        let all = b.create(OpCode::IAdd, &[sub, folded]);
        b.anchor(OpCode::IReturn, &[all]);
        let il = b.finish();

        let mut rule = ValidateBinaryOpcodeChildLayout::new();
        assert_eq!(
            messages_on(&il, bad, Target::host(), &mut rule),
            vec!["Constant child 0 of commutative iadd must be the rightmost child"]
        );
        assert!(messages_on(&il, good, Target::host(), &mut rule).is_empty());
        assert!(messages_on(&il, folded, Target::host(), &mut rule).is_empty());
        assert!(messages_on(&il, sub, Target::host(), &mut rule).is_empty());
    }

    #[test]
    fn test_deprecated_opcode_reported() {
        let mut b = MethodBuilder::new("old");
        b.begin_block(false);
        let x = b.create(OpCode::IUConst, &[]);
        let y = b.iconst(1);
        let sum = b.create(OpCode::IUAdd, &[x, y]);
        b.anchor(OpCode::IReturn, &[sum]);
        let il = b.finish();

        let mut rule = ValidateNoDeprecatedOpcodes::new();
        assert_eq!(
            messages_on(&il, sum, Target::host(), &mut rule),
            vec!["Deprecated opcode iuadd encountered"]
        );
        assert!(messages_on(&il, y, Target::host(), &mut rule).is_empty());
    }
}
