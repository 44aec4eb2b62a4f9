/// Validation rules, grouped by the scope they run over.
///
/// A method rule sees the whole method once, a block rule sees one extended
/// block at a time, and a node rule sees every node once in preorder. Rules
/// report through [`RuleContext`] and propagate its result with `?`; any
/// internal state is reset at the top of each `validate` call.

pub mod child;
pub mod liveness;
pub mod opcode_specific;
pub mod refcount;
pub mod soundness;

pub use child::{ValidateChildCount, ValidateChildTypes};
pub use liveness::ValidateLivenessBoundaries;
pub use opcode_specific::{
    ValidateAxaddPlatformSpecificRequirement, ValidateBinaryOpcodeChildLayout,
    ValidateIreturnReturnType, ValidateNoDeprecatedOpcodes,
};
pub use refcount::ValidateNodeRefCountWithinBlock;
pub use soundness::SoundnessRule;

use crate::diagnostics::RuleContext;
use crate::error::ValidationError;
use jitval_tril::il::Node;
use jitval_tril::{MethodIl, TreeTopId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    SoundnessRule,
    ValidateBinaryOpcodeChildLayout,
    ValidateChildCount,
    ValidateChildTypes,
    ValidateLivenessBoundaries,
    ValidateNodeRefCountWithinBlock,
    ValidateAxaddPlatformSpecificRequirement,
    ValidateIreturnReturnType,
    ValidateNoDeprecatedOpcodes,
}

impl RuleId {
    pub const ALL: &'static [RuleId] = &[
        RuleId::SoundnessRule,
        RuleId::ValidateBinaryOpcodeChildLayout,
        RuleId::ValidateChildCount,
        RuleId::ValidateChildTypes,
        RuleId::ValidateLivenessBoundaries,
        RuleId::ValidateNodeRefCountWithinBlock,
        RuleId::ValidateAxaddPlatformSpecificRequirement,
        RuleId::ValidateIreturnReturnType,
        RuleId::ValidateNoDeprecatedOpcodes,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RuleId::SoundnessRule => "soundness_rule",
            RuleId::ValidateBinaryOpcodeChildLayout => "validate_binary_opcode_child_layout",
            RuleId::ValidateChildCount => "validate_child_count",
            RuleId::ValidateChildTypes => "validate_child_types",
            RuleId::ValidateLivenessBoundaries => "validate_liveness_boundaries",
            RuleId::ValidateNodeRefCountWithinBlock => "validate_node_ref_count_within_block",
            RuleId::ValidateAxaddPlatformSpecificRequirement => {
                "validate_axadd_platform_specific_requirement"
            }
            RuleId::ValidateIreturnReturnType => "validate_ireturn_return_type",
            RuleId::ValidateNoDeprecatedOpcodes => "validate_no_deprecated_opcodes",
        }
    }

    pub fn from_name(name: &str) -> Option<RuleId> {
        RuleId::ALL.iter().copied().find(|r| r.name() == name)
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a failing check stops validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Abort unless the continue-after-error override is set.
    #[default]
    Strict,
    /// Record and report, then keep going.
    Lenient,
}

impl fmt::Display for Strictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strictness::Strict => f.write_str("strict"),
            Strictness::Lenient => f.write_str("lenient"),
        }
    }
}

pub trait MethodValidationRule {
    fn id(&self) -> RuleId;
    fn validate(&mut self, il: &MethodIl, cx: &mut RuleContext<'_>) -> Result<(), ValidationError>;
}

pub trait BlockValidationRule {
    fn id(&self) -> RuleId;
    /// `first..=exit` spans one extended block.
    fn validate(
        &mut self,
        first: TreeTopId,
        exit: TreeTopId,
        cx: &mut RuleContext<'_>,
    ) -> Result<(), ValidationError>;
}

pub trait NodeValidationRule {
    fn id(&self) -> RuleId;
    fn validate(&mut self, node: &Node, cx: &mut RuleContext<'_>) -> Result<(), ValidationError>;
}
