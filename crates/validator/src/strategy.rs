/// Validation strategies: ordered (rule, strictness) bundles.
///
/// The built-in tables are static and selected by compilation phase. A
/// custom strategy can be loaded from JSON, e.g.
/// `[{"rule": "validate_child_count", "strictness": "lenient"}]`.

use crate::error::ConfigError;
use crate::rules::{RuleId, Strictness};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyEntry {
    pub rule: RuleId,
    #[serde(default)]
    pub strictness: Strictness,
}

impl StrategyEntry {
    pub const fn strict(rule: RuleId) -> Self {
        Self { rule, strictness: Strictness::Strict }
    }

    pub const fn lenient(rule: RuleId) -> Self {
        Self { rule, strictness: Strictness::Lenient }
    }
}

pub const EMPTY_STRATEGY: &[StrategyEntry] = &[];

pub const POST_ILGEN_STRATEGY: &[StrategyEntry] = &[
    StrategyEntry::strict(RuleId::SoundnessRule),
    StrategyEntry::strict(RuleId::ValidateChildCount),
    StrategyEntry::strict(RuleId::ValidateChildTypes),
    StrategyEntry::strict(RuleId::ValidateLivenessBoundaries),
    StrategyEntry::strict(RuleId::ValidateNodeRefCountWithinBlock),
    StrategyEntry::strict(RuleId::ValidateIreturnReturnType),
    StrategyEntry::strict(RuleId::ValidateAxaddPlatformSpecificRequirement),
    StrategyEntry::lenient(RuleId::ValidateNoDeprecatedOpcodes),
];

pub const PRE_CODEGEN_STRATEGY: &[StrategyEntry] = &[
    StrategyEntry::strict(RuleId::SoundnessRule),
    StrategyEntry::strict(RuleId::ValidateLivenessBoundaries),
    StrategyEntry::strict(RuleId::ValidateNodeRefCountWithinBlock),
    StrategyEntry::strict(RuleId::ValidateChildCount),
    StrategyEntry::strict(RuleId::ValidateChildTypes),
    StrategyEntry::strict(RuleId::ValidateIreturnReturnType),
    StrategyEntry::strict(RuleId::ValidateAxaddPlatformSpecificRequirement),
    StrategyEntry::lenient(RuleId::ValidateBinaryOpcodeChildLayout),
];

/// Every rule, strict. Used by tests and `--phase all`.
pub const VALIDATE_ALL_STRATEGY: &[StrategyEntry] = &[
    StrategyEntry::strict(RuleId::SoundnessRule),
    StrategyEntry::strict(RuleId::ValidateLivenessBoundaries),
    StrategyEntry::strict(RuleId::ValidateNodeRefCountWithinBlock),
    StrategyEntry::strict(RuleId::ValidateChildCount),
    StrategyEntry::strict(RuleId::ValidateChildTypes),
    StrategyEntry::strict(RuleId::ValidateIreturnReturnType),
    StrategyEntry::strict(RuleId::ValidateAxaddPlatformSpecificRequirement),
    StrategyEntry::strict(RuleId::ValidateBinaryOpcodeChildLayout),
    StrategyEntry::strict(RuleId::ValidateNoDeprecatedOpcodes),
];

/// Compilation checkpoint a strategy is chosen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationPhase {
    None,
    PostIlgen,
    PreCodegen,
    All,
}

impl ValidationPhase {
    pub const ALL: &'static [ValidationPhase] = &[
        ValidationPhase::None,
        ValidationPhase::PostIlgen,
        ValidationPhase::PreCodegen,
        ValidationPhase::All,
    ];

    pub fn strategy(self) -> &'static [StrategyEntry] {
        match self {
            ValidationPhase::None => EMPTY_STRATEGY,
            ValidationPhase::PostIlgen => POST_ILGEN_STRATEGY,
            ValidationPhase::PreCodegen => PRE_CODEGEN_STRATEGY,
            ValidationPhase::All => VALIDATE_ALL_STRATEGY,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValidationPhase::None => "none",
            ValidationPhase::PostIlgen => "post-ilgen",
            ValidationPhase::PreCodegen => "pre-codegen",
            ValidationPhase::All => "all",
        }
    }
}

impl fmt::Display for ValidationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValidationPhase {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ValidationPhase::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| ConfigError::UnknownPhase(s.to_string()))
    }
}

pub fn strategy_from_json(text: &str) -> Result<Vec<StrategyEntry>, ConfigError> {
    Ok(serde_json::from_str(text)?)
}

pub fn load_strategy(path: &Path) -> Result<Vec<StrategyEntry>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let strategy = strategy_from_json(&text)?;
    if strategy.is_empty() {
        return Err(ConfigError::EmptyStrategy(path.to_path_buf()));
    }
    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_tables() {
        assert!(ValidationPhase::None.strategy().is_empty());
        for phase in [ValidationPhase::PostIlgen, ValidationPhase::PreCodegen, ValidationPhase::All] {
            assert_eq!(phase.strategy()[0].rule, RuleId::SoundnessRule);
        }
        assert_eq!(VALIDATE_ALL_STRATEGY.len(), RuleId::ALL.len());
    }

    #[test]
    fn test_phase_names() {
        for phase in ValidationPhase::ALL {
            assert_eq!(phase.name().parse::<ValidationPhase>().unwrap(), *phase);
        }
        assert!(matches!(
            "later".parse::<ValidationPhase>(),
            Err(ConfigError::UnknownPhase(_))
        ));
    }

    #[test]
    fn test_strategy_json() {
        let strategy = strategy_from_json(
            r#"[{"rule": "validate_child_count", "strictness": "lenient"}, {"rule": "soundness_rule"}]"#,
        )
        .unwrap();
        assert_eq!(
            strategy,
            vec![
                StrategyEntry::lenient(RuleId::ValidateChildCount),
                StrategyEntry::strict(RuleId::SoundnessRule),
            ]
        );
        assert!(strategy_from_json(r#"[{"rule": "no_such_rule"}]"#).is_err());
    }
}
