use crate::diagnostics::Defect;
use crate::rules::RuleId;
use std::path::PathBuf;
use thiserror::Error;

/// Ways a validation call can stop before all selected rules have run.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A strict rule failed and the continue override was off.
    #[error("validation aborted by {rule}: {}", .defect.message)]
    Aborted { rule: RuleId, defect: Defect },
    /// The IL failed a soundness check. Never suppressed.
    #[error("IL is unsound: {}", .defect.message)]
    Unsound { defect: Defect },
    #[error("failed to write diagnostic: {0}")]
    Io(#[from] std::io::Error),
}

impl ValidationError {
    pub fn defect(&self) -> Option<&Defect> {
        match self {
            ValidationError::Aborted { defect, .. } | ValidationError::Unsound { defect } => Some(defect),
            ValidationError::Io(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown validation phase '{0}' (expected none, post-ilgen, pre-codegen or all)")]
    UnknownPhase(String),
    #[error("strategy in {0} selects no rules")]
    EmptyStrategy(PathBuf),
}
