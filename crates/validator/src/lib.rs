/// IL Validator
/// Rule-based structural and semantic checks over method IL, run at fixed
/// compilation checkpoints.

pub mod checklist;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod live_window;
pub mod node_state;
pub mod rules;
pub mod strategy;
pub mod traversal;
pub mod validator;
mod benchmarks;

pub use config::{PointerWidth, Target, ValidatorConfig};
pub use diagnostics::{Defect, RuleContext, Severity};
pub use error::{ConfigError, ValidationError};
pub use rules::{RuleId, Strictness};
pub use strategy::{StrategyEntry, ValidationPhase};
pub use validator::{IlValidator, ValidationReport};
