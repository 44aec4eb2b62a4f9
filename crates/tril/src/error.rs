use thiserror::Error;

/// Errors raised while reading Tril text into method IL.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("line {line}: expected {expected}, got {found}")]
    Unexpected {
        line: usize,
        expected: String,
        found: String,
    },
    #[error("line {line}: unknown opcode '{name}'")]
    UnknownOpcode { line: usize, name: String },
    #[error("line {line}: invalid value for attribute '{name}'")]
    InvalidAttribute { line: usize, name: String },
    #[error("line {line}: reference to undefined node '@{name}'")]
    UndefinedReference { line: usize, name: String },
    #[error("line {line}: node label '{name}' defined twice")]
    DuplicateLabel { line: usize, name: String },
}
