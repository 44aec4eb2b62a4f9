/// IL data types and per-child type expectations.

use serde::{Serialize, Deserialize};
use std::fmt;

/// The result type of an IL node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    NoType,
    Int8,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    Address,
}

impl DataType {
    pub fn name(self) -> &'static str {
        match self {
            DataType::NoType => "NoType",
            DataType::Int8 => "Int8",
            DataType::Int16 => "Int16",
            DataType::Int32 => "Int32",
            DataType::Int64 => "Int64",
            DataType::Float => "Float",
            DataType::Double => "Double",
            DataType::Address => "Address",
        }
    }

    pub fn is_integral(self) -> bool {
        matches!(self, DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64)
    }

    /// Size in bytes, with `Address` sized for the given pointer width.
    pub fn size(self, pointer_bytes: u32) -> u32 {
        match self {
            DataType::NoType => 0,
            DataType::Int8 => 1,
            DataType::Int16 => 2,
            DataType::Int32 | DataType::Float => 4,
            DataType::Int64 | DataType::Double => 8,
            DataType::Address => pointer_bytes,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Expected type of the child at one position of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildType {
    /// Any type is accepted.
    Unspecified,
    Exactly(DataType),
}

impl ChildType {
    pub fn accepts(self, actual: DataType) -> bool {
        match self {
            ChildType::Unspecified => true,
            ChildType::Exactly(expected) => expected == actual,
        }
    }
}

impl fmt::Display for ChildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildType::Unspecified => f.write_str("UnspecifiedChildType"),
            ChildType::Exactly(ty) => write!(f, "{}", ty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral_sizes() {
        assert_eq!(DataType::Int8.size(8), 1);
        assert_eq!(DataType::Int32.size(8), 4);
        assert_eq!(DataType::Address.size(4), 4);
        assert_eq!(DataType::Address.size(8), 8);
        assert!(DataType::Int16.is_integral());
        assert!(!DataType::Float.is_integral());
    }

    #[test]
    fn test_unspecified_accepts_anything() {
        assert!(ChildType::Unspecified.accepts(DataType::Double));
        assert!(ChildType::Exactly(DataType::Int32).accepts(DataType::Int32));
        assert!(!ChildType::Exactly(DataType::Int32).accepts(DataType::Int64));
        assert_eq!(ChildType::Unspecified.to_string(), "UnspecifiedChildType");
    }
}
