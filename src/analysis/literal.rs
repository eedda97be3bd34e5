//! Typed literal values.
//!
//! Literals come from constant-pool entries and the short constant-pushing
//! opcodes. They are always simple: rendering them twice never changes what
//! the program does.

use std::fmt;

use crate::analysis::value::{TypeRef, ValueType};

/// A constant value that can appear as an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// 32-bit integer (also covers byte, short and char constants).
    Int(i32),
    /// 64-bit integer.
    Long(i64),
    /// 32-bit floating point.
    Float(f32),
    /// 64-bit floating point.
    Double(f64),
    /// Boolean constant.
    Boolean(bool),
    /// String constant.
    String(String),
    /// Class literal (`Foo.class`).
    Class(TypeRef),
    /// The null reference.
    Null,
}

impl Literal {
    /// The computational type of this literal.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Int(_) => ValueType::Int,
            Self::Long(_) => ValueType::Long,
            Self::Float(_) => ValueType::Float,
            Self::Double(_) => ValueType::Double,
            Self::Boolean(_) => ValueType::Boolean,
            Self::String(_) => ValueType::Reference(TypeRef::new("java.lang.String")),
            Self::Class(_) => ValueType::Reference(TypeRef::new("java.lang.Class")),
            Self::Null => ValueType::Null,
        }
    }

    /// Returns the literal as an integer, for comparisons against 0 and 1.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v as i64),
            Self::Long(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}L"),
            Self::Float(v) => write!(f, "{v:?}f"),
            Self::Double(v) => write!(f, "{v:?}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::String(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\r' => f.write_str("\\r")?,
                        '\t' => f.write_str("\\t")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("\"")
            }
            Self::Class(ty) => write!(f, "{ty}.class"),
            Self::Null => f.write_str("null"),
        }
    }
}
