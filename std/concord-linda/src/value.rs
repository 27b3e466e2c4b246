//!
//! Tuple Field Values
//!
//! Every tuple field is a `Value`, a closed set of primitive kinds. The
//! kind of each field (not the value) decides which bucket a tuple lives
//! in; values are compared structurally, so two strings match on content.
//!

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Char(char),
    Str(String),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKind {
    Int,
    Float,
    Bool,
    Char,
    Str,
    Bytes,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Bool => "bool",
            ValueKind::Char => "char",
            ValueKind::Str => "str",
            ValueKind::Bytes => "bytes",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Bool(_) => ValueKind::Bool,
            Value::Char(_) => ValueKind::Char,
            Value::Str(_) => ValueKind::Str,
            Value::Bytes(_) => ValueKind::Bytes,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Char(c) => write!(f, "{c}"),
            Value::Str(s) => f.write_str(s),
            Value::Bytes(bytes) => write!(f, "b\"{}\"", bytes.escape_ascii()),
        }
    }
}

/// Rust types that map onto exactly one `ValueKind`, usable as capture
/// types and as `eval` thunk results.
pub trait TupleType: Sized + Send + 'static {
    const KIND: ValueKind;

    fn into_value(self) -> Value;

    fn from_value(value: &Value) -> Option<Self>;

    /// Whether `value` can be read back as `Self`. Narrow integer types
    /// reject `Int`s outside their range.
    fn fits(value: &Value) -> bool {
        Self::from_value(value).is_some()
    }
}

macro_rules! tuple_type {
    ($ty:ty, $kind:ident, |$v:ident| $into:expr, |$w:ident| $from:expr) => {
        impl TupleType for $ty {
            const KIND: ValueKind = ValueKind::$kind;

            fn into_value(self) -> Value {
                let $v = self;
                Value::$kind($into)
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$kind($w) => $from,
                    _ => None,
                }
            }
        }

        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                value.into_value()
            }
        }
    };
}

tuple_type!(i64, Int, |v| v, |n| Some(*n));
tuple_type!(i32, Int, |v| i64::from(v), |n| i32::try_from(*n).ok());
tuple_type!(u32, Int, |v| i64::from(v), |n| u32::try_from(*n).ok());
tuple_type!(f64, Float, |v| v, |x| Some(*x));
tuple_type!(bool, Bool, |v| v, |b| Some(*b));
tuple_type!(char, Char, |v| v, |c| Some(*c));
tuple_type!(String, Str, |v| v, |s| Some(s.clone()));
tuple_type!(Vec<u8>, Bytes, |v| v, |b| Some(b.clone()));

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(value.to_vec())
    }
}
