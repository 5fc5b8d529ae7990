//! # Runtime Value Model
//!
//! Language-native values the codec reads from and writes to instances.
//! There is one [`Value`] variant per wire kind; integer fields accept any
//! integer variant whose value fits the declared width and always decode
//! to the declared variant.

pub mod access;
pub mod decimal;
pub mod message;

pub use access::{Accessor, Factory, FieldAccess};
pub use decimal::{BigDecimal, Decimal};
pub use message::Message;

use chrono::{DateTime, NaiveTime, Utc};
use num_bigint::BigInt;

/// A single field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    BigInt(BigInt),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    BigDecimal(BigDecimal),
    Bool(bool),
    String(String),
    Binary(Vec<u8>),
    /// Instant for `Unix`/`Y2K` epoch time fields
    Time(DateTime<Utc>),
    /// Time of day for `Midnight` epoch time fields
    TimeOfDay(NaiveTime),
    /// Enumeration symbol name
    Enum(String),
    Sequence(Vec<Value>),
    /// Nested group instance (static or dynamic reference)
    Group(Box<Message>),
}

impl Value {
    /// Short kind name for diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::I8(_) => "i8",
            Value::U8(_) => "u8",
            Value::I16(_) => "i16",
            Value::U16(_) => "u16",
            Value::I32(_) => "i32",
            Value::U32(_) => "u32",
            Value::I64(_) => "i64",
            Value::U64(_) => "u64",
            Value::BigInt(_) => "bigint",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Decimal(_) => "decimal",
            Value::BigDecimal(_) => "bigdecimal",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
            Value::Time(_) => "time",
            Value::TimeOfDay(_) => "time of day",
            Value::Enum(_) => "enum",
            Value::Sequence(_) => "sequence",
            Value::Group(_) => "group",
        }
    }

    /// Integer value widened to `i128`, for any integer variant
    pub fn as_integer(&self) -> Option<i128> {
        match *self {
            Value::I8(v) => Some(v.into()),
            Value::U8(v) => Some(v.into()),
            Value::I16(v) => Some(v.into()),
            Value::U16(v) => Some(v.into()),
            Value::I32(v) => Some(v.into()),
            Value::U32(v) => Some(v.into()),
            Value::I64(v) => Some(v.into()),
            Value::U64(v) => Some(v.into()),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.as_integer().and_then(|v| u64::try_from(v).ok())
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_integer().and_then(|v| i64::try_from(v).ok())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Enum(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&Message> {
        match self {
            Value::Group(m) => Some(&**m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Enumeration symbol value
    pub fn symbol(name: impl Into<String>) -> Self {
        Value::Enum(name.into())
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    };
}

impl_from_scalar! {
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    BigInt => BigInt,
    f32 => F32,
    f64 => F64,
    Decimal => Decimal,
    BigDecimal => BigDecimal,
    bool => Bool,
    String => String,
    Vec<u8> => Binary,
    DateTime<Utc> => Time,
    NaiveTime => TimeOfDay,
    Vec<Value> => Sequence,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Binary(value.to_vec())
    }
}

impl From<Message> for Value {
    fn from(value: Message) -> Self {
        Value::Group(Box::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_widening() {
        assert_eq!(Value::I8(-5).as_integer(), Some(-5));
        assert_eq!(Value::U64(u64::MAX).as_integer(), Some(u64::MAX as i128));
        assert_eq!(Value::I64(-1).as_u64(), None);
        assert_eq!(Value::U64(u64::MAX).as_i64(), None);
        assert_eq!(Value::from("x").as_integer(), None);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from(3u16), Value::U16(3));
        assert_eq!(Value::from(&b"ab"[..]), Value::Binary(vec![b'a', b'b']));
        assert_eq!(Value::symbol("Buy").as_str(), Some("Buy"));

        let nested = Value::from(Message::new("Item"));
        assert_eq!(nested.as_group().map(Message::type_name), Some("Item"));
        assert_eq!(nested.kind_name(), "group");
    }
}
