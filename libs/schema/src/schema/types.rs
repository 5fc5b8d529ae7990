//! Field type declarations
//!
//! [`TypeDef`] is the closed set of declared field types. Named-type
//! indirection ([`TypeDef::Ref`]) is resolved when the schema is bound, so
//! every field ends up at exactly one concrete wire kind.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A group or type name, optionally qualified by a namespace (`ns:Name`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct QName {
    pub namespace: Option<String>,
    pub name: String,
}

impl QName {
    /// Unqualified name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    /// Namespace-qualified name
    pub fn qualified(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    /// Parse `ns:Name` or `Name`
    pub fn parse(text: &str) -> Self {
        match text.split_once(':') {
            Some((ns, name)) if !ns.is_empty() => Self::qualified(ns, name),
            Some((_, name)) => Self::new(name),
            None => Self::new(text),
        }
    }

    /// The same name placed in `namespace`, used for unqualified lookups
    pub fn within(&self, namespace: Option<&str>) -> Self {
        Self {
            namespace: namespace.map(str::to_owned),
            name: self.name.clone(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}:{}", ns, self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl From<&str> for QName {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl From<String> for QName {
    fn from(text: String) -> Self {
        Self::parse(&text)
    }
}

impl From<QName> for String {
    fn from(name: QName) -> Self {
        name.to_string()
    }
}

/// Reference point for time values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeEpoch {
    /// 1970-01-01T00:00:00Z
    Unix,
    /// Fixed offset of 946706400000 ms from the Unix epoch
    #[serde(rename = "y2k")]
    Y2K,
    /// Start of the UTC day; values are times of day
    Midnight,
}

impl TimeEpoch {
    /// Offset of the epoch from the Unix epoch in milliseconds
    ///
    /// `Midnight` is relative to the day of the value, so its offset is zero
    /// and the value itself is a time of day.
    pub const fn offset_millis(self) -> i64 {
        match self {
            TimeEpoch::Unix => 0,
            TimeEpoch::Y2K => 946_706_400_000,
            TimeEpoch::Midnight => 0,
        }
    }
}

/// Resolution of a time value on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Millis,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Length of one unit in milliseconds
    pub const fn millis(self) -> i64 {
        match self {
            TimeUnit::Millis => 1,
            TimeUnit::Seconds => 1_000,
            TimeUnit::Minutes => 60_000,
            TimeUnit::Hours => 3_600_000,
            TimeUnit::Days => 86_400_000,
        }
    }
}

/// Declared type of a field
///
/// `Ref` names a group (static reference), an enumeration or a type alias;
/// which one is decided when the schema is bound. `DynRef` always names a
/// group and is encoded with self-describing framing. `Object` is a dynamic
/// reference to any group that has an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeDef {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    BigInt,
    F32,
    F64,
    Decimal,
    BigDecimal,
    Bool,
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_size: Option<u32>,
    },
    Binary {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_size: Option<u32>,
    },
    Fixed {
        size: u32,
    },
    Time {
        epoch: TimeEpoch,
        unit: TimeUnit,
    },
    Ref(QName),
    DynRef(QName),
    Object,
    Sequence(Box<TypeDef>),
}

impl TypeDef {
    /// Unbounded string
    pub const fn string() -> Self {
        TypeDef::String { max_size: None }
    }

    /// Unbounded binary
    pub const fn binary() -> Self {
        TypeDef::Binary { max_size: None }
    }

    /// Millisecond timestamp relative to the Unix epoch
    pub const fn millitime() -> Self {
        TypeDef::Time {
            epoch: TimeEpoch::Unix,
            unit: TimeUnit::Millis,
        }
    }

    /// Static reference or named-type reference
    pub fn reference(name: impl Into<QName>) -> Self {
        TypeDef::Ref(name.into())
    }

    /// Dynamic reference to a group and its descendants
    pub fn dynamic(name: impl Into<QName>) -> Self {
        TypeDef::DynRef(name.into())
    }

    /// Sequence of `element`
    pub fn sequence(element: TypeDef) -> Self {
        TypeDef::Sequence(Box::new(element))
    }
}

/// Enumeration member: a name plus its wire value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub value: u32,
}

impl Symbol {
    pub fn new(name: impl Into<String>, value: u32) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Enumeration declaration
///
/// The wire carries [`Symbol::value`], not the symbol's position in
/// `symbols`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnumDef {
    pub symbols: Vec<Symbol>,
}

impl EnumDef {
    pub fn new(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        Self {
            symbols: symbols.into_iter().collect(),
        }
    }
}

/// Definition carried by a named type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamedTypeDef {
    Enum(EnumDef),
    Alias(TypeDef),
}

/// Auxiliary named type (enumeration or alias)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedType {
    pub name: QName,
    pub def: NamedTypeDef,
}
