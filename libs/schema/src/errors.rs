//! Error types for schema validation and value conversion
//!
//! Provides error handling for the two places this crate can fail: checking
//! that a schema is internally consistent before it is bound, and converting
//! between the wire decimal types and `rust_decimal`.

use thiserror::Error;

/// Errors raised while validating or binding a schema
///
/// Each variant names the group, field or type that caused the problem so
/// the schema author can find it without re-running with extra logging.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    /// Two groups share the same qualified name
    #[error("Duplicate group name '{name}'")]
    DuplicateGroup { name: String },

    /// Two groups declare the same numeric id
    #[error("Duplicate group id {id}: declared by '{first}' and '{second}'")]
    DuplicateGroupId {
        id: u64,
        first: String,
        second: String,
    },

    /// Two named types (or a named type and a group) share a name
    #[error("Duplicate type name '{name}'")]
    DuplicateType { name: String },

    /// A field name is declared twice in a group or shadows an inherited field
    #[error("Duplicate field '{field}' in group '{group}'")]
    DuplicateField { group: String, field: String },

    /// A group names a super-group that does not exist
    #[error("Group '{group}' extends unknown super-group '{super_group}'")]
    UnknownSuperGroup { group: String, super_group: String },

    /// Following super-group links from a group leads back to itself
    #[error("Inheritance cycle detected at group '{group}'")]
    InheritanceCycle { group: String },

    /// A type reference does not resolve to any group or named type
    #[error("Unresolved type '{name}' referenced from {context}")]
    UnresolvedType { name: String, context: String },

    /// A dynamic reference names something other than a group
    #[error("Type '{name}' referenced from {context} is not a group")]
    NotAGroup { name: String, context: String },

    /// A chain of type aliases never reaches a concrete type
    #[error("Type alias cycle detected at '{name}'")]
    AliasCycle { name: String },

    /// Required static references lead from a group back to itself, so no
    /// finite message of that group exists
    #[error("Required reference cycle through group '{group}'")]
    RequiredReferenceCycle { group: String },

    /// A sequence element occupies no bytes on the wire, so a count alone
    /// would drive unbounded work
    #[error("Sequence element of {context} has no wire width")]
    ZeroWidthSequenceElement { context: String },

    /// An enumeration declares the same symbol name twice
    #[error("Duplicate symbol '{symbol}' in enum '{enum_name}'")]
    DuplicateSymbol { enum_name: String, symbol: String },

    /// An enumeration assigns the same wire value to two symbols
    #[error("Duplicate symbol value {value} in enum '{enum_name}'")]
    DuplicateSymbolValue { enum_name: String, value: u32 },

    /// An enumeration has no symbols at all
    #[error("Enum '{enum_name}' declares no symbols")]
    EmptyEnum { enum_name: String },

    /// A binding refers to a group the schema does not declare
    #[error("Binding refers to unknown group '{name}'")]
    UnknownGroup { name: String },

    /// A binding overrides the accessor of a field the group does not declare
    #[error("Binding refers to unknown field '{field}' of group '{group}'")]
    UnknownField { group: String, field: String },

    /// Two groups are bound to the same runtime type
    #[error("Runtime type '{type_name}' is bound to both '{first}' and '{second}'")]
    DuplicateRuntimeType {
        type_name: String,
        first: String,
        second: String,
    },

    /// The schema document could not be parsed
    #[error("Invalid schema document: {reason}")]
    InvalidDocument { reason: String },
}

/// Errors that can occur converting between decimal representations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecimalError {
    /// Mantissa does not fit the 64-bit wire mantissa
    #[error("Mantissa {mantissa} does not fit in 64 bits")]
    MantissaOverflow { mantissa: String },

    /// Exponent does not fit the target exponent width
    #[error("Exponent {exponent} out of range [{min}, {max}]")]
    ExponentOutOfRange { exponent: i64, min: i64, max: i64 },

    /// Value cannot be represented by `rust_decimal::Decimal`
    #[error("Decimal {mantissa}e{exponent} cannot be represented exactly")]
    Unrepresentable { mantissa: i64, exponent: i8 },
}
