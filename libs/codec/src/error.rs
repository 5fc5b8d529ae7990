//! Codec errors for encoding and decoding groups
//!
//! Decode failures carry the group/field path they occurred on, collected
//! while the error unwinds through nested groups. Encode failures describe
//! a problem in the caller's own object graph and are reported as-is.

use schema::SchemaError;
use std::fmt;
use thiserror::Error;

/// Errors raised while encoding a value
///
/// These are invalid application state, not malformed input: a required
/// field without a value, a value that does not fit its declared type, or
/// a group that cannot be sent dynamically.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EncodeError {
    /// Required field has no value
    #[error("Missing value for required field '{field}'")]
    MissingRequired { field: String },

    /// Value variant does not match the field's wire kind
    #[error("Type mismatch: expected {expected}, got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Value does not fit the declared width or format
    #[error("Value {value} out of range for {kind}")]
    OutOfRange { kind: &'static str, value: String },

    /// Enumeration value is not a symbol of the enum
    #[error("'{symbol}' is not a symbol of enum '{enum_name}'")]
    UnknownEnumSymbol { enum_name: String, symbol: String },

    /// No group is bound to the value's runtime type
    #[error("Unknown group type '{type_name}': no group is bound to this runtime type")]
    UnknownGroupType { type_name: String },

    /// Group without an id used as a dynamic reference or top-level message
    #[error("Group '{group}' has no id and cannot be encoded dynamically")]
    NoGroupId { group: String },

    /// Dynamic reference holds a group that does not derive from the declared one
    #[error("Group '{actual}' is not '{expected}' or one of its subgroups")]
    NotSubgroup { expected: String, actual: String },

    /// String, binary, sequence or frame longer than allowed
    #[error("{what} of {len} bytes exceeds limit {max}")]
    LengthExceedsMax {
        what: &'static str,
        len: usize,
        max: usize,
    },

    /// Fixed-size binary of the wrong length
    #[error("Fixed binary size mismatch: expected {expected} bytes, got {actual}")]
    FixedSizeMismatch { expected: usize, actual: usize },
}

impl EncodeError {
    pub fn type_mismatch(expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch { expected, found }
    }

    pub fn out_of_range(kind: &'static str, value: impl fmt::Display) -> Self {
        Self::OutOfRange {
            kind,
            value: value.to_string(),
        }
    }
}

/// Root cause of a decode failure
///
/// Every variant is recoverable: the input is rejected, the process is not
/// affected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeErrorKind {
    /// Input ended inside a value
    #[error("Unexpected end of input: need {needed} bytes, {available} available")]
    UnexpectedEof { needed: usize, available: usize },

    /// A group tried to read past its declared size
    #[error("Read {excess} bytes beyond group size")]
    BeyondGroupSize { excess: usize },

    /// A dynamic group declares more bytes than the input holds
    #[error("Truncated group: size prefix declares {declared} bytes, {available} available")]
    TruncatedFrame { declared: usize, available: usize },

    /// Null marker where a value is required
    #[error("Unexpected null for required value")]
    NullNotAllowed,

    /// Variable-length integer wider than 64 bits
    #[error("Variable-length integer of {size} bytes overflows 64 bits")]
    VlcOverflow { size: usize },

    /// Integer does not fit the field's declared width
    #[error("Value {value} out of range for {kind}")]
    IntOutOfRange { kind: &'static str, value: i128 },

    /// Decimal exponent outside the 8-bit range
    #[error("Decimal exponent {exponent} out of range [-128, 127]")]
    ExponentOutOfRange { exponent: i64 },

    /// Length prefix larger than the configured or declared maximum
    #[error("{what} length {len} exceeds limit {max}")]
    LengthExceedsMax {
        what: &'static str,
        len: u64,
        max: usize,
    },

    /// String bytes are not UTF-8
    #[error("Invalid UTF-8 in string (valid up to byte {valid_up_to})")]
    InvalidUtf8 { valid_up_to: usize },

    /// Boolean other than 0 or 1
    #[error("Invalid boolean value {value}")]
    InvalidBool { value: u64 },

    /// Presence flag other than present/absent
    #[error("Invalid presence flag {flag:#04x}")]
    InvalidPresenceFlag { flag: u8 },

    /// Group id not bound to any group
    #[error("Unknown group id {id}")]
    UnknownGroupId { id: u64 },

    /// Enumeration id with no matching symbol
    #[error("Unknown symbol id {id} for enum '{enum_name}'")]
    UnknownEnumSymbol { enum_name: String, id: u64 },

    /// Dynamic reference holds a group that does not derive from the declared one
    #[error("Group '{actual}' is not '{expected}' or one of its subgroups")]
    IncompatibleGroup { expected: String, actual: String },

    /// Time value outside the representable range
    #[error("Time value {value} out of range")]
    TimeOutOfRange { value: i64 },

    /// Dynamic group size prefix above the configured maximum
    #[error("Group size {size} exceeds frame limit {max}")]
    FrameTooLarge { size: u64, max: usize },

    /// Groups nested deeper than the configured maximum
    #[error("Group nesting exceeds depth limit {max}")]
    NestingTooDeep { max: usize },

    /// Input continues after a complete message
    #[error("{count} trailing bytes after message")]
    TrailingBytes { count: usize },
}

/// One level of decode location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathFrame {
    Group(String),
    Field(String),
}

/// Decode failure with the location it occurred at
///
/// Frames are pushed innermost first while the error unwinds; [`path`]
/// renders them outermost first, e.g. `(Order)(User).email`.
///
/// [`path`]: DecodeError::path
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeError {
    kind: DecodeErrorKind,
    frames: Vec<PathFrame>,
}

impl DecodeError {
    pub fn new(kind: DecodeErrorKind) -> Self {
        Self {
            kind,
            frames: Vec::new(),
        }
    }

    /// Root cause
    pub fn kind(&self) -> &DecodeErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> DecodeErrorKind {
        self.kind
    }

    /// Frames innermost first
    pub fn frames(&self) -> &[PathFrame] {
        &self.frames
    }

    /// Record that the failure happened while decoding `group`
    pub fn in_group(mut self, group: &str) -> Self {
        self.frames.push(PathFrame::Group(group.to_owned()));
        self
    }

    /// Record that the failure happened while decoding `field`
    ///
    /// Skipped when the innermost frame is already a group: the nested
    /// group's own frame identifies the location.
    pub fn in_field(mut self, field: &str) -> Self {
        if !matches!(self.frames.last(), Some(PathFrame::Group(_))) {
            self.frames.push(PathFrame::Field(field.to_owned()));
        }
        self
    }

    /// Location rendered outermost first, empty when no frames were recorded
    pub fn path(&self) -> String {
        self.frames
            .iter()
            .rev()
            .map(|frame| match frame {
                PathFrame::Group(name) => format!("({})", name),
                PathFrame::Field(name) => format!(".{}", name),
            })
            .collect()
    }

    pub fn eof(needed: usize, available: usize) -> Self {
        DecodeErrorKind::UnexpectedEof { needed, available }.into()
    }

    pub fn beyond_group_size(excess: usize) -> Self {
        DecodeErrorKind::BeyondGroupSize { excess }.into()
    }

    pub fn int_out_of_range(kind: &'static str, value: impl Into<i128>) -> Self {
        DecodeErrorKind::IntOutOfRange {
            kind,
            value: value.into(),
        }
        .into()
    }

    pub fn length_exceeds_max(what: &'static str, len: u64, max: usize) -> Self {
        DecodeErrorKind::LengthExceedsMax { what, len, max }.into()
    }
}

impl From<DecodeErrorKind> for DecodeError {
    fn from(kind: DecodeErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.frames.is_empty() {
            write!(f, "Decode failed: {}", self.kind)
        } else {
            write!(f, "Decode failed at {}: {}", self.path(), self.kind)
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// Errors surfaced by the public codec entry points
#[derive(Debug, Error)]
pub enum CodecError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Static encode/decode named a group the codec does not know
    #[error("Unknown group '{name}'")]
    UnknownGroup { name: String },
}

impl CodecError {
    /// Decode failure, if this is one
    pub fn as_decode(&self) -> Option<&DecodeError> {
        match self {
            CodecError::Decode(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_encode(&self) -> Option<&EncodeError> {
        match self {
            CodecError::Encode(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for decode operations
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Result type for encode operations
pub type EncodeResult<T> = std::result::Result<T, EncodeError>;

/// Result type for the public codec API
pub type CodecResult<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_path_rendering_outermost_first() {
        let err = DecodeError::new(DecodeErrorKind::NullNotAllowed)
            .in_field("email")
            .in_group("User")
            .in_field("user")
            .in_group("Order");

        assert_eq!(err.path(), "(Order)(User).email");
        assert_eq!(err.kind(), &DecodeErrorKind::NullNotAllowed);
        assert_eq!(
            err.to_string(),
            "Decode failed at (Order)(User).email: Unexpected null for required value"
        );
    }

    #[test]
    fn test_field_frame_kept_without_nested_group() {
        let err = DecodeError::new(DecodeErrorKind::UnknownGroupId { id: 99 })
            .in_field("payload")
            .in_group("Envelope");
        assert_eq!(err.path(), "(Envelope).payload");
    }

    #[test]
    fn test_source_is_root_cause() {
        let err = DecodeError::beyond_group_size(3).in_group("Order");
        let source = err.source().expect("root cause");
        assert_eq!(source.to_string(), "Read 3 bytes beyond group size");
    }

    #[test]
    fn test_unframed_display() {
        let err = DecodeError::eof(4, 1);
        assert_eq!(err.path(), "");
        assert_eq!(
            err.to_string(),
            "Decode failed: Unexpected end of input: need 4 bytes, 1 available"
        );
    }

    #[test]
    fn test_codec_error_wraps_both_directions() {
        let encode: CodecError = EncodeError::NoGroupId {
            group: "Header".into(),
        }
        .into();
        assert!(encode.as_encode().is_some());
        assert!(encode.as_decode().is_none());
        assert_eq!(
            encode.to_string(),
            "Group 'Header' has no id and cannot be encoded dynamically"
        );

        let decode: CodecError = DecodeError::new(DecodeErrorKind::InvalidBool { value: 2 }).into();
        assert_eq!(
            decode.as_decode().map(DecodeError::kind),
            Some(&DecodeErrorKind::InvalidBool { value: 2 })
        );
    }
}
