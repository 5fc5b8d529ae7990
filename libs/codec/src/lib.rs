//! # Groupwire Codec - Schema-Driven Compact Binary Encoding
//!
//! ## Purpose
//!
//! Encodes [`Message`] instances to a compact byte stream and back, driven
//! by a runtime-supplied [`Schema`]:
//! - Variable-length integers with a one-byte null marker
//! - Decimal, big-integer, float, string, binary, time and enum encodings
//! - Inline (static) group references with single inheritance
//! - Size-prefixed (dynamic) group frames that preserve the concrete type
//!   and let older readers skip fields they do not know
//!
//! ## Architecture Role
//!
//! ```text
//! schema (data model) → [codec] → caller's transport/storage
//!         ↑                ↓
//!   Groups, TypeDefs    Codec::encode / Codec::decode
//!   Value, Message      GroupTable (bound once, shared)
//! ```
//!
//! ## Layers
//!
//! - [`vlc`], [`primitives`]: stateless wire encodings
//! - [`io`]: byte sink and limited byte source
//! - [`strategy`]: compiled per-field encoding
//! - [`instruction`]: compiled groups with inheritance
//! - [`dispatch`]: runtime type / group id resolution and dynamic framing
//! - [`binding`]: schema + runtime binding → instruction table
//!
//! ## Quick Start
//!
//! ```rust
//! use codec::Codec;
//! use schema::{GroupDef, Message, Schema, TypeDef};
//!
//! let schema = Schema::builder()
//!     .group(GroupDef::new("Base").with_id(1).required("id", TypeDef::U64))
//!     .group(
//!         GroupDef::new("Derived")
//!             .with_id(2)
//!             .extends("Base")
//!             .optional("name", TypeDef::string()),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let codec = Codec::new(&schema).unwrap();
//! let bytes = codec.encode(&Message::new("Derived").with("id", 7u64)).unwrap();
//!
//! let decoded = codec.decode(&bytes).unwrap();
//! assert_eq!(decoded.type_name(), "Derived");
//! assert!(decoded.get("name").is_none());
//! ```
//!
//! ## Performance Profile
//!
//! - **Binding**: once per schema, all lookups resolved to table indices
//! - **Hot path**: no hashing except the runtime-type / id lookup per
//!   dynamic frame, no logging per field
//! - **Dynamic frames**: one temporary buffer per frame on encode
//! - **Untrusted input**: every length prefix checked before allocation

// Core modules
pub mod binding;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod instruction;
pub mod io;
pub mod primitives;
pub mod strategy;
pub mod vlc;

// Re-export key types for convenience
pub use binding::{Binding, GroupBinding};
pub use config::CodecConfig;
pub use engine::Codec;
pub use error::{
    CodecError, CodecResult, DecodeError, DecodeErrorKind, DecodeResult, EncodeError,
    EncodeResult, PathFrame,
};
pub use io::{ByteSink, ByteSource, SliceSource};

pub use schema::{Message, Schema, Value};
