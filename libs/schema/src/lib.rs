//! # Groupwire Schema and Value Types
//!
//! Data model shared by every groupwire component.
//!
//! ## Design Philosophy
//!
//! - **Schema as Input**: Schemas are built by external tooling and treated
//!   as read-only; this crate only defines their shape and checks their
//!   invariants
//! - **Closed Type Set**: [`TypeDef`] and [`Value`] are closed enums with one
//!   variant per wire kind, so adding a kind is a compile-time change
//! - **No Wire Knowledge**: Byte-level encoding lives in the `codec` crate
//!
//! ## Quick Start
//!
//! ```rust
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
//! assert_eq!(schema.groups().len(), 2);
//!
//! let value = Message::new("Derived").with("id", 7u64);
//! assert_eq!(value.get("id").and_then(|v| v.as_u64()), Some(7));
//! ```

pub mod errors;
pub mod schema;
pub mod values;

pub use errors::{DecimalError, SchemaError};
pub use schema::group::{FieldDef, GroupDef};
pub use schema::types::{
    EnumDef, NamedType, NamedTypeDef, QName, Symbol, TimeEpoch, TimeUnit, TypeDef,
};
pub use schema::{RefTarget, ResolvedType, Schema, SchemaBuilder};
pub use values::{Accessor, BigDecimal, Decimal, Factory, FieldAccess, Message, Value};

// Re-export value-model dependencies so callers use matching versions
pub use chrono;
pub use num_bigint;
