//! Shared fixtures for codec integration tests

#![allow(dead_code)]

use schema::{EnumDef, GroupDef, Schema, Symbol, TimeEpoch, TimeUnit, TypeDef};
use tracing_subscriber::EnvFilter;

/// Install a test subscriber once; `RUST_LOG=codec=trace` shows frame skips
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Order-entry schema with inheritance, enums, inline and framed references
///
/// ```text
/// Base(1){id:u64}  <- Derived(2){name:string?}
/// User             {name:string, email:string}
/// Order(3)         {user:User, side:Side, price:Decimal, shape:DynRef(Base)?,
///                   lines:[Line], placed:Time(ms), note:User?}
/// Line             {sku:string, qty:u32}
/// ```
pub fn order_schema() -> Schema {
    Schema::builder()
        .enumeration(
            "Side",
            EnumDef::new([Symbol::new("Buy", 1), Symbol::new("Sell", 2), Symbol::new("Short", 7)]),
        )
        .group(GroupDef::new("Base").with_id(1).required("id", TypeDef::U64))
        .group(
            GroupDef::new("Derived")
                .with_id(2)
                .extends("Base")
                .optional("name", TypeDef::string()),
        )
        .group(
            GroupDef::new("User")
                .required("name", TypeDef::string())
                .required("email", TypeDef::string()),
        )
        .group(
            GroupDef::new("Line")
                .required("sku", TypeDef::string())
                .required("qty", TypeDef::U32),
        )
        .group(
            GroupDef::new("Order")
                .with_id(3)
                .required("user", TypeDef::reference("User"))
                .required("side", TypeDef::reference("Side"))
                .required("price", TypeDef::Decimal)
                .optional("shape", TypeDef::dynamic("Base"))
                .required("lines", TypeDef::sequence(TypeDef::reference("Line")))
                .required(
                    "placed",
                    TypeDef::Time {
                        epoch: TimeEpoch::Unix,
                        unit: TimeUnit::Millis,
                    },
                )
                .optional("note", TypeDef::reference("User")),
        )
        .build()
        .expect("order schema is valid")
}
