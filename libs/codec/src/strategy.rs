//! # Field Encoding Strategy
//!
//! ## Purpose
//!
//! One compiled [`Strategy`] per field (and per sequence element) decides
//! how a [`Value`] becomes bytes. Strategies are built once at bind time
//! and hold table indices for group references, so they are immutable and
//! shared freely between threads.
//!
//! ## Nullability
//!
//! Most kinds encode "absent" as the null marker in place of their first
//! VLC. Inline groups and fixed binaries have no leading VLC, so their
//! nullable form is a presence byte followed by the required form.

use crate::dispatch::GroupTable;
use crate::error::{DecodeErrorKind, DecodeResult, EncodeError, EncodeResult};
use crate::io::{ByteSink, ByteSource};
use crate::primitives;
use crate::vlc::{self, null_not_allowed};
use num_bigint::BigInt;
use schema::{Decimal, EnumDef, QName, TimeEpoch, TimeUnit, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Declared width of an integer field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
}

impl IntKind {
    pub fn name(self) -> &'static str {
        match self {
            IntKind::I8 => "i8",
            IntKind::U8 => "u8",
            IntKind::I16 => "i16",
            IntKind::U16 => "u16",
            IntKind::I32 => "i32",
            IntKind::U32 => "u32",
            IntKind::I64 => "i64",
            IntKind::U64 => "u64",
        }
    }

    fn bounds(self) -> (i128, i128) {
        match self {
            IntKind::I8 => (i8::MIN.into(), i8::MAX.into()),
            IntKind::U8 => (0, u8::MAX.into()),
            IntKind::I16 => (i16::MIN.into(), i16::MAX.into()),
            IntKind::U16 => (0, u16::MAX.into()),
            IntKind::I32 => (i32::MIN.into(), i32::MAX.into()),
            IntKind::U32 => (0, u32::MAX.into()),
            IntKind::I64 => (i64::MIN.into(), i64::MAX.into()),
            IntKind::U64 => (0, u64::MAX.into()),
        }
    }

    fn is_signed(self) -> bool {
        matches!(self, IntKind::I8 | IntKind::I16 | IntKind::I32 | IntKind::I64)
    }

    /// Encode any integer value that fits this width
    fn encode(self, sink: &mut dyn ByteSink, value: &Value) -> EncodeResult<()> {
        let n = value
            .as_integer()
            .ok_or_else(|| EncodeError::type_mismatch(self.name(), value.kind_name()))?;
        let (min, max) = self.bounds();
        if n < min || n > max {
            return Err(EncodeError::out_of_range(self.name(), n));
        }
        if self.is_signed() {
            vlc::write_i64(sink, n as i64);
        } else {
            vlc::write_u64(sink, n as u64);
        }
        Ok(())
    }

    fn decode(self, src: &mut dyn ByteSource) -> DecodeResult<Option<Value>> {
        Ok(match self {
            IntKind::I8 => vlc::read_i8_null(src)?.map(Value::I8),
            IntKind::U8 => vlc::read_u8_null(src)?.map(Value::U8),
            IntKind::I16 => vlc::read_i16_null(src)?.map(Value::I16),
            IntKind::U16 => vlc::read_u16_null(src)?.map(Value::U16),
            IntKind::I32 => vlc::read_i32_null(src)?.map(Value::I32),
            IntKind::U32 => vlc::read_u32_null(src)?.map(Value::U32),
            IntKind::I64 => vlc::read_i64_null(src)?.map(Value::I64),
            IntKind::U64 => vlc::read_u64_null(src)?.map(Value::U64),
        })
    }
}

/// Two-way lookup between enumeration symbol names and wire ids
#[derive(Debug)]
pub struct SymbolTable {
    enum_name: String,
    by_name: HashMap<String, u32>,
    by_id: HashMap<u32, String>,
}

impl SymbolTable {
    pub fn new(name: &QName, def: &EnumDef) -> Self {
        Self {
            enum_name: name.to_string(),
            by_name: def.symbols.iter().map(|s| (s.name.clone(), s.value)).collect(),
            by_id: def.symbols.iter().map(|s| (s.value, s.name.clone())).collect(),
        }
    }

    pub fn enum_name(&self) -> &str {
        &self.enum_name
    }

    pub fn id_of(&self, symbol: &str) -> Option<u32> {
        self.by_name.get(symbol).copied()
    }

    pub fn symbol_of(&self, id: u64) -> Option<&str> {
        let id = u32::try_from(id).ok()?;
        self.by_id.get(&id).map(String::as_str)
    }
}

/// Compiled encoding for one declared type
#[derive(Debug, Clone)]
pub enum Strategy {
    Int(IntKind),
    BigInt,
    F32,
    F64,
    Decimal,
    BigDecimal,
    Bool,
    /// UTF-8 string with an effective byte limit
    String { max: usize },
    Binary { max: usize },
    Fixed { size: usize },
    Time { epoch: TimeEpoch, unit: TimeUnit },
    Enum(Arc<SymbolTable>),
    Sequence { element: Box<Strategy>, max_len: usize },
    /// Inline fields of the group at this table index
    Static(usize),
    /// Framed group: the declared target's index, or any group for `Object`
    Dynamic(Option<usize>),
}

impl Strategy {
    /// Write a present value in the required form
    pub fn encode_value(
        &self,
        table: &GroupTable,
        sink: &mut dyn ByteSink,
        value: &Value,
    ) -> EncodeResult<()> {
        match (self, value) {
            (Strategy::Int(kind), value) => kind.encode(sink, value),

            (Strategy::BigInt, Value::BigInt(v)) => vlc::write_big_int(sink, v),
            (Strategy::BigInt, value) => match value.as_integer() {
                Some(n) => vlc::write_big_int(sink, &BigInt::from(n)),
                None => Err(mismatch("bigint", value)),
            },

            (Strategy::F32, Value::F32(v)) => {
                primitives::write_f32(sink, *v);
                Ok(())
            }
            (Strategy::F32 | Strategy::F64, Value::F64(v)) => {
                primitives::write_f64(sink, *v);
                Ok(())
            }
            (Strategy::F64, Value::F32(v)) => {
                primitives::write_f32(sink, *v);
                Ok(())
            }

            (Strategy::Decimal, Value::Decimal(d)) => {
                primitives::write_decimal(sink, *d);
                Ok(())
            }
            (Strategy::Decimal, Value::BigDecimal(b)) => {
                let d = Decimal::try_from(b).map_err(|_| EncodeError::out_of_range("decimal", b))?;
                primitives::write_decimal(sink, d);
                Ok(())
            }
            (Strategy::BigDecimal, Value::BigDecimal(b)) => primitives::write_big_decimal(sink, b),
            (Strategy::BigDecimal, Value::Decimal(d)) => {
                primitives::write_big_decimal(sink, &(*d).into())
            }

            (Strategy::Bool, Value::Bool(b)) => {
                primitives::write_bool(sink, *b);
                Ok(())
            }

            (Strategy::String { max }, Value::String(s)) => primitives::write_string(sink, s, *max),
            (Strategy::Binary { max }, Value::Binary(b)) => primitives::write_binary(sink, b, *max),
            (Strategy::Fixed { size }, Value::Binary(b)) => primitives::write_fixed(sink, b, *size),

            (Strategy::Time { epoch: TimeEpoch::Midnight, unit }, Value::TimeOfDay(t)) => {
                primitives::write_time_of_day(sink, *t, *unit);
                Ok(())
            }
            (Strategy::Time { epoch, unit }, Value::Time(t)) if *epoch != TimeEpoch::Midnight => {
                primitives::write_time(sink, *t, *epoch, *unit);
                Ok(())
            }

            (Strategy::Enum(symbols), Value::Enum(name)) => {
                let id = symbols
                    .id_of(name)
                    .ok_or_else(|| EncodeError::UnknownEnumSymbol {
                        enum_name: symbols.enum_name().to_owned(),
                        symbol: name.clone(),
                    })?;
                vlc::write_u64(sink, u64::from(id));
                Ok(())
            }

            (Strategy::Sequence { element, max_len }, Value::Sequence(items)) => {
                primitives::write_sequence_len(sink, items.len(), *max_len)?;
                items
                    .iter()
                    .try_for_each(|item| element.encode_value(table, sink, item))
            }

            (Strategy::Static(index), Value::Group(message)) => {
                table.group(*index).encode_fields(table, sink, message)
            }
            (Strategy::Dynamic(target), Value::Group(message)) => {
                table.encode_dynamic(sink, message, *target)
            }

            (strategy, value) => Err(mismatch(strategy.kind_name(), value)),
        }
    }

    /// Write a value that may be absent
    ///
    /// Present values produce the same bytes as the required form, except
    /// for inline groups and fixed binaries which gain a presence byte.
    pub fn encode_optional(
        &self,
        table: &GroupTable,
        sink: &mut dyn ByteSink,
        value: Option<&Value>,
    ) -> EncodeResult<()> {
        match (self.has_presence_byte(), value) {
            (true, value) => {
                primitives::write_presence(sink, value.is_some());
                match value {
                    Some(value) => self.encode_value(table, sink, value),
                    None => Ok(()),
                }
            }
            (false, Some(value)) => self.encode_value(table, sink, value),
            (false, None) => {
                vlc::write_null(sink);
                Ok(())
            }
        }
    }

    /// Read one value; `None` only when `nullable` and the wire says absent
    ///
    /// `depth` is the nesting depth of the group holding the value; a
    /// nested group is decoded one level deeper.
    pub fn decode(
        &self,
        table: &GroupTable,
        src: &mut dyn ByteSource,
        nullable: bool,
        depth: usize,
    ) -> DecodeResult<Option<Value>> {
        if nullable && self.has_presence_byte() && !primitives::read_presence(src)? {
            return Ok(None);
        }

        let value = match self {
            Strategy::Int(kind) => kind.decode(src)?,
            Strategy::BigInt => vlc::read_big_int_null(src)?.map(Value::BigInt),
            Strategy::F32 => primitives::read_f32_null(src)?.map(Value::F32),
            Strategy::F64 => primitives::read_f64_null(src)?.map(Value::F64),
            Strategy::Decimal => primitives::read_decimal_null(src)?.map(Value::Decimal),
            Strategy::BigDecimal => primitives::read_big_decimal_null(src)?.map(Value::BigDecimal),
            Strategy::Bool => primitives::read_bool_null(src)?.map(Value::Bool),
            Strategy::String { max } => primitives::read_string_null(src, *max)?.map(Value::String),
            Strategy::Binary { max } => primitives::read_binary_null(src, *max)?.map(Value::Binary),
            Strategy::Fixed { size } => Some(Value::Binary(primitives::read_fixed(src, *size)?)),
            Strategy::Time {
                epoch: TimeEpoch::Midnight,
                unit,
            } => primitives::read_time_of_day_null(src, *unit)?.map(Value::TimeOfDay),
            Strategy::Time { epoch, unit } => {
                primitives::read_time_null(src, *epoch, *unit)?.map(Value::Time)
            }
            Strategy::Enum(symbols) => match vlc::read_u64_null(src)? {
                None => None,
                Some(id) => {
                    let symbol = symbols.symbol_of(id).ok_or_else(|| {
                        DecodeErrorKind::UnknownEnumSymbol {
                            enum_name: symbols.enum_name().to_owned(),
                            id,
                        }
                    })?;
                    Some(Value::Enum(symbol.to_owned()))
                }
            },
            Strategy::Sequence { element, max_len } => {
                match primitives::read_sequence_len_null(src, *max_len)? {
                    None => None,
                    Some(len) => {
                        // Schema validation rejects zero-width elements, so
                        // each one consumes at least one byte
                        let capacity = len.min(src.available().unwrap_or(0));
                        let mut items = Vec::with_capacity(capacity);
                        for _ in 0..len {
                            items.push(element.decode_required(table, src, depth)?);
                        }
                        Some(Value::Sequence(items))
                    }
                }
            }
            Strategy::Static(index) => {
                let message = table.group(*index).decode_new(table, src, depth + 1)?;
                Some(Value::Group(Box::new(message)))
            }
            Strategy::Dynamic(target) => table
                .decode_dynamic(src, *target, true, depth + 1)?
                .map(|message| Value::Group(Box::new(message))),
        };

        match value {
            None if !nullable => Err(null_not_allowed()),
            value => Ok(value),
        }
    }

    fn decode_required(
        &self,
        table: &GroupTable,
        src: &mut dyn ByteSource,
        depth: usize,
    ) -> DecodeResult<Value> {
        self.decode(table, src, false, depth)?.ok_or_else(null_not_allowed)
    }

    fn has_presence_byte(&self) -> bool {
        matches!(self, Strategy::Static(_) | Strategy::Fixed { .. })
    }

    /// Wire kind name for diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Strategy::Int(kind) => kind.name(),
            Strategy::BigInt => "bigint",
            Strategy::F32 => "f32",
            Strategy::F64 => "f64",
            Strategy::Decimal => "decimal",
            Strategy::BigDecimal => "bigdecimal",
            Strategy::Bool => "bool",
            Strategy::String { .. } => "string",
            Strategy::Binary { .. } => "binary",
            Strategy::Fixed { .. } => "fixed",
            Strategy::Time {
                epoch: TimeEpoch::Midnight,
                ..
            } => "time of day",
            Strategy::Time { .. } => "time",
            Strategy::Enum(_) => "enum",
            Strategy::Sequence { .. } => "sequence",
            Strategy::Static(_) | Strategy::Dynamic(_) => "group",
        }
    }
}

fn mismatch(expected: &'static str, found: &Value) -> EncodeError {
    EncodeError::type_mismatch(expected, found.kind_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::GroupInstruction;
    use crate::io::SliceSource;
    use schema::{Factory, Symbol};

    fn empty_table() -> GroupTable {
        GroupTable::new(Vec::new(), Default::default())
    }

    fn encode(strategy: &Strategy, value: Option<&Value>) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::new();
        strategy.encode_optional(&empty_table(), &mut out, value).unwrap();
        out
    }

    fn decode(strategy: &Strategy, bytes: &[u8], nullable: bool) -> DecodeResult<Option<Value>> {
        strategy.decode(&empty_table(), &mut SliceSource::new(bytes), nullable, 1)
    }

    fn sides() -> Arc<SymbolTable> {
        let def = EnumDef::new([Symbol::new("Buy", 10), Symbol::new("Sell", 20)]);
        Arc::new(SymbolTable::new(&QName::new("Side"), &def))
    }

    #[test]
    fn test_null_unsigned_is_single_byte() {
        let strategy = Strategy::Int(IntKind::U32);
        assert_eq!(encode(&strategy, None), vec![vlc::NULL]);
        assert_eq!(decode(&strategy, &[vlc::NULL], true).unwrap(), None);
    }

    #[test]
    fn test_every_kind_encodes_absent_as_null_marker() {
        let point = GroupInstruction {
            name: "Point".into(),
            id: Some(1),
            super_group: None,
            fields: Vec::new(),
            type_name: "Point".into(),
            factory: Factory::for_type("Point"),
        };
        let table = GroupTable::new(vec![point], Default::default());

        let kinds = vec![
            Strategy::Int(IntKind::I8),
            Strategy::Int(IntKind::U8),
            Strategy::Int(IntKind::I16),
            Strategy::Int(IntKind::U16),
            Strategy::Int(IntKind::I32),
            Strategy::Int(IntKind::U32),
            Strategy::Int(IntKind::I64),
            Strategy::Int(IntKind::U64),
            Strategy::BigInt,
            Strategy::F32,
            Strategy::F64,
            Strategy::Decimal,
            Strategy::BigDecimal,
            Strategy::Bool,
            Strategy::String { max: 8 },
            Strategy::Binary { max: 8 },
            Strategy::Fixed { size: 4 },
            Strategy::Time {
                epoch: TimeEpoch::Unix,
                unit: TimeUnit::Millis,
            },
            Strategy::Time {
                epoch: TimeEpoch::Midnight,
                unit: TimeUnit::Seconds,
            },
            Strategy::Enum(sides()),
            Strategy::Sequence {
                element: Box::new(Strategy::Bool),
                max_len: 4,
            },
            Strategy::Static(0),
            Strategy::Dynamic(Some(0)),
            Strategy::Dynamic(None),
        ];

        for strategy in &kinds {
            let mut out: Vec<u8> = Vec::new();
            strategy.encode_optional(&table, &mut out, None).unwrap();
            assert_eq!(out, vec![vlc::NULL], "{}", strategy.kind_name());

            let mut src = SliceSource::new(&out);
            let back = strategy.decode(&table, &mut src, true, 1).unwrap();
            assert_eq!(back, None, "{}", strategy.kind_name());
            assert!(src.is_exhausted(), "{}", strategy.kind_name());
        }
    }

    #[test]
    fn test_integer_widths_accept_fitting_values() {
        let strategy = Strategy::Int(IntKind::U8);
        assert_eq!(encode(&strategy, Some(&Value::I64(200))), vec![0x88, 0x03]);
        assert_eq!(
            decode(&strategy, &[0x88, 0x03], false).unwrap(),
            Some(Value::U8(200))
        );

        let mut out: Vec<u8> = Vec::new();
        let err = strategy
            .encode_value(&empty_table(), &mut out, &Value::I32(-1))
            .unwrap_err();
        assert_eq!(err, EncodeError::out_of_range("u8", -1));

        let err = strategy
            .encode_value(&empty_table(), &mut out, &Value::from("x"))
            .unwrap_err();
        assert_eq!(err, EncodeError::type_mismatch("u8", "string"));
    }

    #[test]
    fn test_required_rejects_null_marker() {
        let err = decode(&Strategy::String { max: 8 }, &[vlc::NULL], false).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::NullNotAllowed);
    }

    #[test]
    fn test_enum_uses_symbol_ids() {
        let strategy = Strategy::Enum(sides());
        assert_eq!(encode(&strategy, Some(&Value::symbol("Sell"))), vec![20]);
        assert_eq!(
            decode(&strategy, &[10], false).unwrap(),
            Some(Value::symbol("Buy"))
        );

        let err = decode(&strategy, &[11], false).unwrap_err();
        assert_eq!(
            err.kind(),
            &DecodeErrorKind::UnknownEnumSymbol {
                enum_name: "Side".into(),
                id: 11
            }
        );

        let mut out: Vec<u8> = Vec::new();
        let err = strategy
            .encode_value(&empty_table(), &mut out, &Value::symbol("Hold"))
            .unwrap_err();
        assert!(matches!(err, EncodeError::UnknownEnumSymbol { .. }));
    }

    #[test]
    fn test_sequence_elements_are_required() {
        let strategy = Strategy::Sequence {
            element: Box::new(Strategy::Int(IntKind::I16)),
            max_len: 4,
        };
        let value = Value::Sequence(vec![Value::I16(-1), Value::I16(300)]);
        let bytes = encode(&strategy, Some(&value));
        assert_eq!(bytes[0], 2);
        assert_eq!(decode(&strategy, &bytes, false).unwrap(), Some(value));

        // Count 1 followed by a null element
        let err = decode(&strategy, &[0x01, vlc::NULL], false).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::NullNotAllowed);

        assert_eq!(encode(&strategy, None), vec![vlc::NULL]);
        assert!(decode(&strategy, &[0x05], false).is_err());
    }

    #[test]
    fn test_fixed_nullable_uses_presence_byte() {
        let strategy = Strategy::Fixed { size: 2 };
        let value = Value::Binary(vec![0xAB, 0xCD]);
        assert_eq!(encode(&strategy, Some(&value)), vec![0x01, 0xAB, 0xCD]);
        assert_eq!(encode(&strategy, None), vec![vlc::NULL]);
        assert_eq!(decode(&strategy, &[0x00], true).unwrap(), None);
        assert_eq!(
            decode(&strategy, &[0xAB, 0xCD], false).unwrap(),
            Some(value)
        );
    }

    #[test]
    fn test_decimal_accepts_fitting_big_decimal() {
        let strategy = Strategy::Decimal;
        let fits = Value::BigDecimal(schema::BigDecimal::new(-2, 150));
        assert_eq!(
            decode(&strategy, &encode(&strategy, Some(&fits)), false).unwrap(),
            Some(Value::Decimal(Decimal::new(-2, 150)))
        );

        let wide = Value::BigDecimal(schema::BigDecimal::new(1000, 1));
        let mut out: Vec<u8> = Vec::new();
        let err = strategy
            .encode_value(&empty_table(), &mut out, &wide)
            .unwrap_err();
        assert!(matches!(err, EncodeError::OutOfRange { kind: "decimal", .. }));
    }

    #[test]
    fn test_midnight_time_requires_time_of_day() {
        let strategy = Strategy::Time {
            epoch: TimeEpoch::Midnight,
            unit: TimeUnit::Seconds,
        };
        let noon = chrono::NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        let bytes = encode(&strategy, Some(&Value::TimeOfDay(noon)));
        assert_eq!(
            decode(&strategy, &bytes, false).unwrap(),
            Some(Value::TimeOfDay(noon))
        );

        let mut out: Vec<u8> = Vec::new();
        let err = strategy
            .encode_value(&empty_table(), &mut out, &Value::Time(chrono::Utc::now()))
            .unwrap_err();
        assert_eq!(err, EncodeError::type_mismatch("time of day", "time"));
    }

    #[test]
    fn test_float_kinds_widen() {
        let bytes = encode(&Strategy::F64, Some(&Value::F32(0.5)));
        assert_eq!(
            decode(&Strategy::F64, &bytes, false).unwrap(),
            Some(Value::F64(0.5))
        );
        assert_eq!(
            decode(&Strategy::F32, &bytes, false).unwrap(),
            Some(Value::F32(0.5))
        );
    }
}
