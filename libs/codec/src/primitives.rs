//! # Primitive Codec
//!
//! ## Purpose
//!
//! Stateless encode/decode functions for every non-integer wire kind,
//! built on [`crate::vlc`]. Each required reader has a `_null` twin that
//! maps the null marker to `None`.
//!
//! ## Wire Layout
//!
//! - **Decimal**: signed exponent (fits `i8`), then signed mantissa
//! - **Big decimal**: signed exponent (fits `i32`), then big-integer mantissa
//! - **Float**: unsigned bit pattern of the `f64`; `f32` is widened first
//! - **Bool**: unsigned 0 or 1
//! - **String/Binary**: unsigned byte length, then the bytes
//! - **Fixed**: the bytes only; the nullable form has a presence byte first
//! - **Time**: signed count of units since the epoch
//! - **Presence**: `0x01` present, `0xC0` absent (`0x00` also read as absent)
//!
//! Length prefixes are checked against the caller's limit and against the
//! bytes the source can still yield before anything is allocated. A reader
//! that fails consumes nothing: multi-part values are decoded from a peek
//! and skipped only once every part is valid.

use crate::error::{DecodeError, DecodeErrorKind, DecodeResult, EncodeError, EncodeResult};
use crate::io::{ByteSink, ByteSource};
use crate::vlc::{self, null_not_allowed};
use chrono::{DateTime, NaiveTime, Timelike, Utc};
use schema::{BigDecimal, Decimal, TimeEpoch, TimeUnit};

/// Presence byte for a value that follows
pub const PRESENT: u8 = 0x01;

/// Legacy absent flag accepted on decode
pub const LEGACY_ABSENT: u8 = 0x00;

const MILLIS_PER_DAY: i64 = 86_400_000;

// Decimals

pub fn write_decimal<W: ByteSink + ?Sized>(sink: &mut W, value: Decimal) {
    vlc::write_i64(sink, i64::from(value.exponent));
    vlc::write_i64(sink, value.mantissa);
}

pub fn read_decimal_null<S: ByteSource + ?Sized>(src: &mut S) -> DecodeResult<Option<Decimal>> {
    let (exponent, exponent_len) = vlc::peek_i64_null(&*src, 0)?;
    let Some(exponent) = exponent else {
        src.skip(exponent_len)?;
        return Ok(None);
    };
    let exponent =
        i8::try_from(exponent).map_err(|_| DecodeErrorKind::ExponentOutOfRange { exponent })?;
    let (mantissa, mantissa_len) = vlc::peek_i64_null(&*src, exponent_len)?;
    let mantissa = mantissa.ok_or_else(null_not_allowed)?;
    src.skip(exponent_len + mantissa_len)?;
    Ok(Some(Decimal::new(exponent, mantissa)))
}

pub fn read_decimal<S: ByteSource + ?Sized>(src: &mut S) -> DecodeResult<Decimal> {
    read_decimal_null(src)?.ok_or_else(null_not_allowed)
}

pub fn write_big_decimal<W: ByteSink + ?Sized>(
    sink: &mut W,
    value: &BigDecimal,
) -> EncodeResult<()> {
    vlc::write_i64(sink, i64::from(value.exponent));
    vlc::write_big_int(sink, &value.mantissa)
}

pub fn read_big_decimal_null<S: ByteSource + ?Sized>(
    src: &mut S,
) -> DecodeResult<Option<BigDecimal>> {
    let (exponent, exponent_len) = vlc::peek_i64_null(&*src, 0)?;
    let Some(exponent) = exponent else {
        src.skip(exponent_len)?;
        return Ok(None);
    };
    let exponent =
        i32::try_from(exponent).map_err(|_| DecodeError::int_out_of_range("i32", exponent))?;
    let (mantissa, mantissa_len) = vlc::peek_big_int_null(&*src, exponent_len)?;
    let mantissa = mantissa.ok_or_else(null_not_allowed)?;
    src.skip(exponent_len + mantissa_len)?;
    Ok(Some(BigDecimal::new(exponent, mantissa)))
}

pub fn read_big_decimal<S: ByteSource + ?Sized>(src: &mut S) -> DecodeResult<BigDecimal> {
    read_big_decimal_null(src)?.ok_or_else(null_not_allowed)
}

// Floats

pub fn write_f64<W: ByteSink + ?Sized>(sink: &mut W, value: f64) {
    vlc::write_u64(sink, value.to_bits());
}

pub fn read_f64_null<S: ByteSource + ?Sized>(src: &mut S) -> DecodeResult<Option<f64>> {
    Ok(vlc::read_u64_null(src)?.map(f64::from_bits))
}

pub fn read_f64<S: ByteSource + ?Sized>(src: &mut S) -> DecodeResult<f64> {
    read_f64_null(src)?.ok_or_else(null_not_allowed)
}

pub fn write_f32<W: ByteSink + ?Sized>(sink: &mut W, value: f32) {
    write_f64(sink, f64::from(value));
}

pub fn read_f32_null<S: ByteSource + ?Sized>(src: &mut S) -> DecodeResult<Option<f32>> {
    Ok(read_f64_null(src)?.map(|v| v as f32))
}

pub fn read_f32<S: ByteSource + ?Sized>(src: &mut S) -> DecodeResult<f32> {
    read_f32_null(src)?.ok_or_else(null_not_allowed)
}

// Booleans

pub fn write_bool<W: ByteSink + ?Sized>(sink: &mut W, value: bool) {
    vlc::write_u64(sink, u64::from(value));
}

pub fn read_bool_null<S: ByteSource + ?Sized>(src: &mut S) -> DecodeResult<Option<bool>> {
    let (value, len) = vlc::peek_u64_null(&*src, 0)?;
    let value = match value {
        None => None,
        Some(0) => Some(false),
        Some(1) => Some(true),
        Some(value) => return Err(DecodeErrorKind::InvalidBool { value }.into()),
    };
    src.skip(len)?;
    Ok(value)
}

pub fn read_bool<S: ByteSource + ?Sized>(src: &mut S) -> DecodeResult<bool> {
    read_bool_null(src)?.ok_or_else(null_not_allowed)
}

// Length-prefixed strings and blobs

fn write_prefixed<W: ByteSink + ?Sized>(
    sink: &mut W,
    what: &'static str,
    bytes: &[u8],
    max: usize,
) -> EncodeResult<()> {
    if bytes.len() > max {
        return Err(EncodeError::LengthExceedsMax {
            what,
            len: bytes.len(),
            max,
        });
    }
    vlc::write_u64(sink, bytes.len() as u64);
    sink.write_all(bytes);
    Ok(())
}

fn read_prefixed_null<S: ByteSource + ?Sized>(
    src: &mut S,
    what: &'static str,
    max: usize,
) -> DecodeResult<Option<Vec<u8>>> {
    let (len, prefix_len) = vlc::peek_u64_null(&*src, 0)?;
    let Some(len) = len else {
        src.skip(prefix_len)?;
        return Ok(None);
    };
    if len > max as u64 {
        return Err(DecodeError::length_exceeds_max(what, len, max));
    }
    let len = len as usize;
    // The prefix stays unread unless the payload is there too
    if let Some(available) = src.available() {
        if prefix_len.saturating_add(len) > available {
            return Err(src.shortfall(prefix_len.saturating_add(len)));
        }
    }
    src.skip(prefix_len)?;
    src.read_vec(len).map(Some)
}

pub fn write_string<W: ByteSink + ?Sized>(sink: &mut W, value: &str, max: usize) -> EncodeResult<()> {
    write_prefixed(sink, "string", value.as_bytes(), max)
}

pub fn read_string_null<S: ByteSource + ?Sized>(
    src: &mut S,
    max: usize,
) -> DecodeResult<Option<String>> {
    let Some(bytes) = read_prefixed_null(src, "string", max)? else {
        return Ok(None);
    };
    String::from_utf8(bytes).map(Some).map_err(|e| {
        DecodeErrorKind::InvalidUtf8 {
            valid_up_to: e.utf8_error().valid_up_to(),
        }
        .into()
    })
}

pub fn read_string<S: ByteSource + ?Sized>(src: &mut S, max: usize) -> DecodeResult<String> {
    read_string_null(src, max)?.ok_or_else(null_not_allowed)
}

pub fn write_binary<W: ByteSink + ?Sized>(sink: &mut W, value: &[u8], max: usize) -> EncodeResult<()> {
    write_prefixed(sink, "binary", value, max)
}

pub fn read_binary_null<S: ByteSource + ?Sized>(
    src: &mut S,
    max: usize,
) -> DecodeResult<Option<Vec<u8>>> {
    read_prefixed_null(src, "binary", max)
}

pub fn read_binary<S: ByteSource + ?Sized>(src: &mut S, max: usize) -> DecodeResult<Vec<u8>> {
    read_binary_null(src, max)?.ok_or_else(null_not_allowed)
}

/// Write exactly `size` raw bytes
pub fn write_fixed<W: ByteSink + ?Sized>(sink: &mut W, value: &[u8], size: usize) -> EncodeResult<()> {
    if value.len() != size {
        return Err(EncodeError::FixedSizeMismatch {
            expected: size,
            actual: value.len(),
        });
    }
    sink.write_all(value);
    Ok(())
}

pub fn read_fixed<S: ByteSource + ?Sized>(src: &mut S, size: usize) -> DecodeResult<Vec<u8>> {
    src.read_vec(size)
}

// Presence flags for inline groups and fixed binaries

pub fn write_presence<W: ByteSink + ?Sized>(sink: &mut W, present: bool) {
    sink.write_u8(if present { PRESENT } else { vlc::NULL });
}

pub fn read_presence<S: ByteSource + ?Sized>(src: &mut S) -> DecodeResult<bool> {
    match src.read_u8()? {
        PRESENT => Ok(true),
        LEGACY_ABSENT | vlc::NULL => Ok(false),
        flag => Err(DecodeErrorKind::InvalidPresenceFlag { flag }.into()),
    }
}

// Time

/// Write an instant as whole `unit`s since `epoch`, rounding down
pub fn write_time<W: ByteSink + ?Sized>(
    sink: &mut W,
    value: DateTime<Utc>,
    epoch: TimeEpoch,
    unit: TimeUnit,
) {
    let since_epoch = value.timestamp_millis() - epoch.offset_millis();
    vlc::write_i64(sink, since_epoch.div_euclid(unit.millis()));
}

pub fn read_time_null<S: ByteSource + ?Sized>(
    src: &mut S,
    epoch: TimeEpoch,
    unit: TimeUnit,
) -> DecodeResult<Option<DateTime<Utc>>> {
    let (value, len) = vlc::peek_i64_null(&*src, 0)?;
    let Some(value) = value else {
        src.skip(len)?;
        return Ok(None);
    };
    let instant = value
        .checked_mul(unit.millis())
        .and_then(|ms| ms.checked_add(epoch.offset_millis()))
        .and_then(DateTime::from_timestamp_millis)
        .ok_or(DecodeErrorKind::TimeOutOfRange { value })?;
    src.skip(len)?;
    Ok(Some(instant))
}

pub fn read_time<S: ByteSource + ?Sized>(
    src: &mut S,
    epoch: TimeEpoch,
    unit: TimeUnit,
) -> DecodeResult<DateTime<Utc>> {
    read_time_null(src, epoch, unit)?.ok_or_else(null_not_allowed)
}

/// Write a time of day as whole `unit`s since midnight, rounding down
pub fn write_time_of_day<W: ByteSink + ?Sized>(sink: &mut W, value: NaiveTime, unit: TimeUnit) {
    // Leap-second nanos fold into the last millisecond of the day
    let millis = (i64::from(value.num_seconds_from_midnight()) * 1_000
        + i64::from(value.nanosecond() / 1_000_000))
    .min(MILLIS_PER_DAY - 1);
    vlc::write_i64(sink, millis.div_euclid(unit.millis()));
}

pub fn read_time_of_day_null<S: ByteSource + ?Sized>(
    src: &mut S,
    unit: TimeUnit,
) -> DecodeResult<Option<NaiveTime>> {
    let (value, len) = vlc::peek_i64_null(&*src, 0)?;
    let Some(value) = value else {
        src.skip(len)?;
        return Ok(None);
    };
    let time = value
        .checked_mul(unit.millis())
        .filter(|ms| (0..MILLIS_PER_DAY).contains(ms))
        .and_then(|ms| {
            NaiveTime::from_num_seconds_from_midnight_opt(
                (ms / 1_000) as u32,
                (ms % 1_000) as u32 * 1_000_000,
            )
        })
        .ok_or(DecodeErrorKind::TimeOutOfRange { value })?;
    src.skip(len)?;
    Ok(Some(time))
}

pub fn read_time_of_day<S: ByteSource + ?Sized>(src: &mut S, unit: TimeUnit) -> DecodeResult<NaiveTime> {
    read_time_of_day_null(src, unit)?.ok_or_else(null_not_allowed)
}

// Sequences

pub fn write_sequence_len<W: ByteSink + ?Sized>(sink: &mut W, len: usize, max: usize) -> EncodeResult<()> {
    if len > max {
        return Err(EncodeError::LengthExceedsMax {
            what: "sequence",
            len,
            max,
        });
    }
    vlc::write_u64(sink, len as u64);
    Ok(())
}

/// Read a sequence element count, checked against `max`
pub fn read_sequence_len_null<S: ByteSource + ?Sized>(
    src: &mut S,
    max: usize,
) -> DecodeResult<Option<usize>> {
    let (len, prefix_len) = vlc::peek_u64_null(&*src, 0)?;
    if let Some(len) = len {
        if len > max as u64 {
            return Err(DecodeError::length_exceeds_max("sequence", len, max));
        }
    }
    src.skip(prefix_len)?;
    Ok(len.map(|len| len as usize))
}
