//! # Variable-Length Integer Codec
//!
//! ## Purpose
//!
//! Every integer on the wire (lengths, ids, counts, numeric fields, float
//! bit patterns) uses this encoding, so it has to be bit-exact with other
//! implementations of the format.
//!
//! ## Wire Layout
//!
//! ```text
//! 0xxxxxxx                      7 data bits   unsigned 0..=127, signed -64..=63
//! 10xxxxxx xxxxxxxx             14 data bits  low 6 bits first, then 8 more
//! 11nnnnnn <n bytes LE>         n in 1..=9 data bytes (signed: sign-extended)
//! 11000000                      null (extended form with zero bytes)
//! ```
//!
//! Encoding always picks the shortest form. Decoding accepts any valid
//! form, including non-minimal ones. Readers decode from a peek and consume
//! the value only once it is known to be whole and valid, so a failed read
//! leaves the source where it was.
//!
//! ## Performance Profile
//!
//! - **Encode**: branch on magnitude, no allocation
//! - **Decode**: one header byte plus at most nine data bytes, stack buffer

use crate::error::{DecodeError, DecodeErrorKind, DecodeResult, EncodeError, EncodeResult};
use crate::io::{ByteSink, ByteSource};
use num_bigint::BigInt;

/// Null marker, also the header of a zero-byte extended value
pub const NULL: u8 = 0xC0;

/// Largest data byte count accepted for 64-bit kinds
pub const MAX_EXTENDED_BYTES: usize = 9;

/// Largest data byte count of any extended value (6-bit size field)
pub const MAX_BIG_INT_BYTES: usize = 63;

const TWO_BYTE_TAG: u8 = 0x80;
const EXTENDED_TAG: u8 = 0xC0;
const DATA_MASK: u8 = 0x3F;

/// Header of a value, decoded without consuming it
enum Head {
    Null,
    /// Inline value with its data bit width (7 or 14)
    Short { raw: u64, bits: u32 },
    /// Extended value with `n` data bytes after the header byte
    Extended(usize),
}

/// Decode the header `offset` bytes ahead, returning it with the encoded
/// length of the whole value
fn peek_head<S: ByteSource + ?Sized>(src: &S, offset: usize) -> DecodeResult<(Head, usize)> {
    let mut first = [0u8; 1];
    src.peek(offset, &mut first)?;
    let first = first[0];
    if first & 0x80 == 0 {
        let head = Head::Short {
            raw: u64::from(first),
            bits: 7,
        };
        return Ok((head, 1));
    }
    if first & 0x40 == 0 {
        let mut pair = [0u8; 2];
        src.peek(offset, &mut pair)?;
        let head = Head::Short {
            raw: u64::from(first & DATA_MASK) | (u64::from(pair[1]) << 6),
            bits: 14,
        };
        return Ok((head, 2));
    }
    match (first & DATA_MASK) as usize {
        0 => Ok((Head::Null, 1)),
        n => Ok((Head::Extended(n), 1 + n)),
    }
}

/// Copy the `n` data bytes of an extended value whose header sits
/// `offset` bytes ahead
fn peek_extended<S: ByteSource + ?Sized>(
    src: &S,
    offset: usize,
    n: usize,
) -> DecodeResult<[u8; MAX_EXTENDED_BYTES]> {
    if n > MAX_EXTENDED_BYTES {
        return Err(DecodeErrorKind::VlcOverflow { size: n }.into());
    }
    let mut encoded = [0u8; 1 + MAX_EXTENDED_BYTES];
    src.peek(offset, &mut encoded[..1 + n])?;
    let mut buf = [0u8; MAX_EXTENDED_BYTES];
    buf[..n].copy_from_slice(&encoded[1..=n]);
    Ok(buf)
}

#[inline]
fn sign_extend(raw: u64, bits: u32) -> i64 {
    let shift = 64 - bits;
    ((raw << shift) as i64) >> shift
}

/// Write the null marker
#[inline]
pub fn write_null<W: ByteSink + ?Sized>(sink: &mut W) {
    sink.write_u8(NULL);
}

/// Write an unsigned value in its shortest form
pub fn write_u64<W: ByteSink + ?Sized>(sink: &mut W, value: u64) {
    if value < 0x80 {
        sink.write_u8(value as u8);
    } else if value < 0x4000 {
        sink.write_u8(TWO_BYTE_TAG | (value as u8 & DATA_MASK));
        sink.write_u8((value >> 6) as u8);
    } else {
        let n = (64 - value.leading_zeros() as usize + 7) / 8;
        sink.write_u8(EXTENDED_TAG | n as u8);
        sink.write_all(&value.to_le_bytes()[..n]);
    }
}

/// Write a signed value in its shortest form
pub fn write_i64<W: ByteSink + ?Sized>(sink: &mut W, value: i64) {
    if (-64..=63).contains(&value) {
        sink.write_u8(value as u8 & 0x7F);
    } else if (-8192..=8191).contains(&value) {
        sink.write_u8(TWO_BYTE_TAG | (value as u8 & DATA_MASK));
        sink.write_u8((value >> 6) as u8);
    } else {
        // Significant bits plus one sign bit
        let magnitude = if value < 0 { !value } else { value };
        let bits = 65 - magnitude.leading_zeros() as usize;
        let n = (bits + 7) / 8;
        sink.write_u8(EXTENDED_TAG | n as u8);
        sink.write_all(&value.to_le_bytes()[..n]);
    }
}

/// Decode an unsigned value `offset` bytes ahead without consuming it,
/// returning it with its encoded length
pub(crate) fn peek_u64_null<S: ByteSource + ?Sized>(
    src: &S,
    offset: usize,
) -> DecodeResult<(Option<u64>, usize)> {
    let (head, len) = peek_head(src, offset)?;
    let value = match head {
        Head::Null => None,
        Head::Short { raw, .. } => Some(raw),
        Head::Extended(n) => {
            let buf = peek_extended(src, offset, n)?;
            if n == MAX_EXTENDED_BYTES && buf[8] != 0 {
                return Err(DecodeErrorKind::VlcOverflow { size: n }.into());
            }
            let mut word = [0u8; 8];
            word.copy_from_slice(&buf[..8]);
            Some(u64::from_le_bytes(word))
        }
    };
    Ok((value, len))
}

/// Decode a signed value `offset` bytes ahead without consuming it,
/// returning it with its encoded length
pub(crate) fn peek_i64_null<S: ByteSource + ?Sized>(
    src: &S,
    offset: usize,
) -> DecodeResult<(Option<i64>, usize)> {
    let (head, len) = peek_head(src, offset)?;
    let value = match head {
        Head::Null => None,
        Head::Short { raw, bits } => Some(sign_extend(raw, bits)),
        Head::Extended(n) => {
            let buf = peek_extended(src, offset, n)?;
            let mut word = [0u8; 8];
            word.copy_from_slice(&buf[..8]);
            let mut value = i64::from_le_bytes(word);
            if n < 8 {
                value = sign_extend(value as u64, 8 * n as u32);
            } else if n == MAX_EXTENDED_BYTES {
                let extension = if value < 0 { 0xFF } else { 0x00 };
                if buf[8] != extension {
                    return Err(DecodeErrorKind::VlcOverflow { size: n }.into());
                }
            }
            Some(value)
        }
    };
    Ok((value, len))
}

/// Read an unsigned value, `None` for the null marker
pub fn read_u64_null<S: ByteSource + ?Sized>(src: &mut S) -> DecodeResult<Option<u64>> {
    let (value, len) = peek_u64_null(&*src, 0)?;
    src.skip(len)?;
    Ok(value)
}

/// Read a signed value, `None` for the null marker
pub fn read_i64_null<S: ByteSource + ?Sized>(src: &mut S) -> DecodeResult<Option<i64>> {
    let (value, len) = peek_i64_null(&*src, 0)?;
    src.skip(len)?;
    Ok(value)
}

/// Read a required unsigned value
pub fn read_u64<S: ByteSource + ?Sized>(src: &mut S) -> DecodeResult<u64> {
    read_u64_null(src)?.ok_or_else(null_not_allowed)
}

/// Read a required signed value
pub fn read_i64<S: ByteSource + ?Sized>(src: &mut S) -> DecodeResult<i64> {
    read_i64_null(src)?.ok_or_else(null_not_allowed)
}

pub(crate) fn null_not_allowed() -> DecodeError {
    DecodeErrorKind::NullNotAllowed.into()
}

macro_rules! narrow_readers {
    ($($ty:ident: $read:ident, $read_null:ident via $wide_peek:ident;)*) => {
        $(
            #[doc = concat!("Read a required `", stringify!($ty), "`, rejecting wider values")]
            pub fn $read<S: ByteSource + ?Sized>(src: &mut S) -> DecodeResult<$ty> {
                $read_null(src)?.ok_or_else(null_not_allowed)
            }

            #[doc = concat!("Read a nullable `", stringify!($ty), "`, rejecting wider values")]
            pub fn $read_null<S: ByteSource + ?Sized>(src: &mut S) -> DecodeResult<Option<$ty>> {
                let (wide, len) = $wide_peek(&*src, 0)?;
                let value = match wide {
                    None => None,
                    Some(value) => Some(
                        $ty::try_from(value)
                            .map_err(|_| DecodeError::int_out_of_range(stringify!($ty), value))?,
                    ),
                };
                src.skip(len)?;
                Ok(value)
            }
        )*
    };
}

narrow_readers! {
    i8: read_i8, read_i8_null via peek_i64_null;
    u8: read_u8, read_u8_null via peek_u64_null;
    i16: read_i16, read_i16_null via peek_i64_null;
    u16: read_u16, read_u16_null via peek_u64_null;
    i32: read_i32, read_i32_null via peek_i64_null;
    u32: read_u32, read_u32_null via peek_u64_null;
}

/// Write an arbitrary-precision integer
///
/// Values that fit 64 bits use the signed form; wider values use the
/// extended form with up to 63 two's-complement bytes.
pub fn write_big_int<W: ByteSink + ?Sized>(sink: &mut W, value: &BigInt) -> EncodeResult<()> {
    if let Ok(small) = i64::try_from(value) {
        write_i64(sink, small);
        return Ok(());
    }
    let bytes = value.to_signed_bytes_le();
    if bytes.len() > MAX_BIG_INT_BYTES {
        return Err(EncodeError::out_of_range("bigint", value));
    }
    sink.write_u8(EXTENDED_TAG | bytes.len() as u8);
    sink.write_all(&bytes);
    Ok(())
}

/// Decode an arbitrary-precision integer `offset` bytes ahead without
/// consuming it, returning it with its encoded length
pub(crate) fn peek_big_int_null<S: ByteSource + ?Sized>(
    src: &S,
    offset: usize,
) -> DecodeResult<(Option<BigInt>, usize)> {
    let (head, len) = peek_head(src, offset)?;
    let value = match head {
        Head::Null => None,
        Head::Short { raw, bits } => Some(BigInt::from(sign_extend(raw, bits))),
        Head::Extended(_) => {
            // At most 64 bytes, so the buffer is bounded by the header
            let mut encoded = vec![0u8; len];
            src.peek(offset, &mut encoded)?;
            Some(BigInt::from_signed_bytes_le(&encoded[1..]))
        }
    };
    Ok((value, len))
}

/// Read an arbitrary-precision integer, `None` for the null marker
pub fn read_big_int_null<S: ByteSource + ?Sized>(src: &mut S) -> DecodeResult<Option<BigInt>> {
    let (value, len) = peek_big_int_null(&*src, 0)?;
    src.skip(len)?;
    Ok(value)
}

pub fn read_big_int<S: ByteSource + ?Sized>(src: &mut S) -> DecodeResult<BigInt> {
    read_big_int_null(src)?.ok_or_else(null_not_allowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::SliceSource;

    fn unsigned(value: u64) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::new();
        write_u64(&mut out, value);
        out
    }

    fn signed(value: i64) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::new();
        write_i64(&mut out, value);
        out
    }

    #[test]
    fn test_unsigned_forms() {
        assert_eq!(unsigned(0), vec![0x00]);
        assert_eq!(unsigned(127), vec![0x7F]);
        assert_eq!(unsigned(128), vec![0x80, 0x02]);
        assert_eq!(unsigned(16383), vec![0xBF, 0xFF]);
        assert_eq!(unsigned(16384), vec![0xC2, 0x00, 0x40]);
        assert_eq!(unsigned(100_000), vec![0xC3, 0xA0, 0x86, 0x01]);
        assert_eq!(unsigned(u64::MAX).len(), 9);
    }

    #[test]
    fn test_signed_forms() {
        assert_eq!(signed(-1), vec![0x7F]);
        assert_eq!(signed(63), vec![0x3F]);
        assert_eq!(signed(-64), vec![0x40]);
        assert_eq!(signed(64), vec![0x80, 0x01]);
        assert_eq!(signed(-8192), vec![0x80, 0x80]);
        assert_eq!(signed(8192), vec![0xC2, 0x00, 0x20]);
        assert_eq!(signed(-8193), vec![0xC2, 0xFF, 0xDF]);
        assert_eq!(signed(i64::MIN).len(), 9);
    }

    #[test]
    fn test_roundtrip_edges() {
        for value in [0, 1, 127, 128, 16383, 16384, u32::MAX as u64, u64::MAX] {
            let bytes = unsigned(value);
            assert_eq!(read_u64(&mut SliceSource::new(&bytes)).unwrap(), value);
        }
        for value in [0, -1, 63, -64, 8191, -8192, i32::MIN as i64, i64::MAX, i64::MIN] {
            let bytes = signed(value);
            assert_eq!(read_i64(&mut SliceSource::new(&bytes)).unwrap(), value);
        }
    }

    #[test]
    fn test_null_marker() {
        let mut out: Vec<u8> = Vec::new();
        write_null(&mut out);
        assert_eq!(out, vec![NULL]);

        let mut src = SliceSource::new(&out);
        assert_eq!(read_u64_null(&mut src).unwrap(), None);

        let err = read_i64(&mut SliceSource::new(&out)).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::NullNotAllowed);
    }

    #[test]
    fn test_non_minimal_accepted() {
        // 5 encoded with three data bytes
        let bytes = [0xC3, 0x05, 0x00, 0x00];
        assert_eq!(read_u64(&mut SliceSource::new(&bytes)).unwrap(), 5);
        assert_eq!(read_i64(&mut SliceSource::new(&bytes)).unwrap(), 5);

        // Nine bytes with a pure sign extension byte
        let mut nine = vec![0xC9];
        nine.extend_from_slice(&(-2i64).to_le_bytes());
        nine.push(0xFF);
        assert_eq!(read_i64(&mut SliceSource::new(&nine)).unwrap(), -2);
    }

    #[test]
    fn test_overflow_rejected() {
        let mut nine = vec![0xC9];
        nine.extend_from_slice(&[0xFF; 8]);
        nine.push(0x01);
        let err = read_u64(&mut SliceSource::new(&nine)).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::VlcOverflow { size: 9 });

        let ten = [0xCA; 11];
        let err = read_i64(&mut SliceSource::new(&ten)).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::VlcOverflow { size: 10 });
    }

    #[test]
    fn test_narrow_readers_check_width() {
        let bytes = unsigned(300);
        assert_eq!(read_u16(&mut SliceSource::new(&bytes)).unwrap(), 300);
        let err = read_u8(&mut SliceSource::new(&bytes)).unwrap_err();
        assert_eq!(
            err.kind(),
            &DecodeErrorKind::IntOutOfRange {
                kind: "u8",
                value: 300
            }
        );

        let bytes = signed(-129);
        assert!(read_i8(&mut SliceSource::new(&bytes)).is_err());
        assert_eq!(read_i16(&mut SliceSource::new(&bytes)).unwrap(), -129);
        assert_eq!(read_i32_null(&mut SliceSource::new(&[NULL])).unwrap(), None);
    }

    #[test]
    fn test_big_int_forms() {
        let small = BigInt::from(-1);
        let mut out: Vec<u8> = Vec::new();
        write_big_int(&mut out, &small).unwrap();
        assert_eq!(out, vec![0x7F]);

        let wide = BigInt::from(u64::MAX) * 1000;
        let mut out: Vec<u8> = Vec::new();
        write_big_int(&mut out, &wide).unwrap();
        assert_eq!(out[0], EXTENDED_TAG | (out.len() - 1) as u8);
        assert!(out.len() - 1 > 8);
        assert_eq!(read_big_int(&mut SliceSource::new(&out)).unwrap(), wide);

        let negative = -(BigInt::from(1) << 100usize);
        let mut out: Vec<u8> = Vec::new();
        write_big_int(&mut out, &negative).unwrap();
        assert_eq!(read_big_int(&mut SliceSource::new(&out)).unwrap(), negative);
    }

    #[test]
    fn test_big_int_too_wide() {
        let huge = BigInt::from(1) << (MAX_BIG_INT_BYTES * 8);
        let err = write_big_int(&mut Vec::<u8>::new(), &huge).unwrap_err();
        assert!(matches!(err, EncodeError::OutOfRange { kind: "bigint", .. }));
    }

    #[test]
    fn test_truncated_extended() {
        let mut src = SliceSource::new(&[0xC3, 0x01]);
        let err = read_u64(&mut src).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::UnexpectedEof { needed: 4, .. }));
        assert_eq!(src.position(), 0);
    }

    #[test]
    fn test_truncated_two_byte_form_consumes_nothing() {
        let mut src = SliceSource::new(&[0x80]);
        let err = read_u64(&mut src).unwrap_err();
        assert_eq!(
            err.kind(),
            &DecodeErrorKind::UnexpectedEof {
                needed: 2,
                available: 1
            }
        );
        assert_eq!(src.position(), 0);

        // Cut by a group limit rather than the end of input
        let bytes = [0x05, 0x80, 0x02];
        let mut src = SliceSource::new(&bytes);
        src.skip(1).unwrap();
        src.set_limit(Some(1));
        let err = read_i64_null(&mut src).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::BeyondGroupSize { excess: 1 });
        assert_eq!(src.position(), 1);
    }

    #[test]
    fn test_rejected_values_consume_nothing() {
        let bytes = unsigned(300);
        let mut src = SliceSource::new(&bytes);
        assert!(read_u8(&mut src).is_err());
        assert_eq!(src.position(), 0);
        assert_eq!(read_u16(&mut src).unwrap(), 300);

        let mut nine = vec![0xC9];
        nine.extend_from_slice(&[0xFF; 8]);
        nine.push(0x01);
        let mut src = SliceSource::new(&nine);
        assert!(read_u64(&mut src).is_err());
        assert_eq!(src.position(), 0);

        let mut src = SliceSource::new(&[0xCA, 0x01, 0x02]);
        assert!(read_big_int(&mut src).is_err());
        assert_eq!(src.position(), 0);
    }
}
