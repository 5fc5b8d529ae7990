//! Byte sink and byte source boundaries
//!
//! The codec needs only two capabilities from the outside world: somewhere
//! to append bytes, and somewhere to read them from with an adjustable
//! limit. The limit is how dynamic groups keep a nested decode inside its
//! declared size and skip whatever it did not recognize.

use crate::error::{DecodeError, DecodeErrorKind, DecodeResult};

/// Write-only byte boundary
pub trait ByteSink {
    fn write_u8(&mut self, byte: u8);
    fn write_all(&mut self, bytes: &[u8]);
    /// Bytes written so far
    fn position(&self) -> usize;
}

impl ByteSink for Vec<u8> {
    #[inline]
    fn write_u8(&mut self, byte: u8) {
        self.push(byte);
    }

    #[inline]
    fn write_all(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }

    #[inline]
    fn position(&self) -> usize {
        self.len()
    }
}

/// Read-only byte boundary with an optional limit
///
/// Implementations must not consume anything from a read that fails.
pub trait ByteSource {
    fn read_u8(&mut self) -> DecodeResult<u8>;

    /// Copy the `buf.len()` bytes starting `offset` bytes ahead, consuming
    /// nothing
    ///
    /// Fails exactly as reading `offset + buf.len()` bytes would.
    fn peek(&self, offset: usize, buf: &mut [u8]) -> DecodeResult<()>;

    fn read_exact(&mut self, buf: &mut [u8]) -> DecodeResult<()>;

    /// Read `len` bytes into a new buffer
    ///
    /// Checks [`ByteSource::available`] before allocating, so a forged
    /// length prefix cannot force a large allocation.
    fn read_vec(&mut self, len: usize) -> DecodeResult<Vec<u8>> {
        if let Some(available) = self.available() {
            if len > available {
                return Err(self.shortfall(len));
            }
        }
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn skip(&mut self, n: usize) -> DecodeResult<()>;

    /// Bytes consumed so far
    fn position(&self) -> usize;

    /// Bytes that can still be read before the limit or end of input,
    /// when known
    fn available(&self) -> Option<usize>;

    /// Bytes remaining before the current limit, if one is set
    fn limit(&self) -> Option<usize>;

    /// Allow at most `limit` more bytes to be read, or remove the limit
    fn set_limit(&mut self, limit: Option<usize>);

    /// Error describing why `needed` bytes cannot be read
    fn shortfall(&self, needed: usize) -> DecodeError;
}

/// [`ByteSource`] over a borrowed byte slice
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
    /// Absolute end position allowed by the current limit
    end: Option<usize>,
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            end: None,
        }
    }

    /// Input not yet consumed, ignoring any limit
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// True once every input byte has been consumed
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.data.len()
    }

    #[inline]
    fn check(&self, n: usize) -> DecodeResult<()> {
        let want = self.pos.saturating_add(n);
        if let Some(end) = self.end {
            if want > end {
                return Err(DecodeError::beyond_group_size(want - end));
            }
        }
        if want > self.data.len() {
            return Err(DecodeError::eof(n, self.data.len() - self.pos));
        }
        Ok(())
    }
}

impl ByteSource for SliceSource<'_> {
    #[inline]
    fn read_u8(&mut self) -> DecodeResult<u8> {
        self.check(1)?;
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    #[inline]
    fn peek(&self, offset: usize, buf: &mut [u8]) -> DecodeResult<()> {
        self.check(offset.saturating_add(buf.len()))?;
        let start = self.pos + offset;
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        Ok(())
    }

    #[inline]
    fn read_exact(&mut self, buf: &mut [u8]) -> DecodeResult<()> {
        self.check(buf.len())?;
        buf.copy_from_slice(&self.data[self.pos..self.pos + buf.len()]);
        self.pos += buf.len();
        Ok(())
    }

    fn read_vec(&mut self, len: usize) -> DecodeResult<Vec<u8>> {
        self.check(len)?;
        let bytes = self.data[self.pos..self.pos + len].to_vec();
        self.pos += len;
        Ok(bytes)
    }

    fn skip(&mut self, n: usize) -> DecodeResult<()> {
        self.check(n)?;
        self.pos += n;
        Ok(())
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn available(&self) -> Option<usize> {
        let to_eof = self.data.len() - self.pos;
        Some(match self.end {
            Some(end) => to_eof.min(end - self.pos),
            None => to_eof,
        })
    }

    fn limit(&self) -> Option<usize> {
        self.end.map(|end| end - self.pos)
    }

    fn set_limit(&mut self, limit: Option<usize>) {
        self.end = limit.map(|n| self.pos.saturating_add(n));
    }

    fn shortfall(&self, needed: usize) -> DecodeError {
        match self.check(needed) {
            Err(e) => e,
            Ok(()) => DecodeErrorKind::UnexpectedEof {
                needed,
                available: self.data.len() - self.pos,
            }
            .into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_sink_tracks_position() {
        let mut sink = Vec::new();
        ByteSink::write_u8(&mut sink, 1);
        ByteSink::write_all(&mut sink, &[2, 3]);
        assert_eq!(ByteSink::position(&sink), 3);
        assert_eq!(sink, vec![1, 2, 3]);
    }

    #[test]
    fn test_reads_and_eof_without_consuming() {
        let data = [1u8, 2, 3];
        let mut src = SliceSource::new(&data);
        assert_eq!(src.read_u8().unwrap(), 1);

        let mut buf = [0u8; 4];
        let err = src.read_exact(&mut buf).unwrap_err();
        assert_eq!(
            err.kind(),
            &DecodeErrorKind::UnexpectedEof {
                needed: 4,
                available: 2
            }
        );
        // Failed read consumed nothing
        assert_eq!(src.position(), 1);
        assert_eq!(src.read_vec(2).unwrap(), vec![2, 3]);
        assert!(src.is_exhausted());
    }

    #[test]
    fn test_limit_blocks_reads_and_reports_excess() {
        let data = [0u8; 10];
        let mut src = SliceSource::new(&data);
        src.skip(2).unwrap();
        src.set_limit(Some(3));
        assert_eq!(src.limit(), Some(3));
        assert_eq!(src.available(), Some(3));

        let err = src.read_vec(5).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::BeyondGroupSize { excess: 2 });

        src.skip(3).unwrap();
        assert_eq!(src.limit(), Some(0));
        assert!(src.read_u8().is_err());

        src.set_limit(None);
        assert_eq!(src.available(), Some(5));
        assert_eq!(src.read_u8().unwrap(), 0);
    }

    #[test]
    fn test_peek_leaves_position() {
        let data = [1u8, 2, 3, 4];
        let mut src = SliceSource::new(&data);
        src.skip(1).unwrap();

        let mut buf = [0u8; 2];
        src.peek(1, &mut buf).unwrap();
        assert_eq!(buf, [3, 4]);
        assert_eq!(src.position(), 1);

        let err = src.peek(2, &mut buf).unwrap_err();
        assert_eq!(
            err.kind(),
            &DecodeErrorKind::UnexpectedEof {
                needed: 4,
                available: 3
            }
        );

        src.set_limit(Some(2));
        let err = src.peek(1, &mut buf).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::BeyondGroupSize { excess: 1 });
        assert_eq!(src.position(), 1);
    }
}
