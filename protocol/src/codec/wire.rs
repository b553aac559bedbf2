//! Little-endian writer and bounds-checked reader.
//!
//! [`WireWriter`] appends into a `BytesMut`; it cannot fail except on
//! length prefixes that do not fit their width. [`WireReader`] walks a
//! borrowed slice and never panics on short input.

use bytes::{BufMut, BytesMut};

use super::CodecError;

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.buf.put_u16_le(v);
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    pub fn put_u64(&mut self, v: u64) {
        self.buf.put_u64_le(v);
    }

    /// Raw bytes, no prefix. For fixed-width fields.
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// One length byte followed by the bytes.
    pub fn put_prefixed(&mut self, field: &'static str, bytes: &[u8]) -> Result<(), CodecError> {
        let length = u8::try_from(bytes.len()).map_err(|_| CodecError::BadLengthPrefix {
            field,
            length: bytes.len(),
        })?;
        self.buf.put_u8(length);
        self.buf.put_slice(bytes);
        Ok(())
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// A cursor over a borrowed buffer.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Starts reading at `cursor` rather than the beginning.
    pub fn at(bytes: &'a [u8], cursor: usize) -> Result<Self, CodecError> {
        if cursor > bytes.len() {
            return Err(CodecError::Truncated {
                needed: cursor,
                remaining: bytes.len(),
            });
        }
        Ok(Self { bytes, pos: cursor })
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::Truncated {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u16(&mut self) -> Result<u16, CodecError> {
        self.array().map(u16::from_le_bytes)
    }

    pub fn u32(&mut self) -> Result<u32, CodecError> {
        self.array().map(u32::from_le_bytes)
    }

    pub fn u64(&mut self) -> Result<u64, CodecError> {
        self.array().map(u64::from_le_bytes)
    }

    /// Reads a one-byte length and that many bytes, rejecting lengths
    /// outside `[min, max]` before touching the payload.
    pub fn prefixed(
        &mut self,
        field: &'static str,
        min: usize,
        max: usize,
    ) -> Result<&'a [u8], CodecError> {
        let length = usize::from(self.u8()?);
        if length < min || length > max {
            return Err(CodecError::BadLengthPrefix { field, length });
        }
        self.take(length)
    }

    /// A `0`/`1` presence flag.
    pub fn flag(&mut self, field: &'static str) -> Result<bool, CodecError> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::UnknownDiscriminator {
                field,
                value: u64::from(other),
            }),
        }
    }

    /// Fails with [`CodecError::TrailingBytes`] unless the buffer is spent.
    pub fn finish(&self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}
