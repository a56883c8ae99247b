//! Little-endian payload cursor shared by data records and command responses.

use bytes::{Buf, BufMut, BytesMut};

/// Why a payload could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("payload too short (needed {needed} more bytes, {remaining} left)")]
    Short { needed: usize, remaining: usize },

    #[error("{0} unexpected trailing bytes")]
    Trailing(usize),

    #[error("element count {0} does not fit the payload")]
    Count(u32),

    #[error("invalid {field}: {value:#x}")]
    Invalid { field: &'static str, value: u32 },

    #[error("text is not valid UTF-8")]
    Utf8,
}

/// Bounds-checked reader over a borrowed payload.
pub(crate) struct PayloadReader<'a> {
    buf: &'a [u8],
}

impl<'a> PayloadReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn need(&self, needed: usize) -> Result<(), PayloadError> {
        if self.buf.remaining() < needed {
            return Err(PayloadError::Short {
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub(crate) fn u8(&mut self) -> Result<u8, PayloadError> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub(crate) fn u32(&mut self) -> Result<u32, PayloadError> {
        self.need(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub(crate) fn f32(&mut self) -> Result<f32, PayloadError> {
        self.need(4)?;
        Ok(self.buf.get_f32_le())
    }

    /// Read `count` floats; the count is checked against the remaining bytes
    /// before anything is allocated.
    pub(crate) fn f32_vec(&mut self, count: u32) -> Result<Vec<f32>, PayloadError> {
        let bytes = (count as usize)
            .checked_mul(4)
            .ok_or(PayloadError::Count(count))?;
        if bytes > self.buf.remaining() {
            return Err(PayloadError::Count(count));
        }
        Ok((0..count).map(|_| self.buf.get_f32_le()).collect())
    }

    pub(crate) fn byte_vec(&mut self, count: u32) -> Result<Vec<u8>, PayloadError> {
        let count_usize = count as usize;
        if count_usize > self.buf.remaining() {
            return Err(PayloadError::Count(count));
        }
        let (head, tail) = self.buf.split_at(count_usize);
        self.buf = tail;
        Ok(head.to_vec())
    }

    /// Everything left, as text. Trailing NUL padding is dropped.
    pub(crate) fn rest_utf8(&mut self) -> Result<String, PayloadError> {
        let text = std::str::from_utf8(self.buf).map_err(|_| PayloadError::Utf8)?;
        self.buf = &[];
        Ok(text.trim_end_matches('\0').to_string())
    }

    pub(crate) fn finish(self) -> Result<(), PayloadError> {
        match self.buf.remaining() {
            0 => Ok(()),
            n => Err(PayloadError::Trailing(n)),
        }
    }
}

/// Builder for little-endian request payloads.
#[derive(Default)]
pub(crate) struct PayloadWriter {
    buf: BytesMut,
}

impl PayloadWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn u8(mut self, value: u8) -> Self {
        self.buf.put_u8(value);
        self
    }

    pub(crate) fn u16(mut self, value: u16) -> Self {
        self.buf.put_u16_le(value);
        self
    }

    pub(crate) fn u32(mut self, value: u32) -> Self {
        self.buf.put_u32_le(value);
        self
    }

    pub(crate) fn f32(mut self, value: f32) -> Self {
        self.buf.put_f32_le(value);
        self
    }

    pub(crate) fn bytes(mut self, value: &[u8]) -> Self {
        self.buf.put_slice(value);
        self
    }

    pub(crate) fn finish(self) -> BytesMut {
        self.buf
    }
}
