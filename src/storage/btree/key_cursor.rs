use std::convert::TryInto;

use crate::types::{Result, SombraError};

/// Lightweight reader over a serialized row, without allocation.
#[derive(Clone, Copy, Debug)]
pub struct KeyCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> KeyCursor<'a> {
    /// Creates a cursor positioned at `offset` within `buf`.
    pub fn at(buf: &'a [u8], offset: usize) -> Result<Self> {
        if offset > buf.len() {
            return Err(SombraError::Corruption("row offset past page end"));
        }
        Ok(Self { buf, pos: offset })
    }

    /// Reads a big-endian `u64`.
    pub fn read_u64(&mut self, truncated_msg: &'static str) -> Result<u64> {
        let bytes = self
            .take(8)
            .map_err(|_| SombraError::Corruption(truncated_msg))?;
        let raw: [u8; 8] = bytes
            .try_into()
            .map_err(|_| SombraError::Corruption(truncated_msg))?;
        Ok(u64::from_be_bytes(raw))
    }

    /// Reads an unsigned varint, returning an error with `truncated_msg` if input ends early.
    pub fn read_var_u64(&mut self, truncated_msg: &'static str) -> Result<u64> {
        let mut result = 0u64;
        let mut shift = 0u32;
        for _ in 0..10 {
            let byte = *self
                .buf
                .get(self.pos)
                .ok_or(SombraError::Corruption(truncated_msg))?;
            self.pos += 1;
            result |= ((byte & 0x7f) as u64) << shift;
            if (byte & 0x80) == 0 {
                return Ok(result);
            }
            shift += 7;
        }
        Err(SombraError::Corruption("row varint too long"))
    }

    /// Takes `len` bytes from the cursor without copying.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or(SombraError::Corruption("row length overflow"))?;
        if end > self.buf.len() {
            return Err(SombraError::Corruption("row truncated by page end"));
        }
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }
}
