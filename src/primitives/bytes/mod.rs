#![forbid(unsafe_code)]
//! Fixed-width and varint helpers shared by page and row encoders.

pub mod be {
    //! Bounds-checked big-endian field access into page buffers.

    use core::convert::TryInto;

    use crate::types::{Result, SombraError};

    fn field(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
        let end = offset
            .checked_add(len)
            .ok_or(SombraError::Corruption("field offset overflow"))?;
        buf.get(offset..end)
            .ok_or(SombraError::Corruption("field extends past buffer"))
    }

    fn field_mut(buf: &mut [u8], offset: usize, len: usize) -> Result<&mut [u8]> {
        let end = offset
            .checked_add(len)
            .ok_or(SombraError::Invalid("field offset overflow"))?;
        buf.get_mut(offset..end)
            .ok_or(SombraError::Invalid("field does not fit in buffer"))
    }

    /// Reads a big-endian `u16` at `offset`.
    pub fn read_u16(buf: &[u8], offset: usize) -> Result<u16> {
        let bytes = field(buf, offset, 2)?;
        Ok(u16::from_be_bytes(bytes.try_into().unwrap()))
    }

    /// Reads a big-endian `u32` at `offset`.
    pub fn read_u32(buf: &[u8], offset: usize) -> Result<u32> {
        let bytes = field(buf, offset, 4)?;
        Ok(u32::from_be_bytes(bytes.try_into().unwrap()))
    }

    /// Reads a big-endian `u64` at `offset`.
    pub fn read_u64(buf: &[u8], offset: usize) -> Result<u64> {
        let bytes = field(buf, offset, 8)?;
        Ok(u64::from_be_bytes(bytes.try_into().unwrap()))
    }

    /// Writes a big-endian `u16` at `offset`.
    pub fn write_u16(buf: &mut [u8], offset: usize, value: u16) -> Result<()> {
        field_mut(buf, offset, 2)?.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Writes a big-endian `u32` at `offset`.
    pub fn write_u32(buf: &mut [u8], offset: usize, value: u32) -> Result<()> {
        field_mut(buf, offset, 4)?.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Writes a big-endian `u64` at `offset`.
    pub fn write_u64(buf: &mut [u8], offset: usize, value: u64) -> Result<()> {
        field_mut(buf, offset, 8)?.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Copies `src` into `buf` starting at `offset`.
    pub fn write_bytes(buf: &mut [u8], offset: usize, src: &[u8]) -> Result<()> {
        field_mut(buf, offset, src.len())?.copy_from_slice(src);
        Ok(())
    }
}

pub mod var {
    //! Unsigned LEB128-style varints.

    /// Encodes a u64 as an unsigned varint.
    pub fn encode_u64(mut v: u64, out: &mut Vec<u8>) {
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                out.push(byte);
                break;
            }
            out.push(byte | 0x80);
        }
    }

    /// Number of bytes `encode_u64` emits for `v`.
    pub fn encoded_len_u64(mut v: u64) -> usize {
        let mut len = 1;
        while v >= 0x80 {
            v >>= 7;
            len += 1;
        }
        len
    }
}
