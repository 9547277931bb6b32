//! Growable, position-tracked writer used by the encoder.

use std::io::{Cursor, Seek, SeekFrom, Write};

use byteorder::{ByteOrder, WriteBytesExt};
use half::f16;

use crate::util::{Error, Result};

/// Output buffer for MOD3 data.
///
/// Writes at the current position overwrite existing bytes and extend the
/// buffer past its end; the buffer never shrinks. Seeking is limited to the
/// already-written extent so offset tables can be patched after the regions
/// they point at are laid out.
pub struct ByteWriter {
    inner: Cursor<Vec<u8>>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Cursor::new(Vec::with_capacity(capacity)),
        }
    }

    /// Get the current write position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.inner.position()
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn len(&self) -> u64 {
        self.inner.get_ref().len() as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.get_ref().is_empty()
    }

    /// Seek to an absolute position inside the written extent.
    pub fn seek(&mut self, pos: u64) -> Result<u64> {
        if pos > self.len() {
            return Err(Error::OutOfBounds {
                pos,
                len: 0,
                size: self.len(),
            });
        }
        Ok(self.inner.seek(SeekFrom::Start(pos))?)
    }

    /// Seek to the end of the written data.
    pub fn seek_end(&mut self) -> Result<u64> {
        Ok(self.inner.seek(SeekFrom::End(0))?)
    }

    /// Write bytes and advance position.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data)?;
        Ok(())
    }

    /// Write `n` zero bytes.
    pub fn write_zeros(&mut self, n: usize) -> Result<()> {
        const ZEROS: [u8; 64] = [0; 64];
        let mut left = n;
        while left > 0 {
            let chunk = left.min(ZEROS.len());
            self.inner.write_all(&ZEROS[..chunk])?;
            left -= chunk;
        }
        Ok(())
    }

    /// Pad with zeros until the position is a multiple of `alignment`.
    pub fn align(&mut self, alignment: u64) -> Result<u64> {
        let rem = self.pos() % alignment;
        if rem != 0 {
            self.write_zeros((alignment - rem) as usize)?;
        }
        Ok(self.pos())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.inner.write_u8(value)?;
        Ok(())
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.inner.write_i8(value)?;
        Ok(())
    }

    pub fn write_u16<E: ByteOrder>(&mut self, value: u16) -> Result<()> {
        self.inner.write_u16::<E>(value)?;
        Ok(())
    }

    pub fn write_u32<E: ByteOrder>(&mut self, value: u32) -> Result<()> {
        self.inner.write_u32::<E>(value)?;
        Ok(())
    }

    pub fn write_u64<E: ByteOrder>(&mut self, value: u64) -> Result<()> {
        self.inner.write_u64::<E>(value)?;
        Ok(())
    }

    pub fn write_f32<E: ByteOrder>(&mut self, value: f32) -> Result<()> {
        self.inner.write_f32::<E>(value)?;
        Ok(())
    }

    /// Write an f32 as IEEE 754 half precision.
    pub fn write_f16<E: ByteOrder>(&mut self, value: f32) -> Result<()> {
        self.inner.write_u16::<E>(f16::from_f32(value).to_bits())?;
        Ok(())
    }

    pub fn write_f32s<E: ByteOrder>(&mut self, values: &[f32]) -> Result<()> {
        for &v in values {
            self.inner.write_f32::<E>(v)?;
        }
        Ok(())
    }

    /// Write a string into a NUL-padded field of fixed width.
    ///
    /// The string must leave room for at least one terminating NUL.
    pub fn write_fixed_str(&mut self, s: &str, width: usize) -> Result<()> {
        let bytes = s.as_bytes();
        if bytes.len() >= width {
            return Err(Error::invalid(format!(
                "String '{}' does not fit in a {}-byte field",
                s, width
            )));
        }
        self.write_bytes(bytes)?;
        self.write_zeros(width - bytes.len())
    }

    /// Overwrite a u64 at `pos`, then return to the end of the buffer.
    pub fn patch_u64<E: ByteOrder>(&mut self, pos: u64, value: u64) -> Result<()> {
        if pos + 8 > self.len() {
            return Err(Error::OutOfBounds {
                pos,
                len: 8,
                size: self.len(),
            });
        }
        self.seek(pos)?;
        self.write_u64::<E>(value)?;
        self.seek_end()?;
        Ok(())
    }

    /// Consume the writer and return the bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}

impl Default for ByteWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::LittleEndian;

    #[test]
    fn test_write_and_patch() {
        let mut w = ByteWriter::new();
        w.write_u64::<LittleEndian>(0).unwrap();
        w.write_u16::<LittleEndian>(0xBEEF).unwrap();
        w.patch_u64::<LittleEndian>(0, 0x1122).unwrap();
        assert_eq!(w.pos(), 10);
        let bytes = w.into_inner();
        assert_eq!(&bytes[..2], &[0x22, 0x11]);
        assert_eq!(&bytes[8..], &[0xEF, 0xBE]);
    }

    #[test]
    fn test_seek_past_end_fails() {
        let mut w = ByteWriter::new();
        w.write_u8(1).unwrap();
        assert!(w.seek(2).is_err());
        assert!(w.patch_u64::<LittleEndian>(0, 5).is_err());
        // Nothing was truncated
        assert_eq!(w.into_inner(), vec![1]);
    }

    #[test]
    fn test_align_and_fixed_str() {
        let mut w = ByteWriter::new();
        w.write_u8(7).unwrap();
        assert_eq!(w.align(16).unwrap(), 16);
        w.write_fixed_str("ab", 4).unwrap();
        assert_eq!(w.len(), 20);
        assert!(w.write_fixed_str("abcd", 4).is_err());
    }
}
