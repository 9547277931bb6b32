//! Bounds-checked sequential reader over a borrowed byte buffer.

use byteorder::ByteOrder;
use half::f16;

use crate::util::{Error, Result};

/// Sequential, offset-tracked reader.
///
/// Every read is checked against the buffer extent and fails with
/// [`Error::OutOfBounds`] instead of panicking. Endianness is chosen per read
/// through a `byteorder` type parameter.
#[derive(Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Get the current read position.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Total size of the underlying buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left after the current position.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Move to an absolute position. Seeking to the very end is allowed.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        if pos > self.data.len() as u64 {
            return Err(self.out_of_bounds(pos, 0));
        }
        self.pos = pos as usize;
        Ok(())
    }

    /// Advance by `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    fn out_of_bounds(&self, pos: u64, len: usize) -> Error {
        Error::OutOfBounds {
            pos,
            len,
            size: self.data.len() as u64,
        }
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| self.out_of_bounds(self.pos as u64, n))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// Read a fixed-size byte array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    #[inline]
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    #[inline]
    pub fn read_u16<E: ByteOrder>(&mut self) -> Result<u16> {
        Ok(E::read_u16(self.take(2)?))
    }

    #[inline]
    pub fn read_u32<E: ByteOrder>(&mut self) -> Result<u32> {
        Ok(E::read_u32(self.take(4)?))
    }

    #[inline]
    pub fn read_u64<E: ByteOrder>(&mut self) -> Result<u64> {
        Ok(E::read_u64(self.take(8)?))
    }

    #[inline]
    pub fn read_f32<E: ByteOrder>(&mut self) -> Result<f32> {
        Ok(E::read_f32(self.take(4)?))
    }

    /// Read an IEEE 754 half-precision float.
    #[inline]
    pub fn read_f16<E: ByteOrder>(&mut self) -> Result<f32> {
        Ok(f16::from_bits(E::read_u16(self.take(2)?)).to_f32())
    }

    /// Read `N` consecutive f32 values.
    pub fn read_f32s<E: ByteOrder, const N: usize>(&mut self) -> Result<[f32; N]> {
        let mut out = [0f32; N];
        E::read_f32_into(self.take(N * 4)?, &mut out);
        Ok(out)
    }

    /// Read a NUL-padded string field of fixed width.
    pub fn read_fixed_str(&mut self, width: usize) -> Result<String> {
        let raw = self.take(width)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
    }
}
