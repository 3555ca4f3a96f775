use crate::dex::error::DexError;
use crate::dex::leb::{decode_sleb128, decode_uleb128, decode_uleb128p1};

/// A read cursor over an immutable byte buffer.
///
/// Sequential reads advance the internal position; the `*_at` variants read
/// at an explicit offset and leave the position untouched. All multi-byte
/// integers are little-endian, per the DEX format.
#[derive(Debug)]
pub struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Cursor<'a> {
        Cursor { bytes, pos: 0 }
    }

    pub fn seek(&mut self, pos: usize) -> Result<(), DexError> {
        if pos > self.bytes.len() {
            return Err(DexError::OutOfRange { offset: pos, len: self.bytes.len() });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn tell(&self) -> usize {
        self.pos
    }

    pub fn skip(&mut self, n: usize) {
        self.pos += n;
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    fn check(&self, offset: usize, len: usize) -> Result<(), DexError> {
        if offset + len > self.bytes.len() {
            return Err(DexError::OutOfRange { offset, len: self.bytes.len() });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, DexError> {
        self.check(self.pos, 1)?;
        let v = self.bytes[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn read_u16(&mut self) -> Result<u16, DexError> {
        self.check(self.pos, 2)?;
        let v = ((self.bytes[self.pos + 1] as u16) << 8) | (self.bytes[self.pos] as u16);
        self.pos += 2;
        Ok(v)
    }

    pub fn read_u32(&mut self) -> Result<u32, DexError> {
        self.check(self.pos, 4)?;
        let b = &self.bytes[self.pos..self.pos + 4];
        let v = ((b[3] as u32) << 24) | ((b[2] as u32) << 16) | ((b[1] as u32) << 8) | (b[0] as u32);
        self.pos += 4;
        Ok(v)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DexError> {
        self.check(self.pos, len)?;
        let v = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(v)
    }

    /// Read `len` bytes as an ASCII string (used for the header magic).
    pub fn read_ascii(&mut self, len: usize) -> Result<String, DexError> {
        let raw = self.read_bytes(len)?;
        Ok(raw.iter().map(|&b| b as char).collect())
    }

    /// Read raw bytes up to (not including) the next NUL and consume the NUL.
    /// This is the payload of a `string_data_item`; the caller decides how
    /// to decode it (MUTF-8 for DEX).
    pub fn read_bytes_nul(&mut self) -> Result<&'a [u8], DexError> {
        let mut end = self.pos;
        while end < self.bytes.len() && self.bytes[end] != 0 {
            end += 1;
        }
        if end == self.bytes.len() {
            return Err(DexError::OutOfRange { offset: end, len: self.bytes.len() });
        }
        let v = &self.bytes[self.pos..end];
        self.pos = end + 1;
        Ok(v)
    }

    pub fn read_uleb128(&mut self) -> Result<u32, DexError> {
        let (v, c) = decode_uleb128(self.bytes, self.pos)?;
        self.pos += c;
        Ok(v)
    }

    pub fn read_sleb128(&mut self) -> Result<i32, DexError> {
        let (v, c) = decode_sleb128(self.bytes, self.pos)?;
        self.pos += c;
        Ok(v)
    }

    pub fn read_uleb128p1(&mut self) -> Result<i32, DexError> {
        let (v, c) = decode_uleb128p1(self.bytes, self.pos)?;
        self.pos += c;
        Ok(v)
    }

    // Position-preserving reads at an absolute offset.

    pub fn u32_at(&self, offset: usize) -> Result<u32, DexError> {
        self.check(offset, 4)?;
        let b = &self.bytes[offset..offset + 4];
        Ok(((b[3] as u32) << 24) | ((b[2] as u32) << 16) | ((b[1] as u32) << 8) | (b[0] as u32))
    }

    pub fn bytes_at(&self, offset: usize, len: usize) -> Result<&'a [u8], DexError> {
        self.check(offset, len)?;
        Ok(&self.bytes[offset..offset + len])
    }

    pub fn utf8_at(&self, offset: usize, len: usize) -> Result<String, DexError> {
        let raw = self.bytes_at(offset, len)?;
        Ok(String::from_utf8_lossy(raw).into_owned())
    }
}
