//! Low-level byte primitives shared by the header parser, the decompressors
//! and every type reader.
//!
//! [`ByteCursor`] reads forward over an in-memory buffer. Each method reads
//! exactly the bytes it promises or returns [`Error::TruncatedInput`] without
//! moving the cursor - there is no partial-read ambiguity. All multi-byte
//! values are little-endian.
//!
//! [`ByteWriter`] is the inverse, used to build headers and compressed
//! payloads.

use crate::{Error, Result};

/// Forward-only little-endian reader over a byte slice.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current byte position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left between the cursor and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Everything from the cursor to the end, without consuming it.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Read a slice of `n` bytes without copying.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read exactly `N` bytes into a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut b = [0u8; N];
        b.copy_from_slice(self.read_bytes(N)?);
        Ok(b)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Read a boolean stored as one byte (any non-zero value is `true`).
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// Read a .NET `Read7BitEncodedInt` value: little-endian groups of 7
    /// bits, high bit set on every byte except the last. At most five bytes.
    pub fn read_7bit_int(&mut self) -> Result<u32> {
        let start = self.pos;
        let mut value: u32 = 0;
        for i in 0..5 {
            let byte = match self.read_u8() {
                Ok(b) => b,
                Err(e) => {
                    self.pos = start;
                    return Err(e);
                }
            };
            value |= ((byte & 0x7F) as u32) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        self.pos = start;
        Err(Error::invalid(start, "7-bit encoded integer longer than 5 bytes"))
    }

    /// Read a length-prefixed UTF-8 string (7-bit encoded byte count).
    pub fn read_string(&mut self) -> Result<String> {
        let start = self.pos;
        let len = self.read_7bit_int()? as usize;
        let bytes = match self.read_bytes(len) {
            Ok(b) => b,
            Err(e) => {
                self.pos = start;
                return Err(e);
            }
        };
        String::from_utf8(bytes.to_vec()).map_err(|_| {
            self.pos = start;
            Error::invalid(start, "string is not valid UTF-8")
        })
    }

    /// Read one UTF-8 encoded character (1 to 4 bytes).
    pub fn read_char(&mut self) -> Result<char> {
        let start = self.pos;
        let lead = *self.rest().first().ok_or(Error::TruncatedInput {
            offset: start,
            need: 1,
            have: 0,
        })?;
        let len = match lead {
            0x00..=0x7F => 1,
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return Err(Error::invalid(start, "invalid UTF-8 lead byte")),
        };
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.chars().next())
            .ok_or_else(|| {
                self.pos = start;
                Error::invalid(start, "invalid UTF-8 character")
            })
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(Error::TruncatedInput {
                offset: self.pos,
                need: n,
                have: self.remaining(),
            });
        }
        Ok(())
    }
}

/// Growable little-endian byte buffer.
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn write_u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn write_bool(&mut self, v: bool) -> &mut Self {
        self.write_u8(v as u8)
    }

    pub fn write_u16(&mut self, v: u16) -> &mut Self {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_i16(&mut self, v: i16) -> &mut Self {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_u32(&mut self, v: u32) -> &mut Self {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_i32(&mut self, v: i32) -> &mut Self {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_u64(&mut self, v: u64) -> &mut Self {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_i64(&mut self, v: i64) -> &mut Self {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_f32(&mut self, v: f32) -> &mut Self {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_f64(&mut self, v: f64) -> &mut Self {
        self.write_bytes(&v.to_le_bytes())
    }

    /// Inverse of [`ByteCursor::read_7bit_int`].
    pub fn write_7bit_int(&mut self, mut v: u32) -> &mut Self {
        while v >= 0x80 {
            self.buf.push((v as u8) | 0x80);
            v >>= 7;
        }
        self.write_u8(v as u8)
    }

    /// Inverse of [`ByteCursor::read_string`].
    pub fn write_string(&mut self, s: &str) -> &mut Self {
        self.write_7bit_int(s.len() as u32);
        self.write_bytes(s.as_bytes())
    }

    pub fn write_char(&mut self, c: char) -> &mut Self {
        let mut tmp = [0u8; 4];
        self.write_bytes(c.encode_utf8(&mut tmp).as_bytes())
    }

    /// Overwrite a `u32` at `pos` (for back-patching sizes).
    pub fn patch_u32(&mut self, pos: usize, v: u32) {
        self.buf[pos..pos + 4].copy_from_slice(&v.to_le_bytes());
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_primitives() {
        let data = [0x2A, 0x00, 0x00, 0x00, 0x34, 0x12, 0x00, 0x00, 0x80, 0x3F];
        let mut c = ByteCursor::new(&data);
        assert_eq!(c.read_i32().unwrap(), 42);
        assert_eq!(c.read_u16().unwrap(), 0x1234);
        assert_eq!(c.read_f32().unwrap(), 1.0);
        assert!(c.is_empty());
    }

    #[test]
    fn truncated_read_reports_context_and_keeps_position() {
        let data = [1, 2, 3];
        let mut c = ByteCursor::new(&data);
        c.read_u8().unwrap();
        match c.read_u32() {
            Err(Error::TruncatedInput { offset, need, have }) => {
                assert_eq!((offset, need, have), (1, 4, 2));
            }
            other => panic!("expected TruncatedInput, got {other:?}"),
        }
        assert_eq!(c.position(), 1);
        assert_eq!(c.remaining(), 2);
    }

    #[test]
    fn seven_bit_int_multi_byte() {
        let mut w = ByteWriter::new();
        w.write_7bit_int(300).write_7bit_int(0).write_7bit_int(u32::MAX);
        let bytes = w.into_bytes();
        assert_eq!(&bytes[..2], &[0xAC, 0x02]);
        let mut c = ByteCursor::new(&bytes);
        assert_eq!(c.read_7bit_int().unwrap(), 300);
        assert_eq!(c.read_7bit_int().unwrap(), 0);
        assert_eq!(c.read_7bit_int().unwrap(), u32::MAX);
    }

    #[test]
    fn seven_bit_int_too_long() {
        let data = [0xFF; 6];
        let mut c = ByteCursor::new(&data);
        assert!(matches!(c.read_7bit_int(), Err(Error::InvalidData { .. })));
    }

    #[test]
    fn length_prefixed_string() {
        let mut w = ByteWriter::new();
        w.write_string("Texture2DReader").write_string("");
        let bytes = w.into_bytes();
        let mut c = ByteCursor::new(&bytes);
        assert_eq!(c.read_string().unwrap(), "Texture2DReader");
        assert_eq!(c.read_string().unwrap(), "");
    }

    #[test]
    fn string_longer_than_buffer() {
        let data = [5, b'a', b'b'];
        let mut c = ByteCursor::new(&data);
        assert!(matches!(c.read_string(), Err(Error::TruncatedInput { .. })));
        assert_eq!(c.position(), 0);
    }

    #[test]
    fn invalid_utf8_string_keeps_position() {
        let data = [1, 2, 0xFF, 0xFE];
        let mut c = ByteCursor::new(&data);
        c.read_u8().unwrap();
        assert!(matches!(c.read_string(), Err(Error::InvalidData { offset: 1, .. })));
        assert_eq!(c.position(), 1);
    }

    #[test]
    fn utf8_chars() {
        let mut w = ByteWriter::new();
        w.write_char('A').write_char('é').write_char('€');
        let bytes = w.into_bytes();
        let mut c = ByteCursor::new(&bytes);
        assert_eq!(c.read_char().unwrap(), 'A');
        assert_eq!(c.read_char().unwrap(), 'é');
        assert_eq!(c.read_char().unwrap(), '€');
    }
}
