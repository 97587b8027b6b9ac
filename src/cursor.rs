//! # Byte Cursor
//!
//! Sequential, bounds-checked reader over an immutable byte buffer. Every
//! read advances the offset by exactly the requested width or fails with
//! [`DecodeError::TruncatedInput`] without moving; nothing is ever
//! zero-padded or silently shortened.
//!
//! All multi-byte integers and floats in both vendor formats are
//! big-endian, so only big-endian accessors are provided.
//!
//! [`ByteWriter`] is the write-side counterpart used by the encoders.

use crate::error::{DecodeError, DecodeResult};

/// Read cursor over a borrowed buffer.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    /// Current read offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Bytes left between the offset and the end of the buffer.
    pub fn remaining_len(&self) -> usize {
        self.buf.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining_len() == 0
    }

    /// Borrow the next `width` bytes and advance past them.
    pub fn read_fixed(&mut self, width: usize) -> DecodeResult<&'a [u8]> {
        let remaining = self.remaining_len();
        if width > remaining {
            return Err(DecodeError::TruncatedInput {
                offset: self.offset,
                wanted: width,
                remaining,
            });
        }
        let start = self.offset;
        self.offset += width;
        Ok(&self.buf[start..self.offset])
    }

    /// Read exactly `N` bytes into an owned array.
    pub fn read_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let bytes = self.read_fixed(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Read a big-endian unsigned integer of 1 to 8 bytes.
    pub fn read_uint_be(&mut self, width: usize) -> DecodeResult<u64> {
        if !(1..=8).contains(&width) {
            return Err(self.unsupported("integer", width));
        }
        let bytes = self.read_fixed(width)?;
        Ok(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    /// Read a big-endian float; `width` must be 4 or 8.
    pub fn read_float_be(&mut self, width: usize) -> DecodeResult<f64> {
        match width {
            4 => Ok(f64::from(self.read_f32()?)),
            8 => self.read_f64(),
            _ => Err(self.unsupported("float", width)),
        }
    }

    fn unsupported(&self, kind: &'static str, width: usize) -> DecodeError {
        DecodeError::UnsupportedWidth {
            kind,
            offset: self.offset,
            width,
        }
    }

    /// Read a fixed-width text field, dropping trailing NUL and space padding.
    pub fn read_fixed_text(&mut self, width: usize) -> DecodeResult<String> {
        let bytes = self.read_fixed(width)?;
        Ok(trim_padding(bytes))
    }

    /// Read a length byte followed by a fixed-width text field.
    ///
    /// The text is cut to the declared length (clamped to `width`) and
    /// then stripped of trailing padding.
    pub fn read_counted_text(&mut self, width: usize) -> DecodeResult<String> {
        let declared = usize::from(self.read_u8()?);
        let bytes = self.read_fixed(width)?;
        Ok(trim_padding(&bytes[..declared.min(width)]))
    }

    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u32(&mut self) -> DecodeResult<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> DecodeResult<u64> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> DecodeResult<i16> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> DecodeResult<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> DecodeResult<f32> {
        Ok(f32::from_be_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> DecodeResult<f64> {
        Ok(f64::from_be_bytes(self.read_array()?))
    }
}

fn trim_padding(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(|c: char| c == '\0' || c == ' ')
        .to_string()
}

/// Append-only big-endian writer, the inverse of [`ByteCursor`].
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.write_bytes(&value.to_be_bytes());
    }

    /// Write `text` into a `width`-byte field, NUL padded, truncating if longer.
    pub fn write_fixed_text(&mut self, text: &str, width: usize) {
        let bytes = text.as_bytes();
        let used = bytes.len().min(width);
        self.write_bytes(&bytes[..used]);
        self.buf.resize(self.buf.len() + (width - used), 0);
    }

    /// Write a length byte followed by a NUL padded `width`-byte text field.
    pub fn write_counted_text(&mut self, text: &str, width: usize) {
        let limit = text.len().min(width).min(usize::from(u8::MAX));
        let used = floor_char_boundary(text, limit);
        self.write_u8(used as u8);
        self.write_fixed_text(&text[..used], width);
    }
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    (0..=index)
        .rev()
        .find(|&i| text.is_char_boundary(i))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_advance_offset() {
        let data = [0x00u8, 0x01, 0x02, 0x03, 0xff, 0xfe];
        let mut cursor = ByteCursor::new(&data);

        assert_eq!(cursor.read_uint_be(2).unwrap(), 0x0001);
        assert_eq!(cursor.position(), 2);
        assert_eq!(cursor.read_fixed(2).unwrap(), &[0x02, 0x03]);
        assert_eq!(cursor.read_i16().unwrap(), -2);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_read_past_end_is_truncated_and_does_not_advance() {
        let data = [1u8, 2, 3];
        let mut cursor = ByteCursor::new(&data);
        cursor.read_u8().unwrap();

        let err = cursor.read_u32().unwrap_err();
        assert_eq!(
            err,
            DecodeError::TruncatedInput {
                offset: 1,
                wanted: 4,
                remaining: 2,
            }
        );
        assert_eq!(cursor.position(), 1);
        assert_eq!(cursor.remaining_len(), 2);
    }

    #[test]
    fn test_big_endian_floats() {
        let mut data = Vec::new();
        data.extend_from_slice(&55.5f32.to_be_bytes());
        data.extend_from_slice(&(-1.25f64).to_be_bytes());
        let mut cursor = ByteCursor::new(&data);

        assert_eq!(cursor.read_float_be(4).unwrap(), 55.5);
        assert_eq!(cursor.read_float_be(8).unwrap(), -1.25);
    }

    #[test]
    fn test_unsupported_widths_are_rejected() {
        let data = [0u8; 16];
        let mut cursor = ByteCursor::new(&data);

        assert_eq!(
            cursor.read_uint_be(9).unwrap_err(),
            DecodeError::UnsupportedWidth {
                kind: "integer",
                offset: 0,
                width: 9,
            }
        );
        assert!(cursor.read_uint_be(0).is_err());
        assert_eq!(
            cursor.read_float_be(3).unwrap_err(),
            DecodeError::UnsupportedWidth {
                kind: "float",
                offset: 0,
                width: 3,
            }
        );
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.read_uint_be(8).unwrap(), 0);
    }

    #[test]
    fn test_fixed_text_strips_padding() {
        let data = b"LxT1\0\0  ";
        let mut cursor = ByteCursor::new(data);
        assert_eq!(cursor.read_fixed_text(8).unwrap(), "LxT1");
    }

    #[test]
    fn test_counted_text_respects_declared_length() {
        let data = [3u8, b'a', b'b', b'c', b'x', b'y'];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_counted_text(5).unwrap(), "abc");
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_writer_counted_text_matches_reader() {
        let mut writer = ByteWriter::new();
        writer.write_counted_text("SoundTrack", 12);
        assert_eq!(writer.len(), 13);

        let bytes = writer.into_bytes();
        let mut cursor = ByteCursor::new(&bytes);
        assert_eq!(cursor.read_counted_text(12).unwrap(), "SoundTrack");
    }
}
