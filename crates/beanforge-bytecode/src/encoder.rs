//! Byte-level buffers behind the class file format
//!
//! Numbers are little-endian, strings carry a `u32` byte length. Lengths of
//! sections not known up front are written through a reserved slot that is
//! filled in once the section is done.

use thiserror::Error;

/// Malformed class file input
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    /// Input ended in the middle of a value
    #[error("Unexpected end of class file at offset {0}")]
    UnexpectedEnd(usize),

    #[error("Invalid UTF-8 string at offset {0}")]
    InvalidUtf8(usize),

    /// Tag byte that names no known node
    #[error("Invalid tag {0} at offset {1}")]
    InvalidTag(u8, usize),
}

/// Growable output of one class file
#[derive(Debug, Default)]
pub struct ClassBuffer {
    pub(crate) bytes: Vec<u8>,
}

macro_rules! put_number {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            #[doc = concat!("Appends a little-endian `", stringify!($ty), "`")]
            pub fn $name(&mut self, value: $ty) {
                self.bytes.extend_from_slice(&value.to_le_bytes());
            }
        )*
    };
}

impl ClassBuffer {
    /// Empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty buffer sized for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Bytes written so far
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Finished output
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Number of bytes written, also the offset of the next one
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[allow(missing_docs)]
    pub fn put_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    put_number!(put_u16: u16, put_u32: u32, put_i32: i32, put_i64: i64, put_f64: f64);

    /// Raw bytes, no length prefix
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Length-prefixed UTF-8
    pub fn put_str(&mut self, value: &str) {
        self.put_u32(value.len() as u32);
        self.put_bytes(value.as_bytes());
    }

    /// Placeholder `u32` to be set later with [`ClassBuffer::fill_slot`]
    pub fn reserve_slot(&mut self) -> usize {
        let at = self.len();
        self.put_u32(0);
        at
    }

    /// Overwrites the slot reserved at `at`
    pub fn fill_slot(&mut self, at: usize, value: u32) {
        self.bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }
}

/// Reading position in an encoded class file
pub struct ClassCursor<'a> {
    bytes: &'a [u8],
    position: usize,
}

macro_rules! next_number {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            #[doc = concat!("Takes a little-endian `", stringify!($ty), "`")]
            pub fn $name(&mut self) -> Result<$ty, DecodeError> {
                Ok(<$ty>::from_le_bytes(self.fixed()?))
            }
        )*
    };
}

impl<'a> ClassCursor<'a> {
    /// Cursor at the start of `bytes`
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    /// Offset of the next byte to read
    pub fn position(&self) -> usize {
        self.position
    }

    #[allow(missing_docs)]
    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.position)
    }

    #[allow(missing_docs)]
    pub fn at_end(&self) -> bool {
        self.remaining() == 0
    }

    /// Moves to an absolute offset, bounds are checked on the next read
    pub fn jump_to(&mut self, position: usize) {
        self.position = position;
    }

    fn slice(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .position
            .checked_add(count)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(DecodeError::UnexpectedEnd(self.position))?;
        let slice = &self.bytes[self.position..end];
        self.position = end;
        Ok(slice)
    }

    fn fixed<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.slice(N)?);
        Ok(out)
    }

    #[allow(missing_docs)]
    pub fn next_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.slice(1)?[0])
    }

    next_number!(next_u16: u16, next_u32: u32, next_i32: i32, next_i64: i64, next_f64: f64);

    /// `count` raw bytes
    pub fn next_bytes(&mut self, count: usize) -> Result<Vec<u8>, DecodeError> {
        Ok(self.slice(count)?.to_vec())
    }

    /// Length-prefixed UTF-8
    pub fn next_str(&mut self) -> Result<String, DecodeError> {
        let len = self.next_u32()? as usize;
        let start = self.position;
        String::from_utf8(self.next_bytes(len)?).map_err(|_| DecodeError::InvalidUtf8(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_are_little_endian() {
        let mut out = ClassBuffer::new();
        out.put_u8(0x42);
        out.put_u16(0x1234);
        out.put_u32(0xABCD_EF01);
        assert_eq!(out.as_bytes(), &[0x42, 0x34, 0x12, 0x01, 0xEF, 0xCD, 0xAB]);
    }

    #[test]
    fn test_cursor_reads_what_was_put() {
        let mut out = ClassBuffer::new();
        out.put_u8(7);
        out.put_i32(-42);
        out.put_i64(-1);
        out.put_f64(2.5);
        out.put_str("dispatch");

        let mut cursor = ClassCursor::new(out.as_bytes());
        assert_eq!(cursor.next_u8().unwrap(), 7);
        assert_eq!(cursor.next_i32().unwrap(), -42);
        assert_eq!(cursor.next_i64().unwrap(), -1);
        assert_eq!(cursor.next_f64().unwrap(), 2.5);
        assert_eq!(cursor.next_str().unwrap(), "dispatch");
        assert!(cursor.at_end());
    }

    #[test]
    fn test_truncated_input() {
        let bytes = [0x01, 0x02];
        let mut cursor = ClassCursor::new(&bytes);
        assert_eq!(cursor.next_u8().unwrap(), 0x01);
        assert_eq!(cursor.next_u16(), Err(DecodeError::UnexpectedEnd(1)));
        assert_eq!(cursor.remaining(), 1);
        assert_eq!(cursor.next_bytes(usize::MAX), Err(DecodeError::UnexpectedEnd(1)));
    }

    #[test]
    fn test_reserved_slot() {
        let mut out = ClassBuffer::new();
        out.put_u8(1);
        let slot = out.reserve_slot();
        out.put_u8(2);
        out.fill_slot(slot, 99);

        let mut cursor = ClassCursor::new(out.as_bytes());
        cursor.jump_to(slot);
        assert_eq!(cursor.next_u32().unwrap(), 99);
        assert_eq!(cursor.next_u8().unwrap(), 2);
    }

    #[test]
    fn test_invalid_utf8() {
        let mut out = ClassBuffer::new();
        out.put_u32(2);
        out.put_bytes(&[0xff, 0xfe]);
        let mut cursor = ClassCursor::new(out.as_bytes());
        assert_eq!(cursor.next_str(), Err(DecodeError::InvalidUtf8(4)));
    }
}
