//! Growable little-endian writer.

use crate::error::IoResult;
use crate::serializable::Serializable;
use bytes::{BufMut, BytesMut};

/// Accumulates serialized output in memory.
#[derive(Default)]
pub struct BinaryWriter {
    buffer: BytesMut,
}

impl BinaryWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer with a pre-allocated buffer.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Consumes the writer, returning the serialized bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer.freeze().to_vec()
    }

    /// Writes a single byte.
    pub fn write_u8(&mut self, value: u8) -> IoResult<()> {
        self.buffer.put_u8(value);
        Ok(())
    }

    /// Writes a boolean as 0 or 1.
    pub fn write_bool(&mut self, value: bool) -> IoResult<()> {
        self.write_u8(value as u8)
    }

    /// Writes a little-endian `u16`.
    pub fn write_u16(&mut self, value: u16) -> IoResult<()> {
        self.buffer.put_u16_le(value);
        Ok(())
    }

    /// Writes a little-endian `u32`.
    pub fn write_u32(&mut self, value: u32) -> IoResult<()> {
        self.buffer.put_u32_le(value);
        Ok(())
    }

    /// Writes a little-endian `u64`.
    pub fn write_u64(&mut self, value: u64) -> IoResult<()> {
        self.buffer.put_u64_le(value);
        Ok(())
    }

    /// Writes a little-endian `i64`.
    pub fn write_i64(&mut self, value: i64) -> IoResult<()> {
        self.write_u64(value as u64)
    }

    /// Writes raw bytes without a length prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> IoResult<()> {
        self.buffer.put_slice(bytes);
        Ok(())
    }

    /// Writes a var-int: 1, 3, 5 or 9 bytes depending on magnitude.
    pub fn write_var_int(&mut self, value: u64) -> IoResult<()> {
        match value {
            0..=0xfc => self.write_u8(value as u8),
            0xfd..=0xffff => {
                self.write_u8(0xfd)?;
                self.write_u16(value as u16)
            }
            0x1_0000..=0xffff_ffff => {
                self.write_u8(0xfe)?;
                self.write_u32(value as u32)
            }
            _ => {
                self.write_u8(0xff)?;
                self.write_u64(value)
            }
        }
    }

    /// Writes a var-int length prefix followed by the bytes.
    pub fn write_var_bytes(&mut self, bytes: &[u8]) -> IoResult<()> {
        self.write_var_int(bytes.len() as u64)?;
        self.write_bytes(bytes)
    }

    /// Writes a var-int-prefixed UTF-8 string.
    pub fn write_var_string(&mut self, value: &str) -> IoResult<()> {
        self.write_var_bytes(value.as_bytes())
    }

    /// Writes any [`Serializable`] value in place.
    pub fn write_serializable<T: Serializable>(&mut self, value: &T) -> IoResult<()> {
        value.serialize(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_reader::MemoryReader;

    #[test]
    fn var_int_boundaries() {
        for (value, encoded_len) in [
            (0u64, 1usize),
            (0xfc, 1),
            (0xfd, 3),
            (0xffff, 3),
            (0x1_0000, 5),
            (0xffff_ffff, 5),
            (0x1_0000_0000, 9),
        ] {
            let mut writer = BinaryWriter::new();
            writer.write_var_int(value).unwrap();
            let bytes = writer.into_bytes();
            assert_eq!(bytes.len(), encoded_len, "value {value:#x}");
            let mut reader = MemoryReader::new(&bytes);
            assert_eq!(reader.read_var_int(u64::MAX).unwrap(), value);
        }
    }

    #[test]
    fn var_bytes_round_trip() {
        let payload = vec![1u8, 2, 3, 4, 5];
        let mut writer = BinaryWriter::new();
        writer.write_var_bytes(&payload).unwrap();
        let bytes = writer.into_bytes();
        let mut reader = MemoryReader::new(&bytes);
        assert_eq!(reader.read_var_bytes(1024).unwrap(), payload);
    }

    #[test]
    fn integers_are_little_endian() {
        let mut writer = BinaryWriter::new();
        writer.write_u32(0x1234_5678).unwrap();
        assert_eq!(writer.into_bytes(), vec![0x78, 0x56, 0x34, 0x12]);
    }
}
