//! Bounds-checked reader over an in-memory byte slice.

use crate::error::{IoError, IoResult};

/// A cursor over borrowed bytes. Every read is bounds-checked and
/// advances the position; nothing is copied until a `Vec` is requested.
pub struct MemoryReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> MemoryReader<'a> {
    /// Creates a reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current position in bytes.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether the reader has consumed all input.
    pub fn is_exhausted(&self) -> bool {
        self.pos == self.data.len()
    }

    fn take(&mut self, count: usize) -> IoResult<&'a [u8]> {
        if self.remaining() < count {
            return Err(IoError::EndOfStream {
                needed: count - self.remaining(),
                position: self.pos,
            });
        }
        let slice = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> IoResult<u8> {
        Ok(self.take(1)?[0])
    }

    /// Reads a boolean encoded as 0 or 1.
    pub fn read_bool(&mut self) -> IoResult<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(IoError::invalid_data(
                "boolean",
                format!("unexpected byte 0x{other:02x}"),
            )),
        }
    }

    /// Reads a little-endian `u16`.
    pub fn read_u16(&mut self) -> IoResult<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32(&mut self) -> IoResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a little-endian `u64`.
    pub fn read_u64(&mut self) -> IoResult<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    /// Reads a little-endian `i64`.
    pub fn read_i64(&mut self) -> IoResult<i64> {
        Ok(self.read_u64()? as i64)
    }

    /// Reads a var-int and rejects values above `max`.
    pub fn read_var_int(&mut self, max: u64) -> IoResult<u64> {
        let prefix = self.read_u8()?;
        let value = match prefix {
            0xfd => self.read_u16()? as u64,
            0xfe => self.read_u32()? as u64,
            0xff => self.read_u64()?,
            _ => prefix as u64,
        };
        if value > max {
            return Err(IoError::OutOfRange { value, max });
        }
        Ok(value)
    }

    /// Reads exactly `count` bytes into an owned buffer.
    pub fn read_bytes(&mut self, count: usize) -> IoResult<Vec<u8>> {
        Ok(self.take(count)?.to_vec())
    }

    /// Reads a fixed-size byte array.
    pub fn read_array<const N: usize>(&mut self) -> IoResult<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    /// Reads a var-int length prefix followed by that many bytes.
    pub fn read_var_bytes(&mut self, max: usize) -> IoResult<Vec<u8>> {
        let len = self.read_var_int(max as u64)? as usize;
        self.read_bytes(len)
    }

    /// Reads a var-int-prefixed UTF-8 string.
    pub fn read_var_string(&mut self, max: usize) -> IoResult<String> {
        let bytes = self.read_var_bytes(max)?;
        String::from_utf8(bytes)
            .map_err(|_| IoError::invalid_data("string", "not valid UTF-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_integers() {
        let data = [0x78, 0x56, 0x34, 0x12, 0x2a, 0x00];
        let mut reader = MemoryReader::new(&data);
        assert_eq!(reader.read_u32().unwrap(), 0x1234_5678);
        assert_eq!(reader.read_u16().unwrap(), 0x002a);
        assert!(reader.is_exhausted());
    }

    #[test]
    fn var_int_prefixes() {
        let data = [0x2a];
        assert_eq!(MemoryReader::new(&data).read_var_int(u64::MAX).unwrap(), 42);

        let data = [0xfd, 0x34, 0x12];
        let mut reader = MemoryReader::new(&data);
        assert_eq!(reader.read_var_int(u64::MAX).unwrap(), 0x1234);

        let data = [0xfe, 0x78, 0x56, 0x34, 0x12];
        let mut reader = MemoryReader::new(&data);
        assert_eq!(reader.read_var_int(u64::MAX).unwrap(), 0x1234_5678);

        let data = [0xff, 1, 0, 0, 0, 0, 0, 0, 0x80];
        let mut reader = MemoryReader::new(&data);
        assert_eq!(
            reader.read_var_int(u64::MAX).unwrap(),
            0x8000_0000_0000_0001
        );
    }

    #[test]
    fn var_int_respects_max() {
        let data = [0xfd, 0x34, 0x12];
        let mut reader = MemoryReader::new(&data);
        assert!(matches!(
            reader.read_var_int(0x1233),
            Err(IoError::OutOfRange { .. })
        ));
    }

    #[test]
    fn short_input_is_end_of_stream() {
        let data = [0x01, 0x02];
        let mut reader = MemoryReader::new(&data);
        assert!(matches!(
            reader.read_u32(),
            Err(IoError::EndOfStream { .. })
        ));
    }

    #[test]
    fn rejects_bad_boolean() {
        let mut reader = MemoryReader::new(&[7]);
        assert!(reader.read_bool().is_err());
    }

    #[test]
    fn reads_fixed_arrays() {
        let data = [9u8; 20];
        let mut reader = MemoryReader::new(&data);
        let arr: [u8; 20] = reader.read_array().unwrap();
        assert_eq!(arr, data);
    }
}
