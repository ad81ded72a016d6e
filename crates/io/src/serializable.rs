//! The [`Serializable`] trait and array helpers.

use crate::{BinaryWriter, IoResult, MemoryReader};

/// A value with a canonical little-endian binary form.
pub trait Serializable {
    /// Exact size of the serialized form in bytes.
    fn size(&self) -> usize;

    /// Writes the value to `writer`.
    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()>;

    /// Reads a value from `reader`.
    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self>
    where
        Self: Sized;
}

/// Whole-buffer conveniences for any [`Serializable`] type.
pub trait SerializableExt: Serializable {
    /// Serializes into a fresh byte vector.
    fn to_array(&self) -> IoResult<Vec<u8>> {
        let mut writer = BinaryWriter::with_capacity(self.size());
        self.serialize(&mut writer)?;
        Ok(writer.into_bytes())
    }

    /// Deserializes from a byte slice.
    fn from_array(data: &[u8]) -> IoResult<Self>
    where
        Self: Sized,
    {
        let mut reader = MemoryReader::new(data);
        Self::deserialize(&mut reader)
    }
}

impl<T: Serializable> SerializableExt for T {}

/// Length-prefixed collection helpers.
pub mod helper {
    use super::Serializable;
    use crate::{BinaryWriter, IoResult, MemoryReader};

    /// Serialized size of a var-int holding `value`.
    pub fn var_size(value: u64) -> usize {
        match value {
            0..=0xfc => 1,
            0xfd..=0xffff => 3,
            0x1_0000..=0xffff_ffff => 5,
            _ => 9,
        }
    }

    /// Serialized size of a var-int-prefixed byte string.
    pub fn var_bytes_size(bytes: &[u8]) -> usize {
        var_size(bytes.len() as u64) + bytes.len()
    }

    /// Writes `items` with a var-int count prefix.
    pub fn serialize_array<T: Serializable>(
        items: &[T],
        writer: &mut BinaryWriter,
    ) -> IoResult<()> {
        writer.write_var_int(items.len() as u64)?;
        for item in items {
            item.serialize(writer)?;
        }
        Ok(())
    }

    /// Reads a var-int-counted collection, capped at `max` entries.
    pub fn deserialize_array<T: Serializable>(
        reader: &mut MemoryReader<'_>,
        max: usize,
    ) -> IoResult<Vec<T>> {
        let count = reader.read_var_int(max as u64)? as usize;
        let mut items = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            items.push(T::deserialize(reader)?);
        }
        Ok(items)
    }

    /// Serialized size of a counted collection.
    pub fn array_size<T: Serializable>(items: &[T]) -> usize {
        var_size(items.len() as u64) + items.iter().map(Serializable::size).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Sample(u32);

    impl Serializable for Sample {
        fn size(&self) -> usize {
            4
        }

        fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
            writer.write_u32(self.0)
        }

        fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
            Ok(Sample(reader.read_u32()?))
        }
    }

    #[test]
    fn round_trips_through_arrays() {
        let original = Sample(0xdead_beef);
        let bytes = original.to_array().unwrap();
        assert_eq!(bytes.len(), original.size());
        assert_eq!(Sample::from_array(&bytes).unwrap(), original);
    }

    #[test]
    fn counted_collections() {
        let items = vec![Sample(1), Sample(2), Sample(3)];
        let mut writer = BinaryWriter::new();
        helper::serialize_array(&items, &mut writer).unwrap();
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), helper::array_size(&items));

        let mut reader = MemoryReader::new(&bytes);
        let decoded: Vec<Sample> = helper::deserialize_array(&mut reader, 16).unwrap();
        assert_eq!(decoded, items);
    }

    #[test]
    fn var_size_matches_writer() {
        for value in [0u64, 0xfc, 0xfd, 0xffff, 0x1_0000, 0xffff_ffff, u64::MAX] {
            let mut writer = BinaryWriter::new();
            writer.write_var_int(value).unwrap();
            assert_eq!(writer.len(), helper::var_size(value));
        }
    }
}
