//! Binary serialization layer.
//!
//! Everything the consensus context writes to disk or to the wire goes
//! through this crate: a [`Serializable`] trait, a growable
//! [`BinaryWriter`], and a bounds-checked [`MemoryReader`]. All integers
//! are little-endian; collections use the compact var-int prefix.

pub mod binary_writer;
pub mod error;
pub mod memory_reader;
pub mod serializable;

pub use binary_writer::BinaryWriter;
pub use error::{IoError, IoResult};
pub use memory_reader::MemoryReader;
pub use serializable::{helper, Serializable, SerializableExt};
