//! Binary serialization trait for fixed-size records.
//!
//! Headers and other fixed-size records implement `BinarySerializable` so
//! generic code (and tests) can size, write and read them uniformly. Records
//! whose layout depends on a version or a vertex format keep their own
//! `read`/`write` functions instead.

use std::io::{Read, Write};

use crate::error::Result;

/// Trait for fixed-size binary records.
pub trait BinarySerializable: Sized {
    /// Size of the serialized record in bytes.
    const SIZE: usize;

    /// Write the record to a stream.
    fn write_to<W: Write>(&self, w: &mut W) -> Result<()>;

    /// Read the record from a stream.
    ///
    /// A stream that ends early yields [`FormatError::Truncated`](crate::FormatError::Truncated).
    fn read_from<R: Read>(r: &mut R) -> Result<Self>;

    /// Serialize to an owned buffer.
    fn serialize(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Deserialize from the start of a byte slice.
    fn deserialize(mut bytes: &[u8]) -> Result<Self> {
        Self::read_from(&mut bytes)
    }
}
