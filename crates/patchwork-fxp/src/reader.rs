//! Bounds-checked cursor over a preset buffer.

use zerocopy::FromBytes;

use crate::{Error, Result};

/// A cursor that reads fixed-size regions from a byte slice without copying.
///
/// Every read names the field it is reading, so a short buffer reports which
/// part of the layout was cut off.
#[derive(Debug, Clone)]
pub(crate) struct BinaryReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BinaryReader<'a> {
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    #[cfg(test)]
    pub const fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Everything after the cursor.
    #[inline]
    pub fn remaining_bytes(&self) -> &'a [u8] {
        &self.data[self.position.min(self.data.len())..]
    }

    /// Read `count` bytes and advance.
    pub fn read_bytes(&mut self, count: usize, field: &'static str) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(Error::format(
                field,
                format!(
                    "needs {} bytes at offset {}, only {} available",
                    count,
                    self.position,
                    self.remaining()
                ),
            ));
        }
        let bytes = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }

    /// Read a fixed-layout struct.
    pub fn read_struct<T: FromBytes>(&mut self, field: &'static str) -> Result<T> {
        let size = std::mem::size_of::<T>();
        let bytes = self.read_bytes(size, field)?;
        T::read_from_bytes(bytes).map_err(|_| Error::format(field, format!("cannot decode {} bytes", size)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bytes_advances() {
        let data = [1u8, 2, 3, 4, 5];
        let mut reader = BinaryReader::new(&data);

        assert_eq!(reader.read_bytes(2, "a").unwrap(), &[1, 2]);
        assert_eq!(reader.position(), 2);
        assert_eq!(reader.remaining(), 3);
        assert_eq!(reader.remaining_bytes(), &[3, 4, 5]);
    }

    #[test]
    fn test_short_read_names_field() {
        let data = [0u8; 3];
        let mut reader = BinaryReader::new(&data);

        match reader.read_struct::<[u8; 4]>("magic") {
            Err(Error::Format { field, reason }) => {
                assert_eq!(field, "magic");
                assert!(reason.contains("needs 4 bytes"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(reader.position(), 0);
    }
}
