//! Bounds-checked reader over a byte slice with a written extent.

use crate::BufferError;

/// A read-only view over a byte slice.
///
/// The reader carries no cursor: every read takes an absolute position, so
/// the same reader can be shared by any number of speculative walks. Reads
/// are bounded by `extent`, the number of bytes that hold real data, which
/// may be smaller than the slice itself (e.g. a pooled buffer that was only
/// partially filled).
///
/// # Example
///
/// ```
/// use hyproto_buffers::Reader;
///
/// let data = [0x01, 0x02, 0x03, 0x04, 0xff];
/// let reader = Reader::with_extent(&data, 4).unwrap();
///
/// assert_eq!(reader.i32_le_at(0).unwrap(), 0x0403_0201);
/// assert!(reader.u8_at(4).is_err());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Reader<'a> {
    /// The underlying byte slice.
    pub uint8: &'a [u8],
    /// Number of populated bytes (exclusive end for every read).
    pub extent: usize,
}

impl<'a> Reader<'a> {
    /// Creates a reader whose written extent is the whole slice.
    pub fn new(uint8: &'a [u8]) -> Self {
        Self {
            uint8,
            extent: uint8.len(),
        }
    }

    /// Creates a reader that treats only the first `extent` bytes as data.
    pub fn with_extent(uint8: &'a [u8], extent: usize) -> Result<Self, BufferError> {
        if extent > uint8.len() {
            return Err(BufferError::ExtentTooLarge {
                extent,
                len: uint8.len(),
            });
        }
        Ok(Self { uint8, extent })
    }

    /// Returns the written extent.
    pub fn extent(&self) -> usize {
        self.extent
    }

    /// Returns how many populated bytes remain from `position` onward.
    pub fn remaining(&self, position: usize) -> usize {
        self.extent.saturating_sub(position)
    }

    /// Checks that `length` bytes starting at `position` are populated and
    /// returns the exclusive end position.
    pub fn check(&self, position: usize, length: usize) -> Result<usize, BufferError> {
        match position.checked_add(length) {
            Some(end) if end <= self.extent => Ok(end),
            _ => Err(BufferError::OutOfBounds {
                position,
                length,
                extent: self.extent,
            }),
        }
    }

    #[inline]
    fn array_at<const N: usize>(&self, position: usize) -> Result<[u8; N], BufferError> {
        let end = self.check(position, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.uint8[position..end]);
        Ok(out)
    }

    /// Reads an unsigned 8-bit integer.
    #[inline]
    pub fn u8_at(&self, position: usize) -> Result<u8, BufferError> {
        self.check(position, 1)?;
        Ok(self.uint8[position])
    }

    /// Reads a signed 8-bit integer.
    #[inline]
    pub fn i8_at(&self, position: usize) -> Result<i8, BufferError> {
        Ok(self.u8_at(position)? as i8)
    }

    /// Reads a boolean byte; any non-zero value is `true`.
    #[inline]
    pub fn bool_at(&self, position: usize) -> Result<bool, BufferError> {
        Ok(self.u8_at(position)? != 0)
    }

    /// Reads a signed 16-bit integer (little-endian).
    #[inline]
    pub fn i16_le_at(&self, position: usize) -> Result<i16, BufferError> {
        Ok(i16::from_le_bytes(self.array_at(position)?))
    }

    /// Reads a signed 32-bit integer (little-endian).
    #[inline]
    pub fn i32_le_at(&self, position: usize) -> Result<i32, BufferError> {
        Ok(i32::from_le_bytes(self.array_at(position)?))
    }

    /// Reads a signed 64-bit integer (little-endian).
    #[inline]
    pub fn i64_le_at(&self, position: usize) -> Result<i64, BufferError> {
        Ok(i64::from_le_bytes(self.array_at(position)?))
    }

    /// Reads a 32-bit float (little-endian).
    #[inline]
    pub fn f32_le_at(&self, position: usize) -> Result<f32, BufferError> {
        Ok(f32::from_le_bytes(self.array_at(position)?))
    }

    /// Reads a 64-bit float (little-endian).
    #[inline]
    pub fn f64_le_at(&self, position: usize) -> Result<f64, BufferError> {
        Ok(f64::from_le_bytes(self.array_at(position)?))
    }

    /// Reads a 128-bit UUID stored as two big-endian 64-bit halves,
    /// most-significant half first.
    pub fn uuid_at(&self, position: usize) -> Result<u128, BufferError> {
        Ok(u128::from_be_bytes(self.array_at(position)?))
    }

    /// Returns `length` raw bytes starting at `position`.
    pub fn bytes_at(&self, position: usize, length: usize) -> Result<&'a [u8], BufferError> {
        let end = self.check(position, length)?;
        Ok(&self.uint8[position..end])
    }
}

impl<'a> From<&'a [u8]> for Reader<'a> {
    fn from(uint8: &'a [u8]) -> Self {
        Reader::new(uint8)
    }
}

impl<'a> From<&'a Vec<u8>> for Reader<'a> {
    fn from(uint8: &'a Vec<u8>) -> Self {
        Reader::new(uint8)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Reader<'a> {
    fn from(uint8: &'a [u8; N]) -> Self {
        Reader::new(uint8)
    }
}
