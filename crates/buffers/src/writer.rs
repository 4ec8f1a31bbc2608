//! Binary buffer writer with auto-growing capacity.

use crate::BufferError;

/// A binary buffer writer that grows automatically as needed.
///
/// Positions returned by [`Writer::position`] are relative to the last
/// [`Writer::flush`], so they stay valid when the buffer is reallocated.
/// That makes it safe to reserve a slot, keep writing, and patch the slot
/// afterwards with [`Writer::set_i32_le`].
///
/// # Example
///
/// ```
/// use hyproto_buffers::Writer;
///
/// let mut writer = Writer::new();
/// let slot = writer.position();
/// writer.i32_le(0);
/// writer.u8(0x07);
/// writer.set_i32_le(slot, -1).unwrap();
/// assert_eq!(writer.flush(), [0xff, 0xff, 0xff, 0xff, 0x07]);
/// ```
pub struct Writer {
    /// The underlying byte buffer.
    pub uint8: Vec<u8>,
    /// Position where last flush happened.
    pub x0: usize,
    /// Current cursor position.
    pub x: usize,
    /// Allocation size when buffer needs to grow.
    alloc_size: usize,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    /// Creates a new writer with default allocation size (4KB).
    pub fn new() -> Self {
        Self::with_alloc_size(4 * 1024)
    }

    /// Creates a new writer with custom allocation size.
    pub fn with_alloc_size(alloc_size: usize) -> Self {
        let alloc_size = alloc_size.max(1);
        Self {
            uint8: vec![0u8; alloc_size],
            x0: 0,
            x: 0,
            alloc_size,
        }
    }

    /// Creates a writer sized for exactly `capacity` bytes, e.g. from a
    /// precomputed encoded size.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_alloc_size(capacity)
    }

    /// Ensures the buffer has at least `capacity` bytes available.
    pub fn ensure_capacity(&mut self, capacity: usize) {
        let remaining = self.uint8.len() - self.x;
        if remaining < capacity {
            let total = self.uint8.len() - self.x0;
            let required = capacity - remaining;
            let total_required = total + required;
            let new_size = if total_required <= self.alloc_size {
                self.alloc_size
            } else {
                total_required * 2
            };
            self.grow(new_size);
        }
    }

    fn grow(&mut self, new_size: usize) {
        let x0 = self.x0;
        let x = self.x;
        let mut new_buf = vec![0u8; new_size];
        new_buf[..x - x0].copy_from_slice(&self.uint8[x0..x]);
        self.uint8 = new_buf;
        self.x = x - x0;
        self.x0 = 0;
    }

    /// Current write position relative to the last flush.
    #[inline]
    pub fn position(&self) -> usize {
        self.x - self.x0
    }

    /// Bytes written since the last flush.
    pub fn as_slice(&self) -> &[u8] {
        &self.uint8[self.x0..self.x]
    }

    /// Returns the written data and advances the flush position.
    pub fn flush(&mut self) -> Vec<u8> {
        let result = self.uint8[self.x0..self.x].to_vec();
        self.x0 = self.x;
        result
    }

    /// Writes an unsigned 8-bit integer.
    #[inline]
    pub fn u8(&mut self, val: u8) {
        self.ensure_capacity(1);
        self.uint8[self.x] = val;
        self.x += 1;
    }

    /// Writes a signed 8-bit integer.
    #[inline]
    pub fn i8(&mut self, val: i8) {
        self.u8(val as u8);
    }

    /// Writes a boolean as a single `0`/`1` byte.
    #[inline]
    pub fn bool(&mut self, val: bool) {
        self.u8(val as u8);
    }

    /// Writes a signed 16-bit integer (little-endian).
    #[inline]
    pub fn i16_le(&mut self, val: i16) {
        self.buf(&val.to_le_bytes());
    }

    /// Writes a signed 32-bit integer (little-endian).
    #[inline]
    pub fn i32_le(&mut self, val: i32) {
        self.buf(&val.to_le_bytes());
    }

    /// Writes a signed 64-bit integer (little-endian).
    #[inline]
    pub fn i64_le(&mut self, val: i64) {
        self.buf(&val.to_le_bytes());
    }

    /// Writes a 32-bit float (little-endian).
    #[inline]
    pub fn f32_le(&mut self, val: f32) {
        self.buf(&val.to_le_bytes());
    }

    /// Writes a 64-bit float (little-endian).
    #[inline]
    pub fn f64_le(&mut self, val: f64) {
        self.buf(&val.to_le_bytes());
    }

    /// Writes a UUID as two big-endian 64-bit halves, most-significant first.
    pub fn uuid(&mut self, val: u128) {
        self.buf(&val.to_be_bytes());
    }

    /// Writes raw bytes.
    pub fn buf(&mut self, data: &[u8]) {
        let length = data.len();
        self.ensure_capacity(length);
        self.uint8[self.x..self.x + length].copy_from_slice(data);
        self.x += length;
    }

    /// Writes `count` zero bytes.
    pub fn zeros(&mut self, count: usize) {
        self.ensure_capacity(count);
        self.uint8[self.x..self.x + count].fill(0);
        self.x += count;
    }

    /// Discards everything written after `position` (relative to the last
    /// flush). Positions past the current cursor are ignored.
    pub fn rewind(&mut self, position: usize) {
        if position <= self.position() {
            self.x = self.x0 + position;
        }
    }

    /// Overwrites four already-written bytes at `position` (relative to the
    /// last flush) with a little-endian `i32`.
    pub fn set_i32_le(&mut self, position: usize, val: i32) -> Result<(), BufferError> {
        let written = self.position();
        match position.checked_add(4) {
            Some(end) if end <= written => {
                let start = self.x0 + position;
                self.uint8[start..start + 4].copy_from_slice(&val.to_le_bytes());
                Ok(())
            }
            _ => Err(BufferError::PatchOutOfBounds {
                position,
                length: 4,
                written,
            }),
        }
    }
}
