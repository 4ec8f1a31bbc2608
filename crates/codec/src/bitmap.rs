//! Nullable-field presence bitmap.

use hyproto_buffers::{Reader, Writer};

use crate::error::{ProtocolError, ReadContext};

/// Presence flags for a record's nullable fields, bit `i` living in byte
/// `i / 8` at mask `1 << (i % 8)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NullableBitmap {
    bytes: Vec<u8>,
}

impl NullableBitmap {
    /// Bytes needed to hold `nullable_count` flags.
    pub const fn byte_len(nullable_count: usize) -> usize {
        nullable_count.div_ceil(8)
    }

    /// An all-absent bitmap occupying `byte_len` bytes.
    pub fn zeroed(byte_len: usize) -> Self {
        Self {
            bytes: vec![0; byte_len],
        }
    }

    /// Reads `byte_len` bitmap bytes starting at `position`.
    pub fn read(
        reader: &Reader<'_>,
        position: usize,
        byte_len: usize,
        record: &str,
    ) -> Result<Self, ProtocolError> {
        let bytes = reader.bytes_at(position, byte_len).field(record)?;
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    pub fn write(&self, writer: &mut Writer) {
        writer.buf(&self.bytes);
    }

    pub fn set(&mut self, bit: usize) {
        if let Some(byte) = self.bytes.get_mut(bit / 8) {
            *byte |= 1 << (bit % 8);
        }
    }

    pub fn is_set(&self, bit: usize) -> bool {
        self.bytes
            .get(bit / 8)
            .is_some_and(|byte| byte & (1 << (bit % 8)) != 0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
