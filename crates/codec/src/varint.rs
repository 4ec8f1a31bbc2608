//! Unsigned LEB128-style VarInt used for lengths, counts and type tags.
//!
//! Seven payload bits per byte, low group first, high bit set on every byte
//! but the last. At most five bytes; the fifth may only carry the top four
//! bits of a 32-bit value.

use hyproto_buffers::{Reader, Writer};
use thiserror::Error;

/// Longest legal encoding, in bytes.
pub const MAX_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VarIntError {
    #[error("varint at {position} runs past the written extent")]
    Truncated { position: usize },
    #[error("varint at {position} is longer than 5 bytes")]
    TooLong { position: usize },
    #[error("varint at {position} does not fit in 32 bits")]
    Overflow { position: usize },
}

/// Decodes the VarInt at `position`, returning the value reinterpreted as a
/// signed 32-bit integer and the number of bytes it occupies.
///
/// Values of 2^31 and above come back negative, which callers report as a
/// negative length rather than silently accepting.
pub fn read(reader: &Reader<'_>, position: usize) -> Result<(i32, usize), VarIntError> {
    let mut value: u32 = 0;
    for i in 0..MAX_LEN {
        let at = position
            .checked_add(i)
            .ok_or(VarIntError::Truncated { position })?;
        let byte = reader
            .u8_at(at)
            .map_err(|_| VarIntError::Truncated { position })?;
        if i == MAX_LEN - 1 {
            if byte & 0x80 != 0 {
                return Err(VarIntError::TooLong { position });
            }
            if byte & 0x70 != 0 {
                return Err(VarIntError::Overflow { position });
            }
        }
        value |= ((byte & 0x7f) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value as i32, i + 1));
        }
    }
    Err(VarIntError::TooLong { position })
}

/// Returns the decoded value without consuming anything.
pub fn peek(reader: &Reader<'_>, position: usize) -> Result<i32, VarIntError> {
    read(reader, position).map(|(value, _)| value)
}

/// Returns how many bytes the VarInt at `position` occupies.
pub fn length(reader: &Reader<'_>, position: usize) -> Result<usize, VarIntError> {
    read(reader, position).map(|(_, len)| len)
}

/// Appends `value` to the writer.
pub fn write(writer: &mut Writer, mut value: u32) {
    while value >= 0x80 {
        writer.u8((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    writer.u8(value as u8);
}

/// Number of bytes [`write`] emits for `value`.
pub fn size(value: u32) -> usize {
    match value {
        0..=0x7f => 1,
        0x80..=0x3fff => 2,
        0x4000..=0x1f_ffff => 3,
        0x20_0000..=0x0fff_ffff => 4,
        _ => 5,
    }
}
