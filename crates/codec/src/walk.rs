//! Bounds checks shared by the decoding and validating walks.

use hyproto_buffers::Reader;

use crate::error::{ProtocolError, ReadContext};
use crate::schema::{Charset, FieldLayout, RecordLayout, SchemaSet};
use crate::varint;

/// Which cap a length-prefixed payload is measured against.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Bound {
    String,
    Array,
    Dictionary,
}

impl Bound {
    pub(crate) fn violation(self, field: &str, got: usize, max: usize) -> ProtocolError {
        let field = field.to_string();
        match self {
            Bound::String => ProtocolError::StringTooLong {
                field,
                length: got,
                max,
            },
            Bound::Array => ProtocolError::ArrayTooLong {
                field,
                count: got,
                max,
            },
            Bound::Dictionary => ProtocolError::DictionaryTooLarge {
                field,
                count: got,
                max,
            },
        }
    }
}

/// Fails unless the bitmap, fixed block and offset table of `layout` fit
/// between `offset` and the written extent.
pub(crate) fn check_header(
    reader: &Reader<'_>,
    offset: usize,
    layout: &RecordLayout,
) -> Result<(), ProtocolError> {
    let available = reader.remaining(offset);
    if available < layout.variable_block_start {
        return Err(ProtocolError::buffer_too_small(
            &layout.name,
            layout.variable_block_start,
            available,
        ));
    }
    Ok(())
}

/// Resolves offset-table entry `index` of the record at `offset` to an
/// absolute payload position.
///
/// The position must land strictly before the written extent. A `-1`
/// entry on a field that has no nullable bit means the required field is
/// missing.
///
/// A zero-width payload written last (a nested record with no fields)
/// starts exactly at the extent, so it is rejected here even though the
/// encoder emits it.
pub(crate) fn variable_position(
    reader: &Reader<'_>,
    offset: usize,
    layout: &RecordLayout,
    field: &FieldLayout,
    index: usize,
) -> Result<usize, ProtocolError> {
    let stored = reader
        .i32_le_at(offset + layout.slot_position(index))
        .field(&field.name)?;
    if stored < 0 {
        if stored == -1 && !field.nullable {
            return Err(ProtocolError::MissingField {
                record: layout.name.clone(),
                field: field.name.clone(),
            });
        }
        return Err(ProtocolError::InvalidOffset {
            field: field.name.clone(),
            offset: stored,
        });
    }
    let position = offset
        .checked_add(layout.variable_block_start)
        .and_then(|p| p.checked_add(stored as usize))
        .ok_or_else(|| ProtocolError::OffsetOverflow {
            field: field.name.clone(),
        })?;
    if position >= reader.extent() {
        return Err(ProtocolError::OffsetOutOfBounds {
            field: field.name.clone(),
            position,
            extent: reader.extent(),
        });
    }
    Ok(position)
}

/// Reads a VarInt length or count at `position` and checks it against
/// `max`. Returns the value and the position right after the prefix.
pub(crate) fn read_length(
    reader: &Reader<'_>,
    position: usize,
    field: &str,
    max: usize,
    bound: Bound,
) -> Result<(usize, usize), ProtocolError> {
    let (raw, prefix) = varint::read(reader, position).field(field)?;
    if raw < 0 {
        return Err(ProtocolError::negative_length(field, raw));
    }
    let length = raw as usize;
    if length > max {
        return Err(bound.violation(field, length, max));
    }
    Ok((length, position + prefix))
}

/// Fails unless `count` elements of `size` bytes fit from `start`.
pub(crate) fn check_elements(
    reader: &Reader<'_>,
    start: usize,
    count: usize,
    size: usize,
    field: &str,
) -> Result<(), ProtocolError> {
    let end = count
        .checked_mul(size)
        .and_then(|bytes| start.checked_add(bytes));
    match end {
        Some(end) if end <= reader.extent() => Ok(()),
        _ => Err(ProtocolError::buffer_too_small(
            field,
            end.unwrap_or(usize::MAX),
            reader.extent(),
        )),
    }
}

pub(crate) fn check_enum(
    schema: &SchemaSet,
    name: &str,
    value: u8,
    field: &str,
) -> Result<u8, ProtocolError> {
    let count = schema.enum_count(name)?;
    if value >= count {
        return Err(ProtocolError::InvalidEnumValue {
            field: field.to_string(),
            value,
            count,
        });
    }
    Ok(value)
}

pub(crate) fn decode_text<'a>(
    bytes: &'a [u8],
    charset: Charset,
    field: &str,
) -> Result<&'a str, ProtocolError> {
    if charset == Charset::Ascii && !bytes.is_ascii() {
        return Err(ProtocolError::InvalidAscii {
            field: field.to_string(),
        });
    }
    std::str::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8 {
        field: field.to_string(),
    })
}

/// Reads a zero-padded fixed-width ASCII string, stopping at the first NUL.
pub(crate) fn fixed_ascii<'a>(
    reader: &Reader<'a>,
    position: usize,
    width: usize,
    field: &str,
) -> Result<&'a str, ProtocolError> {
    let bytes = reader.bytes_at(position, width).field(field)?;
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(width);
    decode_text(&bytes[..end], Charset::Ascii, field)
}
