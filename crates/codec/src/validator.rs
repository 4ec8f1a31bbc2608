//! Structural validation without materialization.
//!
//! Walks encoded bytes the way the decoder does, checking every offset,
//! length, count, tag and enum value, but never builds a [`crate::Record`].
//! The same walk yields a record's byte span, which is how
//! `bytes_consumed` is computed.

use std::collections::HashSet;

use hyproto_buffers::Reader;

use crate::bitmap::NullableBitmap;
use crate::error::{PathSegment, ProtocolError, ReadContext, ValidationError};
use crate::options::{CodecOptions, Depth};
use crate::schema::{FieldType, KeyType, RecordLayout, SchemaSet, Slot};
use crate::value::MapKey;
use crate::variant;
use crate::walk::{self, Bound};

/// Validates encoded records and measures their byte spans.
pub struct StructureValidator<'s> {
    schema: &'s SchemaSet,
    options: CodecOptions,
}

impl<'s> StructureValidator<'s> {
    pub fn new(schema: &'s SchemaSet, options: CodecOptions) -> Self {
        Self { schema, options }
    }

    /// Checks that the `record` instance at `offset` decodes cleanly.
    pub fn validate(
        &self,
        reader: &Reader<'_>,
        offset: usize,
        record: &str,
    ) -> Result<(), ValidationError> {
        self.span(reader, offset, record).map(|_| ())
    }

    /// Checks the tagged `family` member at `offset`.
    pub fn validate_variant(
        &self,
        reader: &Reader<'_>,
        offset: usize,
        family: &str,
    ) -> Result<(), ValidationError> {
        self.variant_span(reader, offset, family).map(|_| ())
    }

    /// Validates the record at `offset` and returns its byte span.
    pub fn span(
        &self,
        reader: &Reader<'_>,
        offset: usize,
        record: &str,
    ) -> Result<usize, ValidationError> {
        let layout = self.schema.record(record)?;
        self.walk_record(reader, offset, layout, Depth::root(&self.options))
    }

    /// Validates the tagged member at `offset` and returns its byte span,
    /// tag included.
    pub fn variant_span(
        &self,
        reader: &Reader<'_>,
        offset: usize,
        family: &str,
    ) -> Result<usize, ValidationError> {
        let (layout, tag_len) = variant::resolve(self.schema, family, reader, offset)?;
        let depth = Depth::root(&self.options);
        let span = self
            .walk_record(reader, offset + tag_len, layout, depth)
            .map_err(|e| within_variant(e, family, layout))?;
        Ok(tag_len + span)
    }

    /// The span is the furthest end of any present field, never less than
    /// the header. Payloads may sit in any order relative to their slots.
    fn walk_record(
        &self,
        reader: &Reader<'_>,
        offset: usize,
        layout: &RecordLayout,
        depth: Depth,
    ) -> Result<usize, ValidationError> {
        walk::check_header(reader, offset, layout)?;
        let bitmap_len = layout.nullable_bit_field_size;
        let bitmap = NullableBitmap::read(reader, offset, bitmap_len, &layout.name)?;
        let mut consumed = layout.variable_block_start;

        for field in &layout.fields {
            if let Some(bit) = field.bit {
                if !bitmap.is_set(bit) {
                    continue;
                }
            }
            let in_field = |e: ValidationError| {
                e.within(PathSegment::Field {
                    record: layout.name.clone(),
                    field: field.name.clone(),
                })
            };
            let position = match field.slot {
                Slot::Fixed { offset: at, .. } => offset + at,
                Slot::Variable { index } => {
                    walk::variable_position(reader, offset, layout, field, index)
                        .map_err(|e| in_field(e.into()))?
                }
            };
            let end = self
                .walk_item(reader, position, &field.ty, &field.name, depth)
                .map_err(in_field)?;
            consumed = consumed.max(end - offset);
        }
        Ok(consumed)
    }

    /// Checks one value of kind `ty` at `position` and returns the position
    /// just past it.
    fn walk_item(
        &self,
        reader: &Reader<'_>,
        position: usize,
        ty: &FieldType,
        field: &str,
        depth: Depth,
    ) -> Result<usize, ValidationError> {
        if let FieldType::Enum(name) = ty {
            let raw = reader.u8_at(position).field(field)?;
            walk::check_enum(self.schema, name, raw, field)?;
            return Ok(position + 1);
        }
        if let FieldType::FixedAscii(width) = ty {
            walk::fixed_ascii(reader, position, *width, field)?;
            return Ok(position + width);
        }
        if let Some(size) = self.schema.fixed_size(ty) {
            if let FieldType::Struct(name) = ty {
                let layout = self.schema.record(name)?;
                self.walk_record(reader, position, layout, depth)?;
            }
            return Ok(reader.check(position, size).field(field)?);
        }

        let end = match ty {
            FieldType::String { max, charset } => {
                let (length, start) =
                    walk::read_length(reader, position, field, *max, Bound::String)?;
                let bytes = reader.bytes_at(start, length).field(field)?;
                walk::decode_text(bytes, *charset, field)?;
                start + length
            }
            FieldType::Bytes { max } => {
                let (length, start) =
                    walk::read_length(reader, position, field, *max, Bound::Array)?;
                reader.check(start, length).field(field)?
            }
            FieldType::Array { element, max } => {
                let (count, mut cursor) =
                    walk::read_length(reader, position, field, *max, Bound::Array)?;
                if let Some(size) = self.schema.fixed_size(element) {
                    walk::check_elements(reader, cursor, count, size, field)?;
                }
                for i in 0..count {
                    cursor = self
                        .walk_item(reader, cursor, element, field, depth)
                        .map_err(|e| e.within(PathSegment::Index(i)))?;
                }
                cursor
            }
            FieldType::Map { key, value, max } => {
                let (count, mut cursor) =
                    walk::read_length(reader, position, field, *max, Bound::Dictionary)?;
                let capacity = count.min(reader.remaining(cursor));
                let mut seen: HashSet<&[u8]> = HashSet::with_capacity(capacity);
                for _ in 0..count {
                    let (raw_key, after_key) = self.walk_key(reader, cursor, key, field)?;
                    if !seen.insert(raw_key) {
                        return Err(ProtocolError::DuplicateKey {
                            field: field.to_string(),
                            key: key_label(key, raw_key),
                        }
                        .into());
                    }
                    cursor = self
                        .walk_item(reader, after_key, value, field, depth)
                        .map_err(|e| e.within(PathSegment::Key(key_label(key, raw_key))))?;
                }
                cursor
            }
            FieldType::Record(name) => {
                let depth = depth.descend()?;
                let layout = self.schema.record(name)?;
                position + self.walk_record(reader, position, layout, depth)?
            }
            FieldType::Variant(family) => {
                let depth = depth.descend()?;
                let (layout, tag_len) = variant::resolve(self.schema, family, reader, position)?;
                let start = position + tag_len;
                let span = self
                    .walk_record(reader, start, layout, depth)
                    .map_err(|e| within_variant(e, family, layout))?;
                start + span
            }
            other => return Err(ProtocolError::type_mismatch(field, other.kind_name()).into()),
        };
        Ok(end)
    }

    /// Checks one map key and returns its identity bytes (string content or
    /// the fixed-width encoding) with the position after it.
    fn walk_key<'a>(
        &self,
        reader: &Reader<'a>,
        position: usize,
        key: &KeyType,
        field: &str,
    ) -> Result<(&'a [u8], usize), ProtocolError> {
        match key {
            KeyType::Str { max, charset } => {
                let (length, start) =
                    walk::read_length(reader, position, field, *max, Bound::String)?;
                let bytes = reader.bytes_at(start, length).field(field)?;
                walk::decode_text(bytes, *charset, field)?;
                Ok((bytes, start + length))
            }
            KeyType::Enum(name) => {
                let raw = reader.bytes_at(position, 1).field(field)?;
                walk::check_enum(self.schema, name, raw[0], field)?;
                Ok((raw, position + 1))
            }
            fixed => {
                let size = fixed.fixed_size().unwrap_or_default();
                let bytes = reader.bytes_at(position, size).field(field)?;
                Ok((bytes, position + size))
            }
        }
    }
}

fn within_variant(err: ValidationError, family: &str, layout: &RecordLayout) -> ValidationError {
    err.within(PathSegment::Variant {
        family: family.to_string(),
        record: layout.name.clone(),
    })
}

/// Human-readable form of a raw map key, rendered like [`MapKey`].
fn key_label(key: &KeyType, raw: &[u8]) -> String {
    let first = raw.first().copied().unwrap_or_default();
    let word = <[u8; 4]>::try_from(raw).unwrap_or_default();
    let long = <[u8; 8]>::try_from(raw).unwrap_or_default();
    let map_key = match key {
        KeyType::Str { .. } => MapKey::Str(String::from_utf8_lossy(raw).into_owned()),
        KeyType::Byte => MapKey::Byte(first as i8),
        KeyType::Enum(_) => MapKey::Enum(first),
        KeyType::Int => MapKey::Int(i32::from_le_bytes(word)),
        KeyType::Long => MapKey::Long(i64::from_le_bytes(long)),
        KeyType::Float => MapKey::Float(u32::from_le_bytes(word)),
    };
    map_key.to_string()
}
