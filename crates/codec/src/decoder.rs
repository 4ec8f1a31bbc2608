//! Schema-aware record decoder.

use std::collections::HashSet;

use hyproto_buffers::Reader;

use crate::bitmap::NullableBitmap;
use crate::error::{ProtocolError, ReadContext};
use crate::options::{CodecOptions, Depth};
use crate::schema::{FieldType, KeyType, RecordLayout, SchemaSet, Slot};
use crate::validator::StructureValidator;
use crate::value::{MapKey, Record, Value};
use crate::variant;
use crate::walk::{self, Bound};

/// Materializes [`Record`]s from encoded bytes.
///
/// Every read is bounds-checked against the reader's written extent and
/// every length, count and tag is checked before it is used, so arbitrary
/// input yields an error rather than a panic or an unbounded allocation.
pub struct RecordDecoder<'s> {
    schema: &'s SchemaSet,
    options: CodecOptions,
}

impl<'s> RecordDecoder<'s> {
    pub fn new(schema: &'s SchemaSet, options: CodecOptions) -> Self {
        Self { schema, options }
    }

    /// Decodes one `record` instance starting at `offset`.
    pub fn decode(
        &self,
        reader: &Reader<'_>,
        offset: usize,
        record: &str,
    ) -> Result<Record, ProtocolError> {
        let layout = self.schema.record(record)?;
        let depth = Depth::root(&self.options);
        let (record, _) = self.read_record(reader, offset, layout, depth)?;
        Ok(record)
    }

    /// Decodes a tagged member of `family` starting at `offset`.
    pub fn decode_variant(
        &self,
        reader: &Reader<'_>,
        offset: usize,
        family: &str,
    ) -> Result<Record, ProtocolError> {
        let (layout, tag_len) = variant::resolve(self.schema, family, reader, offset)?;
        let depth = Depth::root(&self.options);
        let (record, _) = self.read_record(reader, offset + tag_len, layout, depth)?;
        Ok(record)
    }

    /// Byte span of the `record` instance at `offset`, without materializing it.
    pub fn bytes_consumed(
        &self,
        reader: &Reader<'_>,
        offset: usize,
        record: &str,
    ) -> Result<usize, ProtocolError> {
        StructureValidator::new(self.schema, self.options)
            .span(reader, offset, record)
            .map_err(|e| e.into_cause())
    }

    /// Byte span of the tagged `family` member at `offset`, tag included.
    pub fn variant_bytes_consumed(
        &self,
        reader: &Reader<'_>,
        offset: usize,
        family: &str,
    ) -> Result<usize, ProtocolError> {
        StructureValidator::new(self.schema, self.options)
            .variant_span(reader, offset, family)
            .map_err(|e| e.into_cause())
    }

    /// Decodes the record at `offset` and returns it with its byte span,
    /// `max(variable_block_start, furthest end of any present field)`.
    ///
    /// Offset-table entries may point anywhere in the payload, in any order,
    /// so the span is the furthest end seen rather than a running cursor.
    fn read_record(
        &self,
        reader: &Reader<'_>,
        offset: usize,
        layout: &RecordLayout,
        depth: Depth,
    ) -> Result<(Record, usize), ProtocolError> {
        walk::check_header(reader, offset, layout)?;
        let bitmap_len = layout.nullable_bit_field_size;
        let bitmap = NullableBitmap::read(reader, offset, bitmap_len, &layout.name)?;
        let mut record = Record::new(layout.name.as_str());
        let mut consumed = layout.variable_block_start;

        for field in &layout.fields {
            if let Some(bit) = field.bit {
                if !bitmap.is_set(bit) {
                    continue;
                }
            }
            let position = match field.slot {
                Slot::Fixed { offset: at, .. } => offset + at,
                Slot::Variable { index } => {
                    walk::variable_position(reader, offset, layout, field, index)?
                }
            };
            let (value, end) = self.read_item(reader, position, &field.ty, &field.name, depth)?;
            consumed = consumed.max(end - offset);
            record.fields.insert(field.name.clone(), value);
        }
        Ok((record, consumed))
    }

    /// Decodes one value of kind `ty` at `position`, returning it with the
    /// position just past its encoding.
    fn read_item(
        &self,
        reader: &Reader<'_>,
        position: usize,
        ty: &FieldType,
        field: &str,
        depth: Depth,
    ) -> Result<(Value, usize), ProtocolError> {
        let (value, width) = match ty {
            FieldType::Bool => (Value::Bool(reader.bool_at(position).field(field)?), 1),
            FieldType::Byte => (Value::Byte(reader.i8_at(position).field(field)?), 1),
            FieldType::Short => (Value::Short(reader.i16_le_at(position).field(field)?), 2),
            FieldType::Int => (Value::Int(reader.i32_le_at(position).field(field)?), 4),
            FieldType::Long => (Value::Long(reader.i64_le_at(position).field(field)?), 8),
            FieldType::Float => (Value::Float(reader.f32_le_at(position).field(field)?), 4),
            FieldType::Double => (Value::Double(reader.f64_le_at(position).field(field)?), 8),
            FieldType::Uuid => (Value::Uuid(reader.uuid_at(position).field(field)?), 16),
            FieldType::Enum(name) => {
                let raw = reader.u8_at(position).field(field)?;
                let member = walk::check_enum(self.schema, name, raw, field)?;
                (Value::Enum(member), 1)
            }
            FieldType::FixedAscii(width) => {
                let text = walk::fixed_ascii(reader, position, *width, field)?;
                (Value::Str(text.to_string()), *width)
            }
            FieldType::Struct(name) => {
                let layout = self.schema.record(name)?;
                let (record, _) = self.read_record(reader, position, layout, depth)?;
                (Value::Record(record), layout.fixed_block_size)
            }
            other => return self.read_variable(reader, position, other, field, depth),
        };
        Ok((value, position + width))
    }

    fn read_variable(
        &self,
        reader: &Reader<'_>,
        position: usize,
        ty: &FieldType,
        field: &str,
        depth: Depth,
    ) -> Result<(Value, usize), ProtocolError> {
        let value = match ty {
            FieldType::String { max, charset } => {
                let (length, start) =
                    walk::read_length(reader, position, field, *max, Bound::String)?;
                let bytes = reader.bytes_at(start, length).field(field)?;
                let text = walk::decode_text(bytes, *charset, field)?;
                (Value::Str(text.to_string()), start + length)
            }
            FieldType::Bytes { max } => {
                let (length, start) =
                    walk::read_length(reader, position, field, *max, Bound::Array)?;
                let bytes = reader.bytes_at(start, length).field(field)?;
                (Value::Bytes(bytes.to_vec()), start + length)
            }
            FieldType::Array { element, max } => {
                let (count, mut cursor) =
                    walk::read_length(reader, position, field, *max, Bound::Array)?;
                if let Some(size) = self.schema.fixed_size(element) {
                    walk::check_elements(reader, cursor, count, size, field)?;
                }
                let mut items = Vec::with_capacity(count.min(reader.remaining(cursor)));
                for _ in 0..count {
                    let (item, end) = self.read_item(reader, cursor, element, field, depth)?;
                    items.push(item);
                    cursor = end;
                }
                (Value::Array(items), cursor)
            }
            FieldType::Map { key, value, max } => {
                let (count, mut cursor) =
                    walk::read_length(reader, position, field, *max, Bound::Dictionary)?;
                let capacity = count.min(reader.remaining(cursor));
                let mut entries = Vec::with_capacity(capacity);
                let mut seen = HashSet::with_capacity(capacity);
                for _ in 0..count {
                    let (map_key, after_key) = self.read_key(reader, cursor, key, field)?;
                    if !seen.insert(map_key.clone()) {
                        return Err(ProtocolError::DuplicateKey {
                            field: field.to_string(),
                            key: map_key.to_string(),
                        });
                    }
                    let (item, end) = self.read_item(reader, after_key, value, field, depth)?;
                    entries.push((map_key, item));
                    cursor = end;
                }
                (Value::Map(entries), cursor)
            }
            FieldType::Record(name) => {
                let depth = depth.descend()?;
                let layout = self.schema.record(name)?;
                let (record, consumed) = self.read_record(reader, position, layout, depth)?;
                (Value::Record(record), position + consumed)
            }
            FieldType::Variant(family) => {
                let depth = depth.descend()?;
                let (layout, tag_len) = variant::resolve(self.schema, family, reader, position)?;
                let start = position + tag_len;
                let (record, consumed) = self.read_record(reader, start, layout, depth)?;
                (Value::Record(record), start + consumed)
            }
            other => return self.read_item(reader, position, other, field, depth),
        };
        Ok(value)
    }

    fn read_key(
        &self,
        reader: &Reader<'_>,
        position: usize,
        key: &KeyType,
        field: &str,
    ) -> Result<(MapKey, usize), ProtocolError> {
        let (key, width) = match key {
            KeyType::Str { max, charset } => {
                let (length, start) =
                    walk::read_length(reader, position, field, *max, Bound::String)?;
                let bytes = reader.bytes_at(start, length).field(field)?;
                let text = walk::decode_text(bytes, *charset, field)?;
                return Ok((MapKey::Str(text.to_string()), start + length));
            }
            KeyType::Byte => (MapKey::Byte(reader.i8_at(position).field(field)?), 1),
            KeyType::Enum(name) => {
                let raw = reader.u8_at(position).field(field)?;
                let member = walk::check_enum(self.schema, name, raw, field)?;
                (MapKey::Enum(member), 1)
            }
            KeyType::Int => (MapKey::Int(reader.i32_le_at(position).field(field)?), 4),
            KeyType::Long => (MapKey::Long(reader.i64_le_at(position).field(field)?), 8),
            KeyType::Float => (MapKey::float(reader.f32_le_at(position).field(field)?), 4),
        };
        Ok((key, position + width))
    }
}
