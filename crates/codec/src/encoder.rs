//! Schema-aware record encoder and size computation.

use std::collections::HashSet;

use hyproto_buffers::Writer;

use crate::bitmap::NullableBitmap;
use crate::error::{ProtocolError, ReadContext};
use crate::options::{CodecOptions, Depth};
use crate::schema::{Charset, FieldLayout, FieldType, KeyType, RecordLayout, SchemaSet, Slot};
use crate::value::{MapKey, Record, Value};
use crate::variant;
use crate::varint;
use crate::walk::{self, Bound};

/// Writes [`Record`]s in wire layout and predicts their encoded size.
///
/// `compute_size` walks the record exactly as `encode` does and performs
/// the same checks, so for any record it either fails the same way or
/// returns the number of bytes `encode` writes.
pub struct RecordEncoder<'s> {
    schema: &'s SchemaSet,
    options: CodecOptions,
}

impl<'s> RecordEncoder<'s> {
    pub fn new(schema: &'s SchemaSet, options: CodecOptions) -> Self {
        Self { schema, options }
    }

    /// Appends `record` to `writer` and returns the number of bytes written.
    /// On failure nothing is left behind in the writer.
    pub fn encode(&self, writer: &mut Writer, record: &Record) -> Result<usize, ProtocolError> {
        let layout = self.schema.record(&record.name)?;
        let start = writer.position();
        match self.write_record(writer, record, layout, Depth::root(&self.options)) {
            Ok(()) => Ok(writer.position() - start),
            Err(err) => {
                writer.rewind(start);
                Err(err)
            }
        }
    }

    /// Writes `VarInt(tag)` for `record` within `family`, then the record.
    pub fn encode_with_tag(
        &self,
        writer: &mut Writer,
        family: &str,
        record: &Record,
    ) -> Result<usize, ProtocolError> {
        let tag = variant::tag_of(self.schema, family, &record.name)?;
        let layout = self.schema.record(&record.name)?;
        let start = writer.position();
        varint::write(writer, tag);
        match self.write_record(writer, record, layout, Depth::root(&self.options)) {
            Ok(()) => Ok(writer.position() - start),
            Err(err) => {
                writer.rewind(start);
                Err(err)
            }
        }
    }

    /// Encodes into a buffer preallocated from [`RecordEncoder::compute_size`].
    pub fn encode_to_vec(&self, record: &Record) -> Result<Vec<u8>, ProtocolError> {
        let size = self.compute_size(record)?;
        let mut writer = Writer::with_capacity(size);
        self.encode(&mut writer, record)?;
        Ok(writer.flush())
    }

    /// Number of bytes [`RecordEncoder::encode`] would write for `record`.
    pub fn compute_size(&self, record: &Record) -> Result<usize, ProtocolError> {
        let layout = self.schema.record(&record.name)?;
        self.record_size(record, layout, Depth::root(&self.options))
    }

    /// Number of bytes [`RecordEncoder::encode_with_tag`] would write.
    pub fn compute_size_with_tag(
        &self,
        family: &str,
        record: &Record,
    ) -> Result<usize, ProtocolError> {
        let tag = variant::tag_of(self.schema, family, &record.name)?;
        Ok(varint::size(tag) + self.compute_size(record)?)
    }

    fn check_fields(&self, record: &Record, layout: &RecordLayout) -> Result<(), ProtocolError> {
        for name in record.fields.keys() {
            if layout.field(name).is_none() {
                return Err(ProtocolError::UnknownField {
                    record: layout.name.clone(),
                    field: name.clone(),
                });
            }
        }
        Ok(())
    }

    fn write_record(
        &self,
        writer: &mut Writer,
        record: &Record,
        layout: &RecordLayout,
        depth: Depth,
    ) -> Result<(), ProtocolError> {
        self.check_fields(record, layout)?;

        let mut bitmap = NullableBitmap::zeroed(layout.nullable_bit_field_size);
        for field in &layout.fields {
            if let Some(bit) = field.bit {
                if record.is_present(&field.name) {
                    bitmap.set(bit);
                }
            }
        }
        bitmap.write(writer);

        for field in &layout.fields {
            if let Slot::Fixed { size, .. } = field.slot {
                match record.get(&field.name) {
                    Some(item) => self.write_item(writer, item, &field.ty, &field.name, depth)?,
                    None if field.nullable => writer.zeros(size),
                    None => return Err(missing(layout, field)),
                }
            }
        }

        let table = writer.position();
        writer.zeros(4 * layout.variable_field_count);
        let variable_start = writer.position();
        for field in &layout.fields {
            let Slot::Variable { index } = field.slot else {
                continue;
            };
            let slot = table + 4 * index;
            match record.get(&field.name) {
                Some(item) => {
                    let relative = i32::try_from(writer.position() - variable_start)
                        .map_err(|_| offset_overflow(field))?;
                    writer.set_i32_le(slot, relative).field(&field.name)?;
                    self.write_item(writer, item, &field.ty, &field.name, depth)?;
                }
                None if field.nullable => writer.set_i32_le(slot, -1).field(&field.name)?,
                None => return Err(missing(layout, field)),
            }
        }
        Ok(())
    }

    fn write_item(
        &self,
        writer: &mut Writer,
        item: &Value,
        ty: &FieldType,
        field: &str,
        depth: Depth,
    ) -> Result<(), ProtocolError> {
        match (ty, item) {
            (FieldType::Bool, Value::Bool(v)) => writer.bool(*v),
            (FieldType::Byte, Value::Byte(v)) => writer.i8(*v),
            (FieldType::Short, Value::Short(v)) => writer.i16_le(*v),
            (FieldType::Int, Value::Int(v)) => writer.i32_le(*v),
            (FieldType::Long, Value::Long(v)) => writer.i64_le(*v),
            (FieldType::Float, Value::Float(v)) => writer.f32_le(*v),
            (FieldType::Double, Value::Double(v)) => writer.f64_le(*v),
            (FieldType::Uuid, Value::Uuid(v)) => writer.uuid(*v),
            (FieldType::Enum(name), Value::Enum(v)) => {
                writer.u8(walk::check_enum(self.schema, name, *v, field)?);
            }
            (FieldType::FixedAscii(width), Value::Str(s)) => {
                check_fixed_ascii(s, *width, field)?;
                writer.buf(s.as_bytes());
                writer.zeros(width - s.len());
            }
            (FieldType::Struct(name), Value::Record(r)) if r.name == *name => {
                let layout = self.schema.record(name)?;
                self.write_record(writer, r, layout, depth)?;
            }
            (FieldType::String { max, charset }, Value::Str(s)) => {
                check_text(s, *charset, field)?;
                write_length(writer, s.len(), *max, field, Bound::String)?;
                writer.buf(s.as_bytes());
            }
            (FieldType::Bytes { max }, Value::Bytes(b)) => {
                write_length(writer, b.len(), *max, field, Bound::Array)?;
                writer.buf(b);
            }
            (FieldType::Array { element, max }, Value::Array(items)) => {
                write_length(writer, items.len(), *max, field, Bound::Array)?;
                for element_item in items {
                    self.write_item(writer, element_item, element, field, depth)?;
                }
            }
            (FieldType::Map { key, value, max }, Value::Map(entries)) => {
                check_unique_keys(entries, field)?;
                write_length(writer, entries.len(), *max, field, Bound::Dictionary)?;
                for (map_key, entry) in entries {
                    self.write_key(writer, map_key, key, field)?;
                    self.write_item(writer, entry, value, field, depth)?;
                }
            }
            (FieldType::Record(name), Value::Record(r)) if r.name == *name => {
                let layout = self.schema.record(name)?;
                self.write_record(writer, r, layout, depth.descend()?)?;
            }
            (FieldType::Variant(family), Value::Record(r)) => {
                let depth = depth.descend()?;
                let tag = variant::tag_of(self.schema, family, &r.name)?;
                let layout = self.schema.record(&r.name)?;
                varint::write(writer, tag);
                self.write_record(writer, r, layout, depth)?;
            }
            (ty, _) => return Err(ProtocolError::type_mismatch(field, ty.kind_name())),
        }
        Ok(())
    }

    fn write_key(
        &self,
        writer: &mut Writer,
        map_key: &MapKey,
        key: &KeyType,
        field: &str,
    ) -> Result<(), ProtocolError> {
        match (key, map_key) {
            (KeyType::Str { max, charset }, MapKey::Str(s)) => {
                check_text(s, *charset, field)?;
                write_length(writer, s.len(), *max, field, Bound::String)?;
                writer.buf(s.as_bytes());
            }
            (KeyType::Byte, MapKey::Byte(v)) => writer.i8(*v),
            (KeyType::Enum(name), MapKey::Enum(v)) => {
                writer.u8(walk::check_enum(self.schema, name, *v, field)?);
            }
            (KeyType::Int, MapKey::Int(v)) => writer.i32_le(*v),
            (KeyType::Long, MapKey::Long(v)) => writer.i64_le(*v),
            (KeyType::Float, MapKey::Float(bits)) => writer.f32_le(f32::from_bits(*bits)),
            _ => return Err(ProtocolError::type_mismatch(field, "map key")),
        }
        Ok(())
    }

    fn record_size(
        &self,
        record: &Record,
        layout: &RecordLayout,
        depth: Depth,
    ) -> Result<usize, ProtocolError> {
        self.check_fields(record, layout)?;
        let mut size = layout.variable_block_start;
        for field in &layout.fields {
            match (record.get(&field.name), field.slot) {
                (Some(item), Slot::Fixed { .. }) => {
                    self.item_size(item, &field.ty, &field.name, depth)?;
                }
                (Some(item), Slot::Variable { .. }) => {
                    size += self.item_size(item, &field.ty, &field.name, depth)?;
                }
                (None, _) if field.nullable => {}
                (None, _) => return Err(missing(layout, field)),
            }
        }
        Ok(size)
    }

    fn item_size(
        &self,
        item: &Value,
        ty: &FieldType,
        field: &str,
        depth: Depth,
    ) -> Result<usize, ProtocolError> {
        let size = match (ty, item) {
            (FieldType::Bool, Value::Bool(_))
            | (FieldType::Byte, Value::Byte(_))
            | (FieldType::Short, Value::Short(_))
            | (FieldType::Int, Value::Int(_))
            | (FieldType::Long, Value::Long(_))
            | (FieldType::Float, Value::Float(_))
            | (FieldType::Double, Value::Double(_))
            | (FieldType::Uuid, Value::Uuid(_)) => self.schema.fixed_size(ty).unwrap_or_default(),
            (FieldType::Enum(name), Value::Enum(v)) => {
                walk::check_enum(self.schema, name, *v, field)?;
                1
            }
            (FieldType::FixedAscii(width), Value::Str(s)) => {
                check_fixed_ascii(s, *width, field)?;
                *width
            }
            (FieldType::Struct(name), Value::Record(r)) if r.name == *name => {
                let layout = self.schema.record(name)?;
                self.record_size(r, layout, depth)?
            }
            (FieldType::String { max, charset }, Value::Str(s)) => {
                check_text(s, *charset, field)?;
                length_size(s.len(), *max, field, Bound::String)? + s.len()
            }
            (FieldType::Bytes { max }, Value::Bytes(b)) => {
                length_size(b.len(), *max, field, Bound::Array)? + b.len()
            }
            (FieldType::Array { element, max }, Value::Array(items)) => {
                let mut size = length_size(items.len(), *max, field, Bound::Array)?;
                for element_item in items {
                    size += self.item_size(element_item, element, field, depth)?;
                }
                size
            }
            (FieldType::Map { key, value, max }, Value::Map(entries)) => {
                check_unique_keys(entries, field)?;
                let mut size = length_size(entries.len(), *max, field, Bound::Dictionary)?;
                for (map_key, entry) in entries {
                    size += key_size(map_key, key, field)?;
                    size += self.item_size(entry, value, field, depth)?;
                }
                size
            }
            (FieldType::Record(name), Value::Record(r)) if r.name == *name => {
                let layout = self.schema.record(name)?;
                self.record_size(r, layout, depth.descend()?)?
            }
            (FieldType::Variant(family), Value::Record(r)) => {
                let depth = depth.descend()?;
                let tag = variant::tag_of(self.schema, family, &r.name)?;
                let layout = self.schema.record(&r.name)?;
                varint::size(tag) + self.record_size(r, layout, depth)?
            }
            (ty, _) => return Err(ProtocolError::type_mismatch(field, ty.kind_name())),
        };
        Ok(size)
    }
}

fn missing(layout: &RecordLayout, field: &FieldLayout) -> ProtocolError {
    ProtocolError::MissingField {
        record: layout.name.clone(),
        field: field.name.clone(),
    }
}

fn offset_overflow(field: &FieldLayout) -> ProtocolError {
    ProtocolError::OffsetOverflow {
        field: field.name.clone(),
    }
}

/// Lengths are capped by the field maximum and must also survive the
/// decoder's signed reading of the VarInt.
fn checked_length(
    length: usize,
    max: usize,
    field: &str,
    bound: Bound,
) -> Result<u32, ProtocolError> {
    if length > max || length > i32::MAX as usize {
        return Err(bound.violation(field, length, max.min(i32::MAX as usize)));
    }
    Ok(length as u32)
}

fn write_length(
    writer: &mut Writer,
    length: usize,
    max: usize,
    field: &str,
    bound: Bound,
) -> Result<(), ProtocolError> {
    varint::write(writer, checked_length(length, max, field, bound)?);
    Ok(())
}

fn length_size(
    length: usize,
    max: usize,
    field: &str,
    bound: Bound,
) -> Result<usize, ProtocolError> {
    Ok(varint::size(checked_length(length, max, field, bound)?))
}

fn key_size(map_key: &MapKey, key: &KeyType, field: &str) -> Result<usize, ProtocolError> {
    match (key, map_key) {
        (KeyType::Str { max, charset }, MapKey::Str(s)) => {
            check_text(s, *charset, field)?;
            Ok(length_size(s.len(), *max, field, Bound::String)? + s.len())
        }
        (KeyType::Byte, MapKey::Byte(_))
        | (KeyType::Enum(_), MapKey::Enum(_))
        | (KeyType::Int, MapKey::Int(_))
        | (KeyType::Long, MapKey::Long(_))
        | (KeyType::Float, MapKey::Float(_)) => Ok(key.fixed_size().unwrap_or_default()),
        _ => Err(ProtocolError::type_mismatch(field, "map key")),
    }
}

fn check_text(s: &str, charset: Charset, field: &str) -> Result<(), ProtocolError> {
    if charset == Charset::Ascii && !s.is_ascii() {
        return Err(ProtocolError::InvalidAscii {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// NUL terminates a fixed-width string on decode, so it cannot appear inside one.
fn check_fixed_ascii(s: &str, width: usize, field: &str) -> Result<(), ProtocolError> {
    check_text(s, Charset::Ascii, field)?;
    if s.contains('\0') {
        return Err(ProtocolError::InvalidAscii {
            field: field.to_string(),
        });
    }
    if s.len() > width {
        return Err(ProtocolError::FixedStringTooLong {
            field: field.to_string(),
            length: s.len(),
            max: width,
        });
    }
    Ok(())
}

fn check_unique_keys(entries: &[(MapKey, Value)], field: &str) -> Result<(), ProtocolError> {
    let mut seen = HashSet::with_capacity(entries.len());
    for (key, _) in entries {
        if !seen.insert(key) {
            return Err(ProtocolError::DuplicateKey {
                field: field.to_string(),
                key: key.to_string(),
            });
        }
    }
    Ok(())
}
