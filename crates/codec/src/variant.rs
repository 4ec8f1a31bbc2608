//! Polymorphic variant dispatch.
//!
//! A variant is encoded as `VarInt(tag)` followed by the member record's own
//! encoding, with no length prefix. Decoding reads the tag and hands off to
//! the member's layout; encoding looks the tag up from the record's name.

use hyproto_buffers::Reader;

use crate::error::{ProtocolError, ReadContext};
use crate::schema::{RecordLayout, SchemaSet};
use crate::varint;

/// Reads the tag at `position` and returns the member layout it selects
/// together with the tag's encoded length.
pub(crate) fn resolve<'s>(
    schema: &'s SchemaSet,
    family: &str,
    reader: &Reader<'_>,
    position: usize,
) -> Result<(&'s RecordLayout, usize), ProtocolError> {
    let members = schema.family(family)?;
    let (raw, tag_len) = varint::read(reader, position).field(family)?;
    let tag = raw as u32;
    let record = members
        .record_for(tag)
        .ok_or_else(|| ProtocolError::UnknownPolymorphicType {
            family: family.to_string(),
            tag: tag as i64,
        })?;
    Ok((schema.record(record)?, tag_len))
}

/// Tag under which `record` is encoded within `family`.
pub fn tag_of(schema: &SchemaSet, family: &str, record: &str) -> Result<u32, ProtocolError> {
    schema
        .family(family)?
        .tag_of(record)
        .ok_or_else(|| ProtocolError::UnknownVariant {
            family: family.to_string(),
            record: record.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FamilyDef, FieldType, RecordDef};

    fn schema() -> SchemaSet {
        SchemaSet::builder()
            .record(RecordDef::new("Circle").required("radius", FieldType::Float))
            .record(RecordDef::new("Ray").required("length", FieldType::Float))
            .family(
                FamilyDef::new("Shape")
                    .variant(0, "Circle")
                    .variant(200, "Ray"),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn resolves_multi_byte_tags() {
        let schema = schema();
        let data = [0xc8, 0x01];
        let (layout, len) = resolve(&schema, "Shape", &Reader::new(&data), 0).unwrap();
        assert_eq!(layout.name, "Ray");
        assert_eq!(len, 2);
    }

    #[test]
    fn unknown_tag_names_family_and_tag() {
        let schema = schema();
        let data = [0x05];
        assert_eq!(
            resolve(&schema, "Shape", &Reader::new(&data), 0).unwrap_err(),
            ProtocolError::UnknownPolymorphicType {
                family: "Shape".into(),
                tag: 5,
            }
        );
    }

    #[test]
    fn tag_of_rejects_non_members() {
        let schema = schema();
        assert_eq!(tag_of(&schema, "Shape", "Ray").unwrap(), 200);
        assert_eq!(
            tag_of(&schema, "Shape", "Square").unwrap_err(),
            ProtocolError::UnknownVariant {
                family: "Shape".into(),
                record: "Square".into(),
            }
        );
    }
}
