//! Declarative record schemas and their computed wire layouts.
//!
//! A schema set is built once from [`RecordDef`], [`FamilyDef`] and enum
//! declarations. [`SchemaBuilder::build`] checks the set for consistency and
//! derives every record's byte layout: nullable-bit indices, fixed-block
//! offsets, offset-table slots, `fixed_block_size` (bitmap included) and
//! `variable_block_start`.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::bitmap::NullableBitmap;
use crate::error::ProtocolError;

/// Default cap for strings, arrays and maps when a field names no tighter one.
pub const DEFAULT_MAX_LENGTH: usize = 4_096_000;

/// Character set of a length-prefixed string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    Ascii,
}

/// Kinds usable as map keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyType {
    Str { max: usize, charset: Charset },
    Byte,
    Enum(String),
    Int,
    Long,
    Float,
}

impl KeyType {
    pub fn string() -> Self {
        Self::Str {
            max: DEFAULT_MAX_LENGTH,
            charset: Charset::Utf8,
        }
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        Self::Enum(name.into())
    }

    /// Encoded width of a fixed-size key, `None` for string keys.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            Self::Str { .. } => None,
            Self::Byte | Self::Enum(_) => Some(1),
            Self::Int | Self::Float => Some(4),
            Self::Long => Some(8),
        }
    }
}

/// The wire kind of one field, array element or map value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Uuid,
    /// One byte holding a member index of the named enum.
    Enum(String),
    /// Zero-padded ASCII of exactly this many bytes.
    FixedAscii(usize),
    /// A fixed-size record inlined into the fixed block.
    Struct(String),
    String { max: usize, charset: Charset },
    Bytes { max: usize },
    Array { element: Box<FieldType>, max: usize },
    Map {
        key: KeyType,
        value: Box<FieldType>,
        max: usize,
    },
    /// A nested record stored in the variable block.
    Record(String),
    /// A tagged member of the named polymorphic family.
    Variant(String),
}

impl FieldType {
    pub fn string(max: usize) -> Self {
        Self::String {
            max,
            charset: Charset::Utf8,
        }
    }

    pub fn ascii(max: usize) -> Self {
        Self::String {
            max,
            charset: Charset::Ascii,
        }
    }

    pub fn bytes(max: usize) -> Self {
        Self::Bytes { max }
    }

    pub fn array(element: FieldType, max: usize) -> Self {
        Self::Array {
            element: Box::new(element),
            max,
        }
    }

    pub fn map(key: KeyType, value: FieldType, max: usize) -> Self {
        Self::Map {
            key,
            value: Box::new(value),
            max,
        }
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        Self::Enum(name.into())
    }

    pub fn inline(name: impl Into<String>) -> Self {
        Self::Struct(name.into())
    }

    pub fn record(name: impl Into<String>) -> Self {
        Self::Record(name.into())
    }

    pub fn variant(family: impl Into<String>) -> Self {
        Self::Variant(family.into())
    }

    /// Short human-readable kind, used in type-mismatch diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Uuid => "uuid",
            Self::Enum(_) => "enum",
            Self::FixedAscii(_) => "fixed ascii string",
            Self::Struct(_) => "inline record",
            Self::String { .. } => "string",
            Self::Bytes { .. } => "bytes",
            Self::Array { .. } => "array",
            Self::Map { .. } => "map",
            Self::Record(_) => "record",
            Self::Variant(_) => "polymorphic record",
        }
    }
}

/// A declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
    pub nullable: bool,
}

/// A record declaration. Fields keep their declaration order, which fixes
/// both fixed-block offsets and offset-table slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDef {
    pub name: String,
    pub base: Option<String>,
    pub fields: Vec<Field>,
    pub max_size: Option<usize>,
}

impl RecordDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            fields: Vec::new(),
            max_size: None,
        }
    }

    /// Embeds every field of `base` ahead of this record's own fields.
    pub fn extends(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn required(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(Field {
            name: name.into(),
            ty,
            nullable: false,
        });
        self
    }

    pub fn optional(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(Field {
            name: name.into(),
            ty,
            nullable: true,
        });
        self
    }

    /// Declared upper bound on one encoded instance.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }
}

/// A closed polymorphic family: each member record is reached through one
/// stable tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyDef {
    pub name: String,
    pub variants: Vec<(u32, String)>,
}

impl FamilyDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variants: Vec::new(),
        }
    }

    pub fn variant(mut self, tag: u32, record: impl Into<String>) -> Self {
        self.variants.push((tag, record.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("duplicate record {0}")]
    DuplicateRecord(String),
    #[error("duplicate enum {0}")]
    DuplicateEnum(String),
    #[error("duplicate family {0}")]
    DuplicateFamily(String),
    #[error("enum {0} has no members")]
    EmptyEnum(String),
    #[error("family {0} has no members")]
    EmptyFamily(String),
    #[error("{record} declares a field with an empty name")]
    EmptyFieldName { record: String },
    #[error("{record} declares field {field} more than once")]
    DuplicateField { record: String, field: String },
    #[error("{record} extends unknown record {base}")]
    UnknownBase { record: String, base: String },
    #[error("{record} extends itself through its base chain")]
    InheritanceCycle { record: String },
    #[error("{record}.{field} references unknown record {name}")]
    UnknownRecord {
        record: String,
        field: String,
        name: String,
    },
    #[error("{record}.{field} references unknown enum {name}")]
    UnknownEnum {
        record: String,
        field: String,
        name: String,
    },
    #[error("{record}.{field} references unknown family {name}")]
    UnknownFamily {
        record: String,
        field: String,
        name: String,
    },
    #[error("{record}.{field} inlines {target}, which has variable-length fields")]
    NotFixedSize {
        record: String,
        field: String,
        target: String,
    },
    #[error("inline record {0} contains itself")]
    RecursiveStruct(String),
    #[error("family {family} member {record} is not a declared record")]
    UnknownMember { family: String, record: String },
    #[error("family {family} uses tag {tag} more than once")]
    DuplicateTag { family: String, tag: u32 },
    #[error("family {family} lists {record} more than once")]
    DuplicateMember { family: String, record: String },
}

/// Where a field lives in the encoded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// At `offset` bytes from the record start, `size` bytes wide.
    Fixed { offset: usize, size: usize },
    /// Through offset-table entry `index`.
    Variable { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: String,
    pub ty: FieldType,
    pub nullable: bool,
    /// Index into the nullable bitmap, `Some` exactly when `nullable`.
    pub bit: Option<usize>,
    pub slot: Slot,
}

/// Computed byte layout of one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    pub name: String,
    pub fields: Vec<FieldLayout>,
    pub nullable_bit_field_size: usize,
    /// Bitmap plus fixed-width fields.
    pub fixed_block_size: usize,
    pub variable_field_count: usize,
    /// `fixed_block_size + 4 * variable_field_count`.
    pub variable_block_start: usize,
    pub max_size: Option<usize>,
}

impl RecordLayout {
    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// True when every field lives in the fixed block.
    pub fn is_fixed_size(&self) -> bool {
        self.variable_field_count == 0
    }

    /// Offset of offset-table entry `index` from the record start.
    pub fn slot_position(&self, index: usize) -> usize {
        self.fixed_block_size + 4 * index
    }
}

/// A built polymorphic family with tag lookups in both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Family {
    pub name: String,
    by_tag: BTreeMap<u32, String>,
    by_record: BTreeMap<String, u32>,
}

impl Family {
    /// Tag assigned to `record`, if it belongs to the family.
    pub fn tag_of(&self, record: &str) -> Option<u32> {
        self.by_record.get(record).copied()
    }

    /// Member record reached through `tag`.
    pub fn record_for(&self, tag: u32) -> Option<&str> {
        self.by_tag.get(&tag).map(String::as_str)
    }

    /// `(tag, record)` pairs in tag order.
    pub fn members(&self) -> impl Iterator<Item = (u32, &str)> {
        self.by_tag.iter().map(|(tag, name)| (*tag, name.as_str()))
    }
}

/// A validated, immutable set of record layouts, enums and families.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSet {
    enums: BTreeMap<String, u8>,
    records: BTreeMap<String, RecordLayout>,
    families: BTreeMap<String, Family>,
}

impl SchemaSet {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn record(&self, name: &str) -> Result<&RecordLayout, ProtocolError> {
        self.records
            .get(name)
            .ok_or_else(|| ProtocolError::UnknownType {
                name: name.to_string(),
            })
    }

    pub fn family(&self, name: &str) -> Result<&Family, ProtocolError> {
        self.families
            .get(name)
            .ok_or_else(|| ProtocolError::UnknownType {
                name: name.to_string(),
            })
    }

    /// Number of members of the named enum.
    pub fn enum_count(&self, name: &str) -> Result<u8, ProtocolError> {
        self.enums
            .get(name)
            .copied()
            .ok_or_else(|| ProtocolError::UnknownType {
                name: name.to_string(),
            })
    }

    pub fn records(&self) -> impl Iterator<Item = &RecordLayout> {
        self.records.values()
    }

    pub fn families(&self) -> impl Iterator<Item = &Family> {
        self.families.values()
    }

    /// Encoded width of a fixed-size kind, `None` for variable kinds.
    pub fn fixed_size(&self, ty: &FieldType) -> Option<usize> {
        match ty {
            FieldType::Struct(name) => self.records.get(name).map(|r| r.fixed_block_size),
            other => primitive_size(other),
        }
    }
}

fn primitive_size(ty: &FieldType) -> Option<usize> {
    match ty {
        FieldType::Bool | FieldType::Byte | FieldType::Enum(_) => Some(1),
        FieldType::Short => Some(2),
        FieldType::Int | FieldType::Float => Some(4),
        FieldType::Long | FieldType::Double => Some(8),
        FieldType::Uuid => Some(16),
        FieldType::FixedAscii(len) => Some(*len),
        _ => None,
    }
}

/// Collects declarations and produces a [`SchemaSet`].
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    enums: Vec<(String, u8)>,
    records: Vec<RecordDef>,
    families: Vec<FamilyDef>,
}

impl SchemaBuilder {
    /// Declares an enum with `count` members, encoded as indices `0..count`.
    pub fn enumeration(mut self, name: impl Into<String>, count: u8) -> Self {
        self.enums.push((name.into(), count));
        self
    }

    pub fn record(mut self, def: RecordDef) -> Self {
        self.records.push(def);
        self
    }

    pub fn family(mut self, def: FamilyDef) -> Self {
        self.families.push(def);
        self
    }

    pub fn build(self) -> Result<SchemaSet, SchemaError> {
        let mut enums = BTreeMap::new();
        for (name, count) in &self.enums {
            if *count == 0 {
                return Err(SchemaError::EmptyEnum(name.clone()));
            }
            if enums.insert(name.clone(), *count).is_some() {
                return Err(SchemaError::DuplicateEnum(name.clone()));
            }
        }

        let mut defs: BTreeMap<&str, &RecordDef> = BTreeMap::new();
        for def in &self.records {
            if defs.insert(def.name.as_str(), def).is_some() {
                return Err(SchemaError::DuplicateRecord(def.name.clone()));
            }
        }

        let mut family_names = BTreeSet::new();
        for family in &self.families {
            if !family_names.insert(family.name.as_str()) {
                return Err(SchemaError::DuplicateFamily(family.name.clone()));
            }
        }

        let mut flattened: BTreeMap<String, Vec<Field>> = BTreeMap::new();
        for def in &self.records {
            let fields = flatten(def, &defs)?;
            let mut seen = BTreeSet::new();
            for field in &fields {
                if field.name.is_empty() {
                    return Err(SchemaError::EmptyFieldName {
                        record: def.name.clone(),
                    });
                }
                if !seen.insert(field.name.as_str()) {
                    return Err(SchemaError::DuplicateField {
                        record: def.name.clone(),
                        field: field.name.clone(),
                    });
                }
                check_refs(
                    &def.name,
                    &field.name,
                    &field.ty,
                    &defs,
                    &enums,
                    &family_names,
                )?;
            }
            flattened.insert(def.name.clone(), fields);
        }

        let mut families = BTreeMap::new();
        for def in &self.families {
            families.insert(def.name.clone(), build_family(def, &defs)?);
        }

        let mut records = BTreeMap::new();
        let mut visiting = BTreeSet::new();
        for def in &self.records {
            compute_layout(&def.name, &flattened, &defs, &mut records, &mut visiting)?;
        }

        Ok(SchemaSet {
            enums,
            records,
            families,
        })
    }
}

fn flatten(
    def: &RecordDef,
    defs: &BTreeMap<&str, &RecordDef>,
) -> Result<Vec<Field>, SchemaError> {
    let mut chain = vec![def];
    let mut current = def;
    while let Some(base) = &current.base {
        let next = defs
            .get(base.as_str())
            .ok_or_else(|| SchemaError::UnknownBase {
                record: current.name.clone(),
                base: base.clone(),
            })?;
        if chain.iter().any(|d| d.name == next.name) {
            return Err(SchemaError::InheritanceCycle {
                record: def.name.clone(),
            });
        }
        chain.push(next);
        current = next;
    }
    Ok(chain
        .iter()
        .rev()
        .flat_map(|d| d.fields.iter().cloned())
        .collect())
}

fn check_refs(
    record: &str,
    field: &str,
    ty: &FieldType,
    defs: &BTreeMap<&str, &RecordDef>,
    enums: &BTreeMap<String, u8>,
    families: &BTreeSet<&str>,
) -> Result<(), SchemaError> {
    let unknown_enum = |name: &str| SchemaError::UnknownEnum {
        record: record.to_string(),
        field: field.to_string(),
        name: name.to_string(),
    };
    match ty {
        FieldType::Enum(name) if !enums.contains_key(name) => Err(unknown_enum(name.as_str())),
        FieldType::Struct(name) | FieldType::Record(name) if !defs.contains_key(name.as_str()) => {
            Err(SchemaError::UnknownRecord {
                record: record.to_string(),
                field: field.to_string(),
                name: name.clone(),
            })
        }
        FieldType::Variant(name) if !families.contains(name.as_str()) => {
            Err(SchemaError::UnknownFamily {
                record: record.to_string(),
                field: field.to_string(),
                name: name.clone(),
            })
        }
        FieldType::Array { element, .. } => {
            check_refs(record, field, element, defs, enums, families)
        }
        FieldType::Map { key, value, .. } => {
            if let KeyType::Enum(name) = key {
                if !enums.contains_key(name) {
                    return Err(unknown_enum(name.as_str()));
                }
            }
            check_refs(record, field, value, defs, enums, families)
        }
        _ => Ok(()),
    }
}

fn build_family(
    def: &FamilyDef,
    defs: &BTreeMap<&str, &RecordDef>,
) -> Result<Family, SchemaError> {
    if def.variants.is_empty() {
        return Err(SchemaError::EmptyFamily(def.name.clone()));
    }
    let mut by_tag = BTreeMap::new();
    let mut by_record = BTreeMap::new();
    for (tag, record) in &def.variants {
        if !defs.contains_key(record.as_str()) {
            return Err(SchemaError::UnknownMember {
                family: def.name.clone(),
                record: record.clone(),
            });
        }
        if by_tag.insert(*tag, record.clone()).is_some() {
            return Err(SchemaError::DuplicateTag {
                family: def.name.clone(),
                tag: *tag,
            });
        }
        if by_record.insert(record.clone(), *tag).is_some() {
            return Err(SchemaError::DuplicateMember {
                family: def.name.clone(),
                record: record.clone(),
            });
        }
    }
    Ok(Family {
        name: def.name.clone(),
        by_tag,
        by_record,
    })
}

fn inline_targets<'a>(ty: &'a FieldType, out: &mut Vec<&'a str>) {
    match ty {
        FieldType::Struct(name) => out.push(name),
        FieldType::Array { element, .. } => inline_targets(element, out),
        FieldType::Map { value, .. } => inline_targets(value, out),
        _ => {}
    }
}

fn compute_layout(
    name: &str,
    flattened: &BTreeMap<String, Vec<Field>>,
    defs: &BTreeMap<&str, &RecordDef>,
    done: &mut BTreeMap<String, RecordLayout>,
    visiting: &mut BTreeSet<String>,
) -> Result<(), SchemaError> {
    if done.contains_key(name) {
        return Ok(());
    }
    if !visiting.insert(name.to_string()) {
        return Err(SchemaError::RecursiveStruct(name.to_string()));
    }
    let Some(fields) = flattened.get(name) else {
        return Err(SchemaError::UnknownRecord {
            record: name.to_string(),
            field: String::new(),
            name: name.to_string(),
        });
    };

    for field in fields {
        let mut targets = Vec::new();
        inline_targets(&field.ty, &mut targets);
        for target in targets {
            compute_layout(target, flattened, defs, done, visiting)?;
            if done.get(target).is_some_and(|t| !t.is_fixed_size()) {
                return Err(SchemaError::NotFixedSize {
                    record: name.to_string(),
                    field: field.name.clone(),
                    target: target.to_string(),
                });
            }
        }
    }

    let nullable_count = fields.iter().filter(|f| f.nullable).count();
    let nullable_bit_field_size = NullableBitmap::byte_len(nullable_count);
    let mut offset = nullable_bit_field_size;
    let mut next_bit = 0;
    let mut next_slot = 0;
    let mut layouts = Vec::with_capacity(fields.len());
    for field in fields {
        let bit = field.nullable.then(|| {
            next_bit += 1;
            next_bit - 1
        });
        let size = match &field.ty {
            FieldType::Struct(target) => done.get(target).map(|t| t.fixed_block_size),
            other => primitive_size(other),
        };
        let slot = match size {
            Some(size) => {
                let slot = Slot::Fixed { offset, size };
                offset += size;
                slot
            }
            None => {
                next_slot += 1;
                Slot::Variable {
                    index: next_slot - 1,
                }
            }
        };
        layouts.push(FieldLayout {
            name: field.name.clone(),
            ty: field.ty.clone(),
            nullable: field.nullable,
            bit,
            slot,
        });
    }

    let max_size = defs.get(name).and_then(|d| d.max_size);
    visiting.remove(name);
    done.insert(
        name.to_string(),
        RecordLayout {
            name: name.to_string(),
            fields: layouts,
            nullable_bit_field_size,
            fixed_block_size: offset,
            variable_field_count: next_slot,
            variable_block_start: offset + 4 * next_slot,
            max_size,
        },
    );
    Ok(())
}
