//! One-stop facade over a schema set.

use hyproto_buffers::{Reader, Writer};
use tracing::debug;

use crate::decoder::RecordDecoder;
use crate::encoder::RecordEncoder;
use crate::error::{ProtocolError, ValidationError};
use crate::options::CodecOptions;
use crate::schema::SchemaSet;
use crate::validator::StructureValidator;
use crate::value::Record;
use crate::variant;

/// Owns a [`SchemaSet`] and the limits applied to it, and exposes every
/// codec operation by record or family name.
///
/// ```
/// use hyproto_codec::{Codec, FieldType, Record, RecordDef, SchemaSet};
///
/// let schema = SchemaSet::builder()
///     .record(
///         RecordDef::new("Greeting")
///             .required("id", FieldType::Int)
///             .optional("text", FieldType::string(64)),
///     )
///     .build()
///     .unwrap();
/// let codec = Codec::new(schema);
///
/// let greeting = Record::new("Greeting")
///     .with("id", hyproto_codec::Value::Int(7))
///     .with("text", "hi");
/// let bytes = codec.encode_to_vec(&greeting).unwrap();
/// assert_eq!(codec.bytes_consumed(&bytes, 0, "Greeting").unwrap(), bytes.len());
/// assert_eq!(codec.decode(&bytes, 0, "Greeting").unwrap(), greeting);
/// ```
#[derive(Debug, Clone)]
pub struct Codec {
    schema: SchemaSet,
    options: CodecOptions,
}

impl Codec {
    pub fn new(schema: SchemaSet) -> Self {
        Self::with_options(schema, CodecOptions::default())
    }

    pub fn with_options(schema: SchemaSet, options: CodecOptions) -> Self {
        Self { schema, options }
    }

    pub fn schema(&self) -> &SchemaSet {
        &self.schema
    }

    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    pub fn decoder(&self) -> RecordDecoder<'_> {
        RecordDecoder::new(&self.schema, self.options)
    }

    pub fn encoder(&self) -> RecordEncoder<'_> {
        RecordEncoder::new(&self.schema, self.options)
    }

    pub fn validator(&self) -> StructureValidator<'_> {
        StructureValidator::new(&self.schema, self.options)
    }

    // --------------------------------------------------------------- decode

    pub fn decode<'a>(
        &self,
        data: impl Into<Reader<'a>>,
        offset: usize,
        record: &str,
    ) -> Result<Record, ProtocolError> {
        self.decoder()
            .decode(&data.into(), offset, record)
            .inspect_err(|err| debug!(record, offset, error = %err, "decode rejected"))
    }

    pub fn decode_variant<'a>(
        &self,
        data: impl Into<Reader<'a>>,
        offset: usize,
        family: &str,
    ) -> Result<Record, ProtocolError> {
        self.decoder()
            .decode_variant(&data.into(), offset, family)
            .inspect_err(|err| debug!(family, offset, error = %err, "variant decode rejected"))
    }

    pub fn bytes_consumed<'a>(
        &self,
        data: impl Into<Reader<'a>>,
        offset: usize,
        record: &str,
    ) -> Result<usize, ProtocolError> {
        self.decoder().bytes_consumed(&data.into(), offset, record)
    }

    pub fn variant_bytes_consumed<'a>(
        &self,
        data: impl Into<Reader<'a>>,
        offset: usize,
        family: &str,
    ) -> Result<usize, ProtocolError> {
        self.decoder()
            .variant_bytes_consumed(&data.into(), offset, family)
    }

    // ------------------------------------------------------------- validate

    pub fn validate<'a>(
        &self,
        data: impl Into<Reader<'a>>,
        offset: usize,
        record: &str,
    ) -> Result<(), ValidationError> {
        self.validator()
            .validate(&data.into(), offset, record)
            .inspect_err(|err| debug!(record, offset, error = %err, "validation failed"))
    }

    pub fn validate_variant<'a>(
        &self,
        data: impl Into<Reader<'a>>,
        offset: usize,
        family: &str,
    ) -> Result<(), ValidationError> {
        self.validator()
            .validate_variant(&data.into(), offset, family)
            .inspect_err(|err| debug!(family, offset, error = %err, "variant validation failed"))
    }

    // --------------------------------------------------------------- encode

    pub fn encode(&self, writer: &mut Writer, record: &Record) -> Result<usize, ProtocolError> {
        self.encoder().encode(writer, record)
    }

    pub fn encode_with_tag(
        &self,
        writer: &mut Writer,
        family: &str,
        record: &Record,
    ) -> Result<usize, ProtocolError> {
        self.encoder().encode_with_tag(writer, family, record)
    }

    pub fn encode_to_vec(&self, record: &Record) -> Result<Vec<u8>, ProtocolError> {
        self.encoder().encode_to_vec(record)
    }

    pub fn compute_size(&self, record: &Record) -> Result<usize, ProtocolError> {
        self.encoder().compute_size(record)
    }

    pub fn compute_size_with_tag(
        &self,
        family: &str,
        record: &Record,
    ) -> Result<usize, ProtocolError> {
        self.encoder().compute_size_with_tag(family, record)
    }

    /// Tag `record` is written under within `family`.
    pub fn tag_of(&self, family: &str, record: &Record) -> Result<u32, ProtocolError> {
        variant::tag_of(&self.schema, family, &record.name)
    }
}
