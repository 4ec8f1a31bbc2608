//! Schema-driven binary record codec.
//!
//! Every record is laid out as
//! `[nullable bitmap][fixed block][offset table][variable payload]`:
//! the bitmap flags which optional fields are present, the fixed block holds
//! fixed-width fields at known offsets, and each variable-length field gets a
//! 4-byte little-endian offset (relative to the end of the table, `-1` when
//! absent) pointing into the payload that follows.
//!
//! Record types are data, not code: a [`SchemaSet`] describes them and one
//! generic engine implements decode, byte-span measurement, encode, size
//! prediction and structural validation for all of them.

pub mod bitmap;
pub mod codec;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod options;
pub mod schema;
pub mod validator;
pub mod value;
pub mod variant;
pub mod varint;
mod walk;

pub use bitmap::NullableBitmap;
pub use codec::Codec;
pub use decoder::RecordDecoder;
pub use encoder::RecordEncoder;
pub use error::{PathSegment, ProtocolError, ValidationError};
pub use options::{CodecOptions, PROTOCOL_MAX_PAYLOAD};
pub use schema::{
    Charset, Family, FamilyDef, Field, FieldLayout, FieldType, KeyType, RecordDef, RecordLayout,
    SchemaBuilder, SchemaError, SchemaSet, Slot, DEFAULT_MAX_LENGTH,
};
pub use validator::StructureValidator;
pub use value::{MapKey, Record, Value};
pub use varint::VarIntError;

pub use hyproto_buffers::{Reader, Writer};
