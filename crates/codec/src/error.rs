//! Protocol error taxonomy.

use std::fmt;

use hyproto_buffers::BufferError;
use thiserror::Error;

use crate::varint::VarIntError;

/// A failure raised by decode, encode, size computation or validation.
///
/// Every variant names the offending field (or record/family) and the bound
/// it violated, so a rejected message can be diagnosed from the error alone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("{field} has negative length {length}")]
    NegativeLength { field: String, length: i64 },
    #[error("{field} exceeds max length {max} (got {length})")]
    StringTooLong {
        field: String,
        length: usize,
        max: usize,
    },
    #[error("{field} exceeds max array length {max} (got {count})")]
    ArrayTooLong {
        field: String,
        count: usize,
        max: usize,
    },
    #[error("{field} exceeds max dictionary size {max} (got {count})")]
    DictionaryTooLarge {
        field: String,
        count: usize,
        max: usize,
    },
    #[error(
        "buffer too small for {field}: expected at least {required} bytes, {available} available"
    )]
    BufferTooSmall {
        field: String,
        required: usize,
        available: usize,
    },
    #[error("duplicate key {key} in {field}")]
    DuplicateKey { field: String, key: String },
    #[error("unknown polymorphic type ID {tag} for {family}")]
    UnknownPolymorphicType { family: String, tag: i64 },
    #[error("invalid offset {offset} for {field}")]
    InvalidOffset { field: String, offset: i32 },
    #[error(
        "offset out of bounds for {field}: position {position} is not before written extent {extent}"
    )]
    OffsetOutOfBounds {
        field: String,
        position: usize,
        extent: usize,
    },
    #[error("offset overflow for {field}")]
    OffsetOverflow { field: String },
    #[error("invalid varint for {field}: {source}")]
    InvalidVarInt {
        field: String,
        #[source]
        source: VarIntError,
    },
    #[error("{field} is not valid UTF-8")]
    InvalidUtf8 { field: String },
    #[error("{field} is not valid ASCII")]
    InvalidAscii { field: String },
    #[error("invalid {field} value {value}: enum has {count} members")]
    InvalidEnumValue { field: String, value: u8, count: u8 },
    #[error("{field} exceeds fixed width {max} (got {length})")]
    FixedStringTooLong {
        field: String,
        length: usize,
        max: usize,
    },
    #[error("{field} expected {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
    },
    #[error("{record} is missing required field {field}")]
    MissingField { record: String, field: String },
    #[error("{record} has no field named {field}")]
    UnknownField { record: String, field: String },
    #[error("unknown schema type {name}")]
    UnknownType { name: String },
    #[error("{record} is not a member of {family}")]
    UnknownVariant { family: String, record: String },
    #[error("nesting depth exceeds {max_depth}")]
    DepthExceeded { max_depth: usize },
    #[error("unknown packet {packet}")]
    UnknownPacket { packet: String },
    #[error("{name} serialized to {size} bytes, exceeds max size {max}")]
    PacketTooLarge {
        name: String,
        size: usize,
        max: usize,
    },
}

impl ProtocolError {
    pub(crate) fn buffer_too_small(field: &str, required: usize, available: usize) -> Self {
        Self::BufferTooSmall {
            field: field.to_string(),
            required,
            available,
        }
    }

    pub(crate) fn type_mismatch(field: &str, expected: &'static str) -> Self {
        Self::TypeMismatch {
            field: field.to_string(),
            expected,
        }
    }

    pub(crate) fn negative_length(field: &str, length: i32) -> Self {
        Self::NegativeLength {
            field: field.to_string(),
            length: length as i64,
        }
    }
}

/// Attaches a field name to a raw buffer read failure.
pub(crate) trait ReadContext<T> {
    fn field(self, name: &str) -> Result<T, ProtocolError>;
}

impl<T> ReadContext<T> for Result<T, BufferError> {
    fn field(self, name: &str) -> Result<T, ProtocolError> {
        self.map_err(|err| match err {
            BufferError::OutOfBounds {
                position,
                length,
                extent,
            } => ProtocolError::BufferTooSmall {
                field: name.to_string(),
                required: position.saturating_add(length),
                available: extent,
            },
            BufferError::ExtentTooLarge { extent, len } => ProtocolError::BufferTooSmall {
                field: name.to_string(),
                required: extent,
                available: len,
            },
            BufferError::PatchOutOfBounds { .. } => ProtocolError::OffsetOverflow {
                field: name.to_string(),
            },
        })
    }
}

impl<T> ReadContext<T> for Result<T, VarIntError> {
    fn field(self, name: &str) -> Result<T, ProtocolError> {
        self.map_err(|source| ProtocolError::InvalidVarInt {
            field: name.to_string(),
            source,
        })
    }
}

/// One step of the path from the validated root to a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A named field of a record.
    Field { record: String, field: String },
    /// An element of an array.
    Index(usize),
    /// The value stored under a map key.
    Key(String),
    /// The concrete member chosen by a polymorphic tag.
    Variant { family: String, record: String },
}

/// The first violation found by a structural validation walk, together with
/// where in the record tree it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    path: Vec<PathSegment>,
    cause: ProtocolError,
}

impl ValidationError {
    pub fn new(cause: ProtocolError) -> Self {
        Self {
            path: Vec::new(),
            cause,
        }
    }

    /// Prefixes the path with an enclosing segment.
    pub fn within(mut self, segment: PathSegment) -> Self {
        self.path.insert(0, segment);
        self
    }

    /// Path from the root to the failing element, outermost first.
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    pub fn cause(&self) -> &ProtocolError {
        &self.cause
    }

    pub fn into_cause(self) -> ProtocolError {
        self.cause
    }
}

impl From<ProtocolError> for ValidationError {
    fn from(cause: ProtocolError) -> Self {
        Self::new(cause)
    }
}

impl fmt::Display for ValidationError {
    /// Renders e.g. `Invalid FormattedMessage in children[2].rawText: ...`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, rest) = match self.path.split_first() {
            Some((PathSegment::Field { record, .. }, _)) => (record, &self.path[..]),
            Some((PathSegment::Variant { record, .. }, rest)) => (record, rest),
            _ => return write!(f, "{}", self.cause),
        };
        if rest.is_empty() {
            return write!(f, "Invalid {name}: {}", self.cause);
        }
        write!(f, "Invalid {name} in ")?;
        let mut first = true;
        for segment in rest {
            match segment {
                PathSegment::Field { field, .. } => {
                    if !first {
                        f.write_str(".")?;
                    }
                    f.write_str(field)?;
                }
                PathSegment::Index(i) => write!(f, "[{i}]")?,
                PathSegment::Key(key) => write!(f, "[{key}]")?,
                PathSegment::Variant { record, .. } => write!(f, "<{record}>")?,
            }
            first = false;
        }
        write!(f, ": {}", self.cause)
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_renders_path() {
        let err = ValidationError::new(ProtocolError::StringTooLong {
            field: "rawText".into(),
            length: 9,
            max: 4,
        })
        .within(PathSegment::Field {
            record: "FormattedMessage".into(),
            field: "rawText".into(),
        })
        .within(PathSegment::Index(2))
        .within(PathSegment::Field {
            record: "FormattedMessage".into(),
            field: "children".into(),
        });
        assert_eq!(
            err.to_string(),
            "Invalid FormattedMessage in children[2].rawText: rawText exceeds max length 4 (got 9)"
        );
        assert_eq!(err.path().len(), 3);
    }

    #[test]
    fn root_failure_renders_cause_only() {
        let err = ValidationError::new(ProtocolError::buffer_too_small("Ping", 29, 3));
        assert_eq!(
            err.to_string(),
            "buffer too small for Ping: expected at least 29 bytes, 3 available"
        );
    }

    #[test]
    fn buffer_errors_gain_field_context() {
        let res: Result<u8, BufferError> = Err(BufferError::OutOfBounds {
            position: 6,
            length: 4,
            extent: 8,
        });
        assert_eq!(
            res.field("port"),
            Err(ProtocolError::BufferTooSmall {
                field: "port".into(),
                required: 10,
                available: 8,
            })
        );
    }
}
