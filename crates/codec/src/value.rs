//! Dynamic record values.

use std::collections::BTreeMap;
use std::fmt;

/// A decoded (or to-be-encoded) field value.
///
/// Members of a polymorphic family are plain [`Value::Record`]s: the
/// record's name selects the tag.
///
/// Floats compare by bit pattern, so a NaN equals the same NaN and `0.0`
/// differs from `-0.0`. The wire keeps every bit, and a decoded value
/// therefore always equals the value that was encoded.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Uuid(u128),
    /// Member index of an enum.
    Enum(u8),
    Str(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    /// Entries in wire order.
    Map(Vec<(MapKey, Value)>),
    Record(Record),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Short(a), Self::Short(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::Uuid(a), Self::Uuid(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Record(a), Self::Record(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

/// A map key. Floats are held as their bit pattern so keys stay `Eq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapKey {
    Str(String),
    Byte(i8),
    Enum(u8),
    Int(i32),
    Long(i64),
    Float(u32),
}

impl MapKey {
    pub fn float(value: f32) -> Self {
        Self::Float(value.to_bits())
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Byte(v) => write!(f, "{v}"),
            Self::Enum(v) => write!(f, "#{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Float(bits) => write!(f, "{}", f32::from_bits(*bits)),
        }
    }
}

/// A record instance. A field missing from `fields` is absent on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: String,
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style [`Record::set`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Removes a field, making it absent.
    pub fn clear(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn is_present(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_fields_are_missing_keys() {
        let mut rec = Record::new("Msg")
            .with("text", "ok")
            .with("n", Value::Int(0));
        assert!(rec.is_present("n"));
        assert_eq!(rec.get("n"), Some(&Value::Int(0)));
        assert_eq!(rec.clear("text"), Some(Value::Str("ok".into())));
        assert!(!rec.is_present("text"));
    }

    #[test]
    fn float_values_compare_by_bits() {
        let cases = [
            (Value::Float(f32::NAN), Value::Float(f32::NAN), true),
            (Value::Double(f64::NAN), Value::Double(f64::NAN), true),
            (Value::Float(0.0), Value::Float(-0.0), false),
            (Value::Double(0.0), Value::Double(-0.0), false),
            (Value::Double(1.25), Value::Double(1.25), true),
            (Value::Float(1.0), Value::Double(1.0), false),
        ];
        for (left, right, equal) in cases {
            assert_eq!(left == right, equal, "{left:?} vs {right:?}");
        }
        let nested = Record::new("Point").with("x", Value::Float(f32::NAN));
        assert_eq!(nested.clone(), nested);
    }

    #[test]
    fn float_keys_compare_by_bits() {
        assert_eq!(MapKey::float(1.5), MapKey::float(1.5));
        assert_ne!(MapKey::float(0.0), MapKey::float(-0.0));
        assert_eq!(MapKey::float(0.25).to_string(), "0.25");
    }
}
