//! Rich chat messages and their parameter values.

use hyproto_codec::{
    FamilyDef, FieldType, KeyType, MapKey, Record, RecordDef, SchemaBuilder, Value,
    DEFAULT_MAX_LENGTH, PROTOCOL_MAX_PAYLOAD,
};

use crate::enums::MaybeBool;

pub const FORMATTED_MESSAGE: &str = "FormattedMessage";
pub const PARAM_VALUE: &str = "ParamValue";

pub const STRING_PARAM: &str = "StringParamValue";
pub const BOOL_PARAM: &str = "BoolParamValue";
pub const DOUBLE_PARAM: &str = "DoubleParamValue";
pub const INT_PARAM: &str = "IntParamValue";
pub const LONG_PARAM: &str = "LongParamValue";

pub(crate) fn declare(builder: SchemaBuilder) -> SchemaBuilder {
    let maybe = || FieldType::enumeration(MaybeBool::NAME);
    let string = || FieldType::string(DEFAULT_MAX_LENGTH);
    let message = || FieldType::record(FORMATTED_MESSAGE);
    let by_name = |value| FieldType::map(KeyType::string(), value, DEFAULT_MAX_LENGTH);
    builder
        .record(RecordDef::new(STRING_PARAM).optional("value", string()))
        .record(RecordDef::new(BOOL_PARAM).required("value", FieldType::Bool))
        .record(RecordDef::new(DOUBLE_PARAM).required("value", FieldType::Double))
        .record(RecordDef::new(INT_PARAM).required("value", FieldType::Int))
        .record(RecordDef::new(LONG_PARAM).required("value", FieldType::Long))
        .family(
            FamilyDef::new(PARAM_VALUE)
                .variant(0, STRING_PARAM)
                .variant(1, BOOL_PARAM)
                .variant(2, DOUBLE_PARAM)
                .variant(3, INT_PARAM)
                .variant(4, LONG_PARAM),
        )
        // A message is a tree: children and named sub-messages are
        // themselves formatted messages.
        .record(
            RecordDef::new(FORMATTED_MESSAGE)
                .optional("rawText", string())
                .optional("messageId", string())
                .optional("children", FieldType::array(message(), DEFAULT_MAX_LENGTH))
                .optional("params", by_name(FieldType::variant(PARAM_VALUE)))
                .optional("messageParams", by_name(message()))
                .optional("color", string())
                .required("bold", maybe())
                .required("italic", maybe())
                .required("monospace", maybe())
                .required("underlined", maybe())
                .optional("link", string())
                .required("markupEnabled", FieldType::Bool)
                .max_size(PROTOCOL_MAX_PAYLOAD),
        )
}

/// A plain-text message with every style inherited.
pub fn text(raw: impl Into<String>) -> Record {
    Record::new(FORMATTED_MESSAGE)
        .with("rawText", raw.into())
        .with("bold", MaybeBool::Null)
        .with("italic", MaybeBool::Null)
        .with("monospace", MaybeBool::Null)
        .with("underlined", MaybeBool::Null)
        .with("markupEnabled", Value::Bool(false))
}

/// A message resolved client-side from a translation key.
pub fn translation(message_id: impl Into<String>) -> Record {
    let mut message = text("");
    message.clear("rawText");
    message.with("messageId", message_id.into())
}

/// Appends `child` to the message's children.
pub fn push_child(message: &mut Record, child: Record) {
    match message.fields.get_mut("children") {
        Some(Value::Array(children)) => children.push(child.into()),
        _ => message.set("children", Value::Array(vec![child.into()])),
    }
}

/// Sets parameter `key` of the message, replacing any previous value.
pub fn set_param(message: &mut Record, key: impl Into<String>, value: ParamValue) {
    let key = MapKey::Str(key.into());
    let value = Value::Record(value.into_record());
    match message.fields.get_mut("params") {
        Some(Value::Map(entries)) => match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => entries.push((key, value)),
        },
        _ => message.set("params", Value::Map(vec![(key, value)])),
    }
}

/// Typed view of the `ParamValue` family members.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(Option<String>),
    Bool(bool),
    Double(f64),
    Int(i32),
    Long(i64),
}

impl ParamValue {
    pub fn into_record(self) -> Record {
        match self {
            ParamValue::String(Some(s)) => Record::new(STRING_PARAM).with("value", s),
            ParamValue::String(None) => Record::new(STRING_PARAM),
            ParamValue::Bool(v) => Record::new(BOOL_PARAM).with("value", Value::Bool(v)),
            ParamValue::Double(v) => Record::new(DOUBLE_PARAM).with("value", Value::Double(v)),
            ParamValue::Int(v) => Record::new(INT_PARAM).with("value", Value::Int(v)),
            ParamValue::Long(v) => Record::new(LONG_PARAM).with("value", Value::Long(v)),
        }
    }

    /// Reads a decoded family member back; `None` for any other record.
    pub fn from_record(record: &Record) -> Option<Self> {
        let value = record.get("value");
        let param = match (record.name.as_str(), value) {
            (STRING_PARAM, Some(Value::Str(s))) => ParamValue::String(Some(s.clone())),
            (STRING_PARAM, None) => ParamValue::String(None),
            (BOOL_PARAM, Some(Value::Bool(v))) => ParamValue::Bool(*v),
            (DOUBLE_PARAM, Some(Value::Double(v))) => ParamValue::Double(*v),
            (INT_PARAM, Some(Value::Int(v))) => ParamValue::Int(*v),
            (LONG_PARAM, Some(Value::Long(v))) => ParamValue::Long(*v),
            _ => return None,
        };
        Some(param)
    }
}
