use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared type of a field. For array fields this is the element type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int,
    String,
    Bool,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Int => write!(f, "int"),
            FieldType::String => write!(f, "string"),
            FieldType::Bool => write!(f, "bool"),
        }
    }
}

/// A concrete field value, as returned by `get_value` and accepted by `set_value`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    String(String),
    Bool(bool),
    IntArray(Vec<i64>),
    StringArray(Vec<String>),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Int(_) | FieldValue::IntArray(_) => FieldType::Int,
            FieldValue::String(_) | FieldValue::StringArray(_) => FieldType::String,
            FieldValue::Bool(_) => FieldType::Bool,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, FieldValue::IntArray(_) | FieldValue::StringArray(_))
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::String(v) => write!(f, "{v:?}"),
            FieldValue::Bool(v) => write!(f, "{v}"),
            FieldValue::IntArray(values) => {
                let values: Vec<String> = values.iter().map(i64::to_string).collect();
                write!(f, "[{}]", values.join(", "))
            }
            FieldValue::StringArray(values) => {
                let values: Vec<String> = values.iter().map(|v| format!("{v:?}")).collect();
                write!(f, "[{}]", values.join(", "))
            }
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// Event type a field belongs to.
///
/// Identity fields (process, container) are valid for every event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldEventType<T> {
    Any,
    Only(T),
}

impl<T: fmt::Display> fmt::Display for FieldEventType<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldEventType::Any => write!(f, "*"),
            FieldEventType::Only(event_type) => write!(f, "{event_type}"),
        }
    }
}
