//! Raw payload values and decoded binding values.

use serde_json::Value;
use std::collections::BTreeMap;

/// A value as supplied by the host for one binding variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// UTF-8 text.
    Text(String),
    /// Opaque bytes.
    Bytes(Vec<u8>),
}

impl RawValue {
    /// Borrow the value as text, decoding bytes as UTF-8 when possible.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(text) => Some(text),
            RawValue::Bytes(bytes) => std::str::from_utf8(bytes).ok(),
        }
    }

    /// Borrow the underlying bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            RawValue::Text(text) => text.as_bytes(),
            RawValue::Bytes(bytes) => bytes,
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(value: Vec<u8>) -> Self {
        RawValue::Bytes(value)
    }
}

/// A decoded value exposed to, or collected from, a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingValue {
    /// Plain text.
    Text(String),
    /// Opaque bytes.
    Bytes(Vec<u8>),
    /// Structured JSON.
    Json(Value),
}

impl BindingValue {
    /// Borrow the value as text if it is [`BindingValue::Text`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            BindingValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Borrow the value as JSON if it is [`BindingValue::Json`].
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            BindingValue::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Render the value as JSON for a sidecar request body.
    ///
    /// Text that parses as JSON is embedded structurally, anything else
    /// becomes a JSON string. Bytes are treated as lossy UTF-8 text.
    pub fn to_json(&self) -> Value {
        match self {
            BindingValue::Json(value) => value.clone(),
            BindingValue::Text(text) => text_to_json(text),
            BindingValue::Bytes(bytes) => text_to_json(&String::from_utf8_lossy(bytes)),
        }
    }
}

fn text_to_json(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

impl From<RawValue> for BindingValue {
    fn from(value: RawValue) -> Self {
        match value {
            RawValue::Text(text) => BindingValue::Text(text),
            RawValue::Bytes(bytes) => BindingValue::Bytes(bytes),
        }
    }
}

impl From<&str> for BindingValue {
    fn from(value: &str) -> Self {
        BindingValue::Text(value.to_string())
    }
}

impl From<String> for BindingValue {
    fn from(value: String) -> Self {
        BindingValue::Text(value)
    }
}

impl From<Vec<u8>> for BindingValue {
    fn from(value: Vec<u8>) -> Self {
        BindingValue::Bytes(value)
    }
}

impl From<Value> for BindingValue {
    fn from(value: Value) -> Self {
        BindingValue::Json(value)
    }
}

/// The per-invocation mapping from binding variable to raw value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPayload {
    values: BTreeMap<String, RawValue>,
}

impl RawPayload {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, returning the payload for chaining.
    pub fn with(mut self, variable: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(variable, value);
        self
    }

    /// Add or replace a value.
    pub fn insert(&mut self, variable: impl Into<String>, value: impl Into<RawValue>) {
        self.values.insert(variable.into(), value.into());
    }

    /// Look up a value by variable name.
    pub fn get(&self, variable: &str) -> Option<&RawValue> {
        self.values.get(variable)
    }

    /// Number of values in the payload.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RawPayload
where
    K: Into<String>,
    V: Into<RawValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
