//! Decoding raw payload values into handler inputs.

use bindery_core::{BindingKind, BindingValue, DecodeError, PayloadShape, RawValue};
use serde_json::{Map, Value};

/// Decode `raw` according to the payload shape of `kind`.
pub fn decode(kind: BindingKind, raw: &RawValue) -> Result<BindingValue, DecodeError> {
    match kind.payload_shape() {
        PayloadShape::Passthrough => Ok(raw.clone().into()),
        PayloadShape::CloudEvent => decode_cloud_event(raw),
        PayloadShape::JsonObject => decode_object(raw).map(|map| BindingValue::Json(Value::Object(map))),
    }
}

/// Unwrap the `data` field of a CloudEvents envelope.
///
/// Only values that start with `{` are treated as envelopes; anything else
/// is handed over unchanged.
fn decode_cloud_event(raw: &RawValue) -> Result<BindingValue, DecodeError> {
    let Some(text) = raw.as_text() else {
        return Ok(raw.clone().into());
    };
    if !text.trim_start().starts_with('{') {
        return Ok(raw.clone().into());
    }

    let mut envelope: Map<String, Value> = serde_json::from_str(text)?;
    Ok(match envelope.remove("data") {
        Some(Value::String(data)) => BindingValue::Text(data),
        Some(data) => BindingValue::Json(data),
        None => BindingValue::Json(Value::Object(envelope)),
    })
}

fn decode_object(raw: &RawValue) -> Result<Map<String, Value>, DecodeError> {
    let text = raw.as_text().ok_or(DecodeError::NotUtf8)?;
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        other => Err(DecodeError::NotAnObject {
            found: json_type(&other),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
