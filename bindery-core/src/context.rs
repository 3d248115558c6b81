//! # Invocation Context
//!
//! The values a handler reads ([`Inputs`]) and writes ([`Outputs`]) during a
//! single invocation. Inputs are assembled by the dispatcher from the raw
//! payload; outputs start empty and are staged by the dispatcher after the
//! handler returns.
//!
//! Typed extraction goes through [`Inputs::json`], which deserializes a
//! text or JSON input into any `DeserializeOwned` type:
//!
//! ```rust,ignore
//! #[derive(Deserialize)]
//! struct Order { order_id: String }
//!
//! let order: Order = inputs.json("payload")?;
//! ```

use crate::{error::ExtractError, value::BindingValue};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, btree_map};

/// Decoded input values, keyed by binding variable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inputs {
    values: BTreeMap<String, BindingValue>,
}

impl Inputs {
    /// Create an empty input mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an input.
    pub fn insert(&mut self, variable: impl Into<String>, value: impl Into<BindingValue>) {
        self.values.insert(variable.into(), value.into());
    }

    /// Look up an input by variable name.
    pub fn get(&self, variable: &str) -> Option<&BindingValue> {
        self.values.get(variable)
    }

    /// Look up a text input.
    pub fn text(&self, variable: &str) -> Option<&str> {
        self.get(variable).and_then(BindingValue::as_str)
    }

    /// Deserialize an input into `T`.
    ///
    /// Text and bytes are parsed as JSON; JSON inputs are converted directly.
    pub fn json<T: DeserializeOwned>(&self, variable: &str) -> Result<T, ExtractError> {
        let value = self
            .get(variable)
            .ok_or_else(|| ExtractError::Missing(variable.to_string()))?;
        let parsed = match value {
            BindingValue::Json(json) => T::deserialize(json),
            BindingValue::Text(text) => serde_json::from_str(text),
            BindingValue::Bytes(bytes) => serde_json::from_slice(bytes),
        };
        parsed.map_err(|source| ExtractError::Deserialize {
            variable: variable.to_string(),
            source,
        })
    }

    /// Iterate over all inputs in variable order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, BindingValue> {
        self.values.iter()
    }

    /// Number of inputs.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no inputs.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Inputs
where
    K: Into<String>,
    V: Into<BindingValue>,
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

impl<'a> IntoIterator for &'a Inputs {
    type Item = (&'a String, &'a BindingValue);
    type IntoIter = btree_map::Iter<'a, String, BindingValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Values set by a handler, keyed by binding variable.
///
/// Setting the same variable twice keeps the last value. Names that are not
/// declared as outputs of the function are dropped by the dispatcher.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outputs {
    values: BTreeMap<String, BindingValue>,
}

impl Outputs {
    /// Create an empty output mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an output value.
    pub fn set(&mut self, variable: impl Into<String>, value: impl Into<BindingValue>) {
        self.values.insert(variable.into(), value.into());
    }

    /// Look up an output by variable name.
    pub fn get(&self, variable: &str) -> Option<&BindingValue> {
        self.values.get(variable)
    }

    /// Remove and return an output.
    pub fn take(&mut self, variable: &str) -> Option<BindingValue> {
        self.values.remove(variable)
    }

    /// Iterate over all outputs in variable order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, BindingValue> {
        self.values.iter()
    }

    /// Number of outputs set.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no outputs were set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume the mapping.
    pub fn into_inner(self) -> BTreeMap<String, BindingValue> {
        self.values
    }
}

impl<K, V> FromIterator<(K, V)> for Outputs
where
    K: Into<String>,
    V: Into<BindingValue>,
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Order {
        #[serde(rename = "orderId")]
        order_id: String,
    }

    #[test]
    fn json_extracts_from_text() {
        let inputs: Inputs = [("payload", r#"{"orderId":"41"}"#)].into_iter().collect();
        let order: Order = inputs.json("payload").unwrap();
        assert_eq!(order.order_id, "41");
    }

    #[test]
    fn json_extracts_from_json_value() {
        let mut inputs = Inputs::new();
        inputs.insert("payload", json!({ "orderId": "42" }));
        let order: Order = inputs.json("payload").unwrap();
        assert_eq!(order.order_id, "42");
    }

    #[test]
    fn json_reports_missing_input() {
        let inputs = Inputs::new();
        let err = inputs.json::<Order>("payload").unwrap_err();
        assert!(matches!(err, ExtractError::Missing(ref name) if name == "payload"));
    }

    #[test]
    fn outputs_keep_last_value() {
        let mut outputs = Outputs::new();
        outputs.set("product", "first");
        outputs.set("product", "second");
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs.get("product").and_then(BindingValue::as_str), Some("second"));
    }
}
