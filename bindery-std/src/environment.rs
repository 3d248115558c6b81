//! Deployment environment values used to resolve `%TOKEN%` placeholders.
//!
//! An [`Environment`] can be assembled from explicit pairs, from the process
//! environment, or from a settings document shaped like
//! `{ "Values": { "PubSubName": "messagebus" } }`. Sources are layered with
//! [`Environment::merge`]; later sources win.

use serde::Deserialize;
use serde_json::Value;
use std::{collections::BTreeMap, ffi::OsString};

/// A mapping from placeholder token name to replacement value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    values: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct SettingsDocument {
    #[serde(rename = "Values", default)]
    values: BTreeMap<String, Value>,
}

impl Environment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, returning the environment for chaining.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace a value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Capture every variable of the current process.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn from_process_env() -> Self {
        utf8_vars(std::env::vars_os()).collect()
    }

    /// Capture process variables starting with `prefix`, with the prefix stripped.
    ///
    /// `from_process_env_prefixed("APP_")` maps `APP_PubSubName` to `PubSubName`.
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn from_process_env_prefixed(prefix: &str) -> Self {
        utf8_vars(std::env::vars_os())
            .filter_map(|(name, value)| {
                name.strip_prefix(prefix)
                    .filter(|stripped| !stripped.is_empty())
                    .map(|stripped| (stripped.to_string(), value))
            })
            .collect()
    }

    /// Parse a settings document and take its `Values` section.
    ///
    /// Non-string values are rendered as their JSON text.
    pub fn from_settings_json(document: &str) -> Result<Self, serde_json::Error> {
        let settings: SettingsDocument = serde_json::from_str(document)?;
        Ok(settings
            .values
            .into_iter()
            .map(|(name, value)| match value {
                Value::String(text) => (name, text),
                other => (name, other.to_string()),
            })
            .collect())
    }

    /// Layer `other` on top of `self`; entries in `other` win.
    pub fn merge(mut self, other: Environment) -> Self {
        self.values.extend(other.values);
        self
    }

    /// Look up a value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Whether `name` is defined.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the environment is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn utf8_vars<I>(vars: I) -> impl Iterator<Item = (String, String)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(name, value)| match (name.into_string(), value.into_string()) {
            (Ok(name), Ok(value)) => Some((name, value)),
            (Ok(name), Err(_)) => {
                tracing::warn!(variable = %name, "skipping non UTF-8 environment value");
                None
            }
            (Err(name), _) => {
                tracing::warn!(variable = ?name, "skipping non UTF-8 environment variable");
                None
            }
        })
}

impl<K, V> FromIterator<(K, V)> for Environment
where
    K: Into<String>,
    V: Into<String>,
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

    #[test]
    fn settings_document_values_are_read() {
        let env = Environment::from_settings_json(
            r#"{
                "IsEncrypted": false,
                "Values": {
                    "PubSubName": "messagebus",
                    "StateStoreName": "statestore",
                    "Retries": 3
                }
            }"#,
        )
        .unwrap();
        assert_eq!(env.get("PubSubName"), Some("messagebus"));
        assert_eq!(env.get("StateStoreName"), Some("statestore"));
        assert_eq!(env.get("Retries"), Some("3"));
    }

    #[test]
    fn settings_without_values_section_is_empty() {
        let env = Environment::from_settings_json(r#"{ "IsEncrypted": false }"#).unwrap();
        assert!(env.is_empty());
    }

    #[test]
    fn malformed_settings_fail() {
        assert!(Environment::from_settings_json("{ not json").is_err());
    }

    #[test]
    fn merge_prefers_later_source() {
        let local = Environment::new()
            .with("PubSubName", "local-bus")
            .with("StateStoreName", "statestore");
        let cloud = Environment::new().with("PubSubName", "messagebus");
        let merged = local.merge(cloud);
        assert_eq!(merged.get("PubSubName"), Some("messagebus"));
        assert_eq!(merged.get("StateStoreName"), Some("statestore"));
    }

    #[test]
    fn unmatched_prefix_yields_empty_environment() {
        let env = Environment::from_process_env_prefixed("BINDERY_ENV_TEST_UNSET_PREFIX_");
        assert!(env.is_empty());
    }

    #[test]
    fn prefixed_process_env_strips_prefix() {
        // SAFETY: no other test in this crate writes the process environment.
        unsafe { std::env::set_var("BINDERY_ENV_TEST_STRIP_PubSubName", "messagebus") };

        let env = Environment::from_process_env_prefixed("BINDERY_ENV_TEST_STRIP_");
        assert_eq!(env.get("PubSubName"), Some("messagebus"));
        assert_eq!(env.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_variables_are_skipped() {
        use std::os::unix::ffi::OsStringExt;

        let vars = vec![
            (OsString::from("PubSubName"), OsString::from("messagebus")),
            (OsString::from("BadValue"), OsString::from_vec(vec![0xff, 0xfe])),
            (OsString::from_vec(vec![0xff]), OsString::from("bad-name")),
        ];
        let env: Environment = utf8_vars(vars).collect();
        assert_eq!(env.len(), 1);
        assert_eq!(env.get("PubSubName"), Some("messagebus"));
    }
}
