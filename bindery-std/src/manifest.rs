//! Declaring bindings in a YAML or JSON document.
//!
//! ```yaml
//! functions:
//!   PrintTopicMessage:
//!     - direction: trigger
//!       kind: topic-trigger
//!       name: payload
//!       options: { pubSubName: "%PubSubName%", topic: B }
//! ```
//!
//! Option values are kept verbatim, placeholders included; they are
//! resolved later when the registry is bound to an [`Environment`].
//!
//! [`Environment`]: crate::environment::Environment

use crate::registry::Registry;
use bindery_core::{
    BinderyError, BindingDescriptor, BindingKind, DescriptorBuilder, Direction, RegistryError,
    ValidationError,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Errors raised while loading a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The YAML document could not be parsed.
    #[error("invalid YAML manifest: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The JSON document could not be parsed.
    #[error("invalid JSON manifest: {0}")]
    Json(#[from] serde_json::Error),

    /// The manifest file could not be read.
    #[error("failed to read manifest `{}`: {source}", .path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A binding entry does not form a valid descriptor.
    #[error("function `{function}`: {source}")]
    Validation {
        /// Function declaring the binding.
        function: String,
        /// Underlying validation failure.
        #[source]
        source: ValidationError,
    },

    /// A descriptor was rejected by the registry.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl From<ManifestError> for BinderyError {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::Registry(err) => BinderyError::Registry(err),
            other => BinderyError::Custom(Box::new(other)),
        }
    }
}

/// One binding entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingSpec {
    /// `in`, `out` or `trigger`.
    pub direction: String,
    /// Kind tag, e.g. `topic-trigger`.
    pub kind: String,
    /// Handler variable name.
    pub name: String,
    /// Kind options.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
    /// Value used when the payload lacks this input.
    #[serde(default, rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl BindingSpec {
    /// Build and validate the descriptor this entry declares.
    pub fn to_descriptor(&self) -> Result<BindingDescriptor, ValidationError> {
        let tag_error = |source| ValidationError::UnknownTag {
            variable: self.name.clone(),
            source,
        };
        let direction = self.direction.parse::<Direction>().map_err(tag_error)?;
        let kind = self.kind.parse::<BindingKind>().map_err(tag_error)?;

        let mut builder = self
            .options
            .iter()
            .fold(DescriptorBuilder::new(direction, kind, &self.name), |b, (k, v)| {
                b.option(k, v)
            });
        if let Some(value) = &self.default_value {
            builder = builder.default_value(value.as_str());
        }
        builder.build()
    }
}

/// A binding manifest: function name to its binding entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Declared functions.
    #[serde(default)]
    pub functions: BTreeMap<String, Vec<BindingSpec>>,
}

impl Manifest {
    /// Parse a YAML manifest.
    pub fn from_yaml_str(document: &str) -> Result<Self, ManifestError> {
        Ok(serde_yaml::from_str(document)?)
    }

    /// Parse a JSON manifest.
    pub fn from_json_str(document: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(document)?)
    }

    /// Read a manifest file; `.json` files are parsed as JSON, anything else
    /// as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&document)
        } else {
            Self::from_yaml_str(&document)
        }
    }

    /// Register every binding into `registry`.
    ///
    /// Stops at the first invalid entry; entries registered before it stay
    /// in the registry.
    pub fn register_into(&self, registry: &mut Registry) -> Result<(), ManifestError> {
        for (function, specs) in &self.functions {
            for spec in specs {
                let descriptor =
                    spec.to_descriptor()
                        .map_err(|source| ManifestError::Validation {
                            function: function.clone(),
                            source,
                        })?;
                registry.register(function.as_str(), descriptor)?;
            }
        }
        tracing::debug!(functions = self.functions.len(), "manifest registered");
        Ok(())
    }

    /// Build a fresh registry from this manifest.
    pub fn into_registry(self) -> Result<Registry, ManifestError> {
        let mut registry = Registry::new();
        self.register_into(&mut registry)?;
        Ok(registry)
    }
}
