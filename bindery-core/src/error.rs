//! Error types for Bindery.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`BinderyError`] - Top-level error type
//! - [`ValidationError`] - Malformed descriptors, raised at construction
//! - [`RegistryError`] - Registration, resolution and finalization failures
//! - [`DispatchError`] - Failures of a single invocation
//!
//! Registry errors are fatal to a deployment and must surface before any
//! invocation is served. Dispatch errors only affect the invocation that
//! raised them.

use crate::{
    descriptor::Direction,
    kind::{BindingKind, UnknownTag},
};
use std::fmt;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all Bindery operations.
#[derive(Error, Debug)]
pub enum BinderyError {
    /// A descriptor could not be constructed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Registration, resolution or finalization failed.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// An invocation failed.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// A custom error occurred.
    #[error(transparent)]
    Custom(BoxError),
}

impl From<BoxError> for BinderyError {
    fn from(err: BoxError) -> Self {
        BinderyError::Custom(err)
    }
}

/// A descriptor was declared with an invalid shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The binding variable name is empty.
    #[error("binding variable name must not be empty")]
    EmptyVariable,

    /// A direction or kind tag was not recognised.
    #[error("binding `{variable}`: {source}")]
    UnknownTag {
        /// The offending binding variable.
        variable: String,
        /// The rejected tag.
        #[source]
        source: UnknownTag,
    },

    /// The kind does not support the declared direction.
    #[error("binding `{variable}`: kind `{kind}` cannot be used as `{direction}`")]
    UnsupportedDirection {
        /// The offending binding variable.
        variable: String,
        /// The declared kind.
        kind: BindingKind,
        /// The declared direction.
        direction: Direction,
    },

    /// An option key is not part of the kind's option table.
    #[error("binding `{variable}`: option `{option}` is not recognised for `{kind}`")]
    UnknownOption {
        /// The offending binding variable.
        variable: String,
        /// The declared kind.
        kind: BindingKind,
        /// The unrecognised key.
        option: String,
    },

    /// A required option without a default is absent.
    #[error("binding `{variable}`: required option `{option}` is missing")]
    MissingOption {
        /// The offending binding variable.
        variable: String,
        /// The missing key.
        option: &'static str,
    },

    /// An output binding declared a default input value.
    #[error("binding `{variable}`: output bindings cannot declare a default value")]
    OutputDefault {
        /// The offending binding variable.
        variable: String,
    },

    /// A secret-store metadata string is not a `key=value&...` list.
    #[error("binding `{variable}`: malformed metadata `{metadata}`: {reason}")]
    MalformedMetadata {
        /// The offending binding variable.
        variable: String,
        /// The metadata string as declared (or resolved).
        metadata: String,
        /// What is wrong with it.
        reason: &'static str,
    },
}

impl ValidationError {
    /// The binding variable the error refers to, if any.
    pub fn variable(&self) -> Option<&str> {
        match self {
            ValidationError::EmptyVariable => None,
            ValidationError::UnknownTag { variable, .. }
            | ValidationError::UnsupportedDirection { variable, .. }
            | ValidationError::UnknownOption { variable, .. }
            | ValidationError::MissingOption { variable, .. }
            | ValidationError::OutputDefault { variable }
            | ValidationError::MalformedMetadata { variable, .. } => Some(variable),
        }
    }
}

/// A `%TOKEN%` placeholder that had no matching environment entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedToken {
    /// Binding variable whose option contained the token.
    pub variable: String,
    /// Option key whose value contained the token.
    pub option: String,
    /// Token name, without the surrounding `%`.
    pub token: String,
}

impl fmt::Display for UnresolvedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}% (in `{}.{}`)", self.token, self.variable, self.option)
    }
}

struct TokenList<'a>(&'a [UnresolvedToken]);

impl fmt::Display for TokenList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{token}")?;
        }
        Ok(())
    }
}

/// Errors raised while registering, resolving or finalizing bindings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A descriptor failed validation.
    #[error("function `{function}`: {source}")]
    Validation {
        /// The function being registered or finalized.
        function: String,
        /// The underlying validation failure.
        #[source]
        source: ValidationError,
    },

    /// Two descriptors share a variable name.
    #[error("function `{function}`: binding variable `{variable}` is declared more than once")]
    DuplicateVariable {
        /// The function being registered.
        function: String,
        /// The colliding variable name.
        variable: String,
    },

    /// A second trigger was declared.
    #[error(
        "function `{function}`: trigger `{variable}` conflicts with existing trigger `{existing}`"
    )]
    MultipleTriggers {
        /// The function being registered.
        function: String,
        /// The rejected trigger variable.
        variable: String,
        /// The trigger already registered.
        existing: String,
    },

    /// No trigger was declared.
    #[error("function `{function}` has no trigger binding")]
    MissingTrigger {
        /// The function being finalized.
        function: String,
    },

    /// Placeholders remain with no environment entry.
    #[error("function `{function}`: unresolved placeholders: {}", TokenList(.tokens))]
    UnresolvedPlaceholder {
        /// The function being resolved.
        function: String,
        /// Every token that could not be resolved.
        tokens: Vec<UnresolvedToken>,
    },

    /// A required option is empty after resolution and defaults.
    #[error("function `{function}`: binding `{variable}` has an empty required option `{option}`")]
    IncompleteBinding {
        /// The function being finalized.
        function: String,
        /// The incomplete binding variable.
        variable: String,
        /// The empty option key.
        option: &'static str,
    },

    /// The function has never been registered.
    #[error("function `{function}` is not registered")]
    UnknownFunction {
        /// The requested function name.
        function: String,
    },
}

impl RegistryError {
    /// The function the error refers to.
    pub fn function(&self) -> &str {
        match self {
            RegistryError::Validation { function, .. }
            | RegistryError::DuplicateVariable { function, .. }
            | RegistryError::MultipleTriggers { function, .. }
            | RegistryError::MissingTrigger { function }
            | RegistryError::UnresolvedPlaceholder { function, .. }
            | RegistryError::IncompleteBinding { function, .. }
            | RegistryError::UnknownFunction { function } => function,
        }
    }
}

/// Why a raw payload value could not be decoded.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The value looked structured but is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Bytes were expected to be UTF-8 text.
    #[error("payload is not valid UTF-8")]
    NotUtf8,

    /// A JSON object was expected.
    #[error("expected a JSON object, found {found}")]
    NotAnObject {
        /// The JSON type that was found instead.
        found: &'static str,
    },
}

/// Errors raised by a single invocation.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A required input is absent from the payload.
    #[error("function `{function}`: input `{variable}` is missing from the payload")]
    MissingInput {
        /// The invoked function.
        function: String,
        /// The missing variable.
        variable: String,
    },

    /// An input value could not be decoded for its kind.
    #[error("function `{function}`: input `{variable}` is malformed: {source}")]
    PayloadFormat {
        /// The invoked function.
        function: String,
        /// The malformed variable.
        variable: String,
        /// The decode failure.
        #[source]
        source: DecodeError,
    },

    /// No binding set is published under the function name.
    #[error("function `{function}` is not bound")]
    UnknownFunction {
        /// The requested function name.
        function: String,
    },
}

impl DispatchError {
    /// The function the error refers to.
    pub fn function(&self) -> &str {
        match self {
            DispatchError::MissingInput { function, .. }
            | DispatchError::PayloadFormat { function, .. }
            | DispatchError::UnknownFunction { function } => function,
        }
    }
}

/// Typed extraction from a handler input failed.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// No input is bound under the requested name.
    #[error("no input named `{0}`")]
    Missing(String),

    /// The input could not be deserialized into the requested type.
    #[error("input `{variable}` could not be deserialized: {source}")]
    Deserialize {
        /// The input variable.
        variable: String,
        /// The serde failure.
        #[source]
        source: serde_json::Error,
    },
}
