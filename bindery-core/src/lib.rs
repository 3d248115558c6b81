//! # bindery-core
//!
//! Core types for the Bindery binding registry and dispatcher.
//!
//! This crate has minimal dependencies and holds the data model shared by
//! every layer: descriptors, binding kinds with their option tables, payload
//! values, the handler contract, and the error taxonomy.
//!
//! # Layers
//!
//! ## Descriptor ([`BindingDescriptor`])
//!
//! An immutable record of one binding declaration: a [`Direction`], a
//! [`BindingKind`], the variable name it is exposed under, and its string
//! options. Validated against the kind's option table on construction.
//!
//! ## Context ([`Inputs`], [`Outputs`])
//!
//! What a handler sees for a single invocation.
//!
//! ## Handler ([`Handler`])
//!
//! The terminal, user-supplied function.
//!
//! # Error Types
//!
//! - [`BinderyError`] - Top-level error type
//! - [`ValidationError`] - Descriptor construction errors
//! - [`RegistryError`] - Deployment-time errors
//! - [`DispatchError`] - Invocation-time errors

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod context;
mod descriptor;
mod error;
mod handler;
mod kind;
mod value;

// Re-exports
pub use context::{Inputs, Outputs};
pub use descriptor::{BindingDescriptor, DescriptorBuilder, Direction, METADATA};
pub use error::{
    BinderyError, BoxError, DecodeError, DispatchError, ExtractError, RegistryError,
    UnresolvedToken, ValidationError,
};
pub use handler::{Handler, handler_fn};
pub use kind::{BindingKind, DAPR_ADDRESS, DefaultValue, OptionSpec, PayloadShape, UnknownTag};
pub use value::{BindingValue, RawPayload, RawValue};
