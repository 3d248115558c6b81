//! # bindery-std
//!
//! Standard implementations for the Bindery binding registry.
//!
//! This crate provides:
//! - **Configuration**: [`environment::Environment`] and `%TOKEN%`
//!   [`placeholder`] substitution
//! - **Registration**: [`registry::Registry`], resolved into
//!   [`registry::ResolvedBindingSet`]s and frozen as a
//!   [`registry::BindingTable`]
//! - **Dispatch**: [`dispatcher::Dispatcher`] with per-kind payload
//!   decoding in [`codec`]
//! - **Sidecar shapes**: [`envelope`] request bodies and topic subscriptions
//! - **Manifests**: [`manifest::Manifest`] loading from YAML or JSON
//! - **Testing**: recording and counting handlers in [`testing`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core types
pub use bindery_core;

// Modules
pub mod codec;
pub mod dispatcher;
pub mod envelope;
pub mod environment;
pub mod manifest;
pub mod placeholder;
pub mod registry;
pub mod testing;
