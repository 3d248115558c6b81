//! # bindery - Binding Descriptors for Sidecar-Backed Functions
//!
//! `bindery` turns declarative binding metadata into handler invocations.
//! Each function declares one trigger plus any number of input and output
//! bindings against sidecar building blocks (pub/sub, state, service
//! invocation, secrets, generic bindings). Declarations are validated when
//! built, resolved once per deployment against an [`Environment`], and then
//! used to marshal every incoming event.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bindery::prelude::*;
//! use std::sync::Arc;
//!
//! let trigger = BindingDescriptor::trigger(BindingKind::TopicTrigger, "payload")
//!     .option("pubSubName", "%PubSubName%")
//!     .option("topic", "B")
//!     .build()?;
//!
//! let mut registry = Registry::new();
//! registry.register("PrintTopicMessage", trigger)?;
//!
//! let env = Environment::from_process_env_prefixed("APP_");
//! let dispatcher = Dispatcher::new(Arc::new(registry.freeze(&env)?));
//!
//! let payload = RawPayload::new().with("payload", body);
//! let invocation = dispatcher.invoke(
//!     "PrintTopicMessage",
//!     &payload,
//!     &handler_fn(|inputs: &Inputs, _: &mut Outputs| {
//!         println!("Topic B received a message: {:?}", inputs.text("payload"));
//!     }),
//! )?;
//! ```

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use bindery_core::{
    // Errors
    BinderyError,
    // Descriptor
    BindingDescriptor,
    // Kinds
    BindingKind,
    // Values
    BindingValue,
    BoxError,
    DAPR_ADDRESS,
    DecodeError,
    DefaultValue,
    DescriptorBuilder,
    Direction,
    DispatchError,
    ExtractError,
    // Handler
    Handler,
    // Context
    Inputs,
    METADATA,
    OptionSpec,
    Outputs,
    PayloadShape,
    RawPayload,
    RawValue,
    RegistryError,
    UnknownTag,
    UnresolvedToken,
    ValidationError,
    handler_fn,
};

// Registration and dispatch
pub use bindery_std::{
    dispatcher::{Dispatcher, Invocation, invoke},
    environment::Environment,
    manifest::{BindingSpec, Manifest, ManifestError},
    registry::{BindingTable, FunctionBindings, Registry, ResolvedBindingSet},
};

/// Sidecar request shapes.
pub mod envelope {
    #![allow(clippy::wildcard_imports)]
    pub use bindery_std::envelope::*;
}

/// Placeholder scanning and substitution.
pub mod placeholder {
    pub use bindery_std::placeholder::{has_placeholders, substitute, tokens};
}

/// Payload decoding.
pub mod codec {
    pub use bindery_std::codec::decode;
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use bindery_std::testing::*;
}

/// Prelude module - common imports for Bindery.
///
/// # Usage
///
/// ```rust,ignore
/// use bindery::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        BinderyError, BindingDescriptor, BindingKind, BindingTable, BindingValue, Direction,
        DispatchError, Dispatcher, Environment, Handler, Inputs, Invocation, Manifest, Outputs,
        RawPayload, RawValue, Registry, RegistryError, ResolvedBindingSet, ValidationError,
        handler_fn,
    };
}
