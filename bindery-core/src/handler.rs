//! # Handler
//!
//! The user-supplied function a binding set dispatches to. A handler reads
//! the assembled [`Inputs`], may set any number of [`Outputs`], and returns
//! a result the dispatcher hands back untouched.
//!
//! Handlers run synchronously and to completion; one call per event.
//!
//! # Usage Patterns
//!
//! 1. **Closure**: `handler_fn(|inputs, outputs| { ... })`
//! 2. **Struct implementation**: `impl Handler for MyHandler`

use crate::context::{Inputs, Outputs};

/// The terminal endpoint of an invocation.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a binding handler",
    label = "missing `Handler` implementation",
    note = "Handlers take `(&Inputs, &mut Outputs)`; wrap closures with `handler_fn`."
)]
pub trait Handler: Send + Sync {
    /// The value returned to the dispatcher's caller.
    type Output;

    /// Run the handler for one event.
    fn call(&self, inputs: &Inputs, outputs: &mut Outputs) -> Self::Output;
}

// Blanket impl for closures
impl<F, Out> Handler for F
where
    F: Fn(&Inputs, &mut Outputs) -> Out + Send + Sync,
{
    type Output = Out;

    fn call(&self, inputs: &Inputs, outputs: &mut Outputs) -> Self::Output {
        (self)(inputs, outputs)
    }
}

/// Pin a closure's argument types so it can be passed as a [`Handler`].
///
/// Closures given straight to a generic `H: Handler` parameter cannot infer
/// their argument types; this function supplies them.
pub fn handler_fn<F, Out>(f: F) -> F
where
    F: Fn(&Inputs, &mut Outputs) -> Out + Send + Sync,
{
    f
}
