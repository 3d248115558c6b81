//! # Dispatcher
//!
//! Maps a raw invocation payload onto a handler call using a finalized
//! [`ResolvedBindingSet`]:
//!
//! 1. every In/Trigger binding is read from the payload (or its default value)
//!    and decoded according to its kind,
//! 2. the handler runs once with the assembled [`Inputs`],
//! 3. values the handler set under declared Out bindings are staged.
//!
//! When any input is missing or malformed the handler is not called and no
//! outputs are produced.
//!
//! # Example
//!
//! ```rust,ignore
//! let dispatcher = Dispatcher::new(Arc::new(table));
//! let invocation = dispatcher.invoke("PrintTopicMessage", &payload, &handler)?;
//! for (variable, envelope) in invocation.envelopes(&set) {
//!     // send to the sidecar
//! }
//! ```

use crate::{
    codec,
    envelope::OutputEnvelope,
    registry::{BindingTable, ResolvedBindingSet},
};
use bindery_core::{DispatchError, Handler, Inputs, Outputs, RawPayload};
use std::{collections::BTreeMap, sync::Arc};

/// The outcome of one handler invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation<T> {
    /// Whatever the handler returned.
    pub result: T,
    /// Values set under declared Out bindings.
    pub outputs: Outputs,
}

impl<T> Invocation<T> {
    /// Render the staged outputs as sidecar request bodies.
    pub fn envelopes(&self, set: &ResolvedBindingSet) -> BTreeMap<String, OutputEnvelope> {
        set.envelopes(&self.outputs)
    }

    /// Split into the handler result and staged outputs.
    pub fn into_parts(self) -> (T, Outputs) {
        (self.result, self.outputs)
    }
}

/// Assemble the handler inputs for `set` from `payload`.
///
/// # Errors
///
/// [`DispatchError::MissingInput`] when a value is absent and the binding has
/// no default, [`DispatchError::PayloadFormat`] when a value cannot be decoded.
pub fn assemble_inputs(
    set: &ResolvedBindingSet,
    payload: &RawPayload,
) -> Result<Inputs, DispatchError> {
    let mut inputs = Inputs::new();
    for descriptor in set.inputs() {
        let variable = descriptor.variable();
        let raw = payload
            .get(variable)
            .or_else(|| descriptor.default_value())
            .ok_or_else(|| DispatchError::MissingInput {
                function: set.function().to_string(),
                variable: variable.to_string(),
            })?;
        let value = codec::decode(descriptor.kind(), raw).map_err(|source| {
            DispatchError::PayloadFormat {
                function: set.function().to_string(),
                variable: variable.to_string(),
                source,
            }
        })?;
        inputs.insert(variable, value);
    }
    Ok(inputs)
}

/// Keep the handler's values for declared outputs, dropping the rest.
fn stage_outputs(set: &ResolvedBindingSet, mut written: Outputs) -> Outputs {
    let staged: Outputs = set
        .outputs()
        .filter_map(|d| written.take(d.variable()).map(|v| (d.variable(), v)))
        .collect();

    for (variable, _) in written.iter() {
        tracing::warn!(
            function = %set.function(),
            variable = %variable,
            "dropping value for undeclared output"
        );
    }
    staged
}

/// Invoke `handler` for one event against a finalized binding set.
///
/// # Errors
///
/// See [`assemble_inputs`]. The handler is not called on error.
pub fn invoke<H>(
    set: &ResolvedBindingSet,
    payload: &RawPayload,
    handler: &H,
) -> Result<Invocation<H::Output>, DispatchError>
where
    H: Handler + ?Sized,
{
    let span = tracing::debug_span!("invoke", function = %set.function());
    let _enter = span.enter();

    let inputs = assemble_inputs(set, payload)
        .inspect_err(|err| tracing::warn!(error = %err, "invocation rejected"))?;

    let mut written = Outputs::new();
    let result = handler.call(&inputs, &mut written);
    let outputs = stage_outputs(set, written);

    tracing::debug!(inputs = inputs.len(), outputs = outputs.len(), "invocation complete");
    Ok(Invocation { result, outputs })
}

// ============================================================================
// Dispatcher - dispatch by function name over a frozen table
// ============================================================================

/// Dispatches invocations by function name over a shared [`BindingTable`].
///
/// Cloning is cheap and clones share the same table.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    table: Arc<BindingTable>,
}

impl Dispatcher {
    /// Create a dispatcher over a frozen table.
    pub fn new(table: Arc<BindingTable>) -> Self {
        Self { table }
    }

    /// The table this dispatcher serves.
    pub fn table(&self) -> &Arc<BindingTable> {
        &self.table
    }

    /// Look up a function's bindings.
    ///
    /// # Errors
    ///
    /// [`DispatchError::UnknownFunction`] when `function` is not in the table.
    pub fn bindings(&self, function: &str) -> Result<&Arc<ResolvedBindingSet>, DispatchError> {
        self.table
            .get(function)
            .ok_or_else(|| DispatchError::UnknownFunction {
                function: function.to_string(),
            })
    }

    /// Invoke `handler` for an event addressed to `function`.
    pub fn invoke<H>(
        &self,
        function: &str,
        payload: &RawPayload,
        handler: &H,
    ) -> Result<Invocation<H::Output>, DispatchError>
    where
        H: Handler + ?Sized,
    {
        invoke(self.bindings(function)?, payload, handler)
    }
}

impl From<BindingTable> for Dispatcher {
    fn from(table: BindingTable) -> Self {
        Self::new(Arc::new(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{environment::Environment, registry::Registry};
    use bindery_core::{BindingDescriptor, BindingKind, BindingValue, DecodeError, handler_fn};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn create_new_order() -> ResolvedBindingSet {
        let trigger = BindingDescriptor::trigger(BindingKind::ServiceInvocationTrigger, "payload")
            .build()
            .unwrap();
        let state = BindingDescriptor::output(BindingKind::StateStore, "product")
            .option("stateStore", "%StateStoreName%")
            .option("key", "order")
            .build()
            .unwrap();
        Registry::new()
            .with_binding("CreateNewOrder", trigger)
            .unwrap()
            .with_binding("CreateNewOrder", state)
            .unwrap()
            .bind(
                "CreateNewOrder",
                &Environment::new().with("StateStoreName", "statestore"),
            )
            .unwrap()
    }

    #[test]
    fn declared_output_is_staged() {
        let set = create_new_order();
        let payload = RawPayload::new().with("payload", r#"{"data":{"orderId":"41"}}"#);
        let handler = handler_fn(|inputs: &Inputs, outputs: &mut Outputs| {
            let order: serde_json::Value = inputs.json("payload").unwrap();
            outputs.set("product", order["data"].clone());
        });

        let invocation = invoke(&set, &payload, &handler).unwrap();
        assert_eq!(
            invocation.outputs.get("product"),
            Some(&BindingValue::Json(serde_json::json!({ "orderId": "41" })))
        );
        assert_eq!(invocation.envelopes(&set).len(), 1);
    }

    #[test]
    fn undeclared_outputs_are_dropped() {
        let set = create_new_order();
        let payload = RawPayload::new().with("payload", "x");
        let handler = handler_fn(|_: &Inputs, outputs: &mut Outputs| {
            outputs.set("product", "kept");
            outputs.set("stray", "dropped");
        });

        let invocation = invoke(&set, &payload, &handler).unwrap();
        assert_eq!(invocation.outputs.len(), 1);
        assert!(invocation.outputs.get("stray").is_none());
    }

    #[test]
    fn unset_outputs_are_omitted() {
        let set = create_new_order();
        let payload = RawPayload::new().with("payload", "x");
        let invocation = invoke(&set, &payload, &handler_fn(|_: &Inputs, _: &mut Outputs| 7)).unwrap();
        assert_eq!(invocation.result, 7);
        assert!(invocation.outputs.is_empty());
    }

    #[test]
    fn missing_input_skips_handler() {
        let set = create_new_order();
        let calls = AtomicUsize::new(0);
        let handler = handler_fn(|_: &Inputs, _: &mut Outputs| {
            calls.fetch_add(1, Ordering::SeqCst);
        });

        let err = invoke(&set, &RawPayload::new(), &handler).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::MissingInput { ref function, ref variable }
                if function == "CreateNewOrder" && variable == "payload"
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn default_value_fills_absent_input() {
        let trigger = BindingDescriptor::trigger(BindingKind::TopicTrigger, "message")
            .option("pubSubName", "messagebus")
            .build()
            .unwrap();
        let state = BindingDescriptor::input(BindingKind::StateStore, "order")
            .option("stateStore", "statestore")
            .option("key", "order")
            .default_value("{}")
            .build()
            .unwrap();
        let set = Registry::new()
            .with_binding("PrintTopicMessage", trigger)
            .unwrap()
            .with_binding("PrintTopicMessage", state)
            .unwrap()
            .finalize("PrintTopicMessage")
            .unwrap();

        let payload = RawPayload::new().with("message", "hello");
        let invocation = invoke(&set, &payload, &handler_fn(|inputs: &Inputs, _: &mut Outputs| {
            (inputs.text("message").map(str::to_string), inputs.text("order").map(str::to_string))
        }))
        .unwrap();
        assert_eq!(
            invocation.result,
            (Some("hello".to_string()), Some("{}".to_string()))
        );
    }

    #[test]
    fn malformed_cloud_event_is_payload_format() {
        let trigger = BindingDescriptor::trigger(BindingKind::TopicTrigger, "message")
            .option("pubSubName", "messagebus")
            .build()
            .unwrap();
        let set = Registry::new()
            .with_binding("PrintTopicMessage", trigger)
            .unwrap()
            .finalize("PrintTopicMessage")
            .unwrap();

        let err = invoke(
            &set,
            &RawPayload::new().with("message", "{ broken"),
            &handler_fn(|_: &Inputs, _: &mut Outputs| ()),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::PayloadFormat { source: DecodeError::InvalidJson(_), .. }
        ));
    }

    #[test]
    fn dispatcher_rejects_unknown_function() {
        let dispatcher = Dispatcher::from(BindingTable::from_iter([create_new_order()]));
        let err = dispatcher
            .invoke("Nope", &RawPayload::new(), &handler_fn(|_: &Inputs, _: &mut Outputs| ()))
            .unwrap_err();
        assert_eq!(err.function(), "Nope");
        assert!(dispatcher.bindings("CreateNewOrder").is_ok());
    }
}
