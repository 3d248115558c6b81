//! Testing utilities for Bindery.
//!
//! Handlers that make dispatcher behavior easy to observe in tests.
//!
//! # Features
//!
//! - [`RecordingHandler`]: records the inputs of every call and optionally
//!   sets fixed outputs
//! - [`CountingHandler`]: counts invocations
//! - [`EchoHandler`]: copies one input to one output

use bindery_core::{BindingValue, Handler, Inputs, Outputs};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

// ============================================================================
// Recording Handler
// ============================================================================

/// A handler that records the inputs of every call.
///
/// Clones share the same recording.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingHandler::new().with_output("product", "saved");
/// dispatcher.invoke("CreateNewOrder", &payload, &recorder)?;
///
/// assert_eq!(recorder.count(), 1);
/// assert_eq!(recorder.calls()[0].text("payload"), Some("hello"));
/// ```
#[derive(Clone, Default)]
pub struct RecordingHandler {
    calls: Arc<Mutex<Vec<Inputs>>>,
    outputs: Vec<(String, BindingValue)>,
}

impl RecordingHandler {
    /// Create a recording handler that sets no outputs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `value` under `variable` on every call.
    pub fn with_output(mut self, variable: impl Into<String>, value: impl Into<BindingValue>) -> Self {
        self.outputs.push((variable.into(), value.into()));
        self
    }

    /// Get a clone of the recorded inputs.
    pub fn calls(&self) -> Vec<Inputs> {
        self.calls.lock().unwrap().clone()
    }

    /// Get the number of recorded calls.
    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Clear all recorded calls.
    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl Handler for RecordingHandler {
    type Output = ();

    fn call(&self, inputs: &Inputs, outputs: &mut Outputs) {
        self.calls.lock().unwrap().push(inputs.clone());
        for (variable, value) in &self.outputs {
            outputs.set(variable.as_str(), value.clone());
        }
    }
}

// ============================================================================
// Counting Handler
// ============================================================================

/// A handler that counts invocations.
///
/// ```rust,ignore
/// let counter = CountingHandler::new();
/// dispatcher.invoke("PrintTopicMessage", &payload, &counter)?;
/// assert_eq!(counter.count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl CountingHandler {
    /// Create a new counting handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current count.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Reset the counter.
    pub fn reset(&self) {
        self.count.store(0, Ordering::SeqCst);
    }
}

impl Handler for CountingHandler {
    type Output = usize;

    /// Returns the count including this call.
    fn call(&self, _inputs: &Inputs, _outputs: &mut Outputs) -> usize {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }
}

// ============================================================================
// Echo Handler
// ============================================================================

/// A handler that copies the input `from` to the output `to`.
///
/// Returns whether the input was present.
#[derive(Debug, Clone)]
pub struct EchoHandler {
    from: String,
    to: String,
}

impl EchoHandler {
    /// Echo input `from` to output `to`.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl Handler for EchoHandler {
    type Output = bool;

    fn call(&self, inputs: &Inputs, outputs: &mut Outputs) -> bool {
        match inputs.get(&self.from) {
            Some(value) => {
                outputs.set(self.to.as_str(), value.clone());
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_handler_shares_state_across_clones() {
        let recorder = RecordingHandler::new().with_output("product", "saved");
        let clone = recorder.clone();
        let inputs: Inputs = [("payload", "hello")].into_iter().collect();
        let mut outputs = Outputs::new();

        clone.call(&inputs, &mut outputs);

        assert_eq!(recorder.count(), 1);
        assert_eq!(recorder.calls()[0].text("payload"), Some("hello"));
        assert_eq!(outputs.get("product").and_then(BindingValue::as_str), Some("saved"));

        recorder.clear();
        assert_eq!(clone.count(), 0);
    }

    #[test]
    fn counting_handler_returns_running_count() {
        let counter = CountingHandler::new();
        let mut outputs = Outputs::new();
        assert_eq!(counter.call(&Inputs::new(), &mut outputs), 1);
        assert_eq!(counter.call(&Inputs::new(), &mut outputs), 2);
        counter.reset();
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn echo_handler_copies_value() {
        let echo = EchoHandler::new("payload", "state");
        let inputs: Inputs = [("payload", "hi")].into_iter().collect();
        let mut outputs = Outputs::new();
        assert!(echo.call(&inputs, &mut outputs));
        assert_eq!(outputs.get("state").and_then(BindingValue::as_str), Some("hi"));
        assert!(!echo.call(&Inputs::new(), &mut Outputs::new()));
    }
}
