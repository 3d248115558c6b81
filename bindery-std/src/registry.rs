//! Registry module for binding descriptors.
//!
//! Registration is a mutable, single-threaded phase: descriptors are added
//! to a [`Registry`] per function, then resolved against an [`Environment`]
//! and finalized into immutable [`ResolvedBindingSet`]s. [`Registry::freeze`]
//! publishes every function at once as a [`BindingTable`] that can be shared
//! across threads while invocations are served.
//!
//! # Example
//! ```ignore
//! let mut registry = Registry::new();
//! registry.register("PrintTopicMessage", trigger)?;
//!
//! let env = Environment::new().with("PubSubName", "messagebus");
//! let table = Arc::new(registry.freeze(&env)?);
//! ```

use crate::{environment::Environment, placeholder};
use bindery_core::{BindingDescriptor, RegistryError, UnresolvedToken};
use std::{collections::BTreeMap, sync::Arc};

// ============================================================================
// FunctionBindings - the declared set for one function
// ============================================================================

/// The descriptors declared for a single function.
///
/// Variable names are unique within the set regardless of direction, and at
/// most one trigger is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionBindings {
    function: String,
    descriptors: Vec<BindingDescriptor>,
}

impl FunctionBindings {
    /// Create an empty set for `function`.
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            descriptors: Vec::new(),
        }
    }

    /// Add a descriptor.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateVariable`] when the variable name is taken,
    /// [`RegistryError::MultipleTriggers`] when a trigger already exists.
    pub fn insert(&mut self, descriptor: BindingDescriptor) -> Result<(), RegistryError> {
        if self.get(descriptor.variable()).is_some() {
            return Err(RegistryError::DuplicateVariable {
                function: self.function.clone(),
                variable: descriptor.variable().to_string(),
            });
        }
        if descriptor.is_trigger()
            && let Some(existing) = self.trigger()
        {
            return Err(RegistryError::MultipleTriggers {
                function: self.function.clone(),
                variable: descriptor.variable().to_string(),
                existing: existing.variable().to_string(),
            });
        }
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// The function name.
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Look up a descriptor by variable name.
    pub fn get(&self, variable: &str) -> Option<&BindingDescriptor> {
        self.descriptors.iter().find(|d| d.variable() == variable)
    }

    /// The trigger descriptor, if one has been registered.
    pub fn trigger(&self) -> Option<&BindingDescriptor> {
        self.descriptors.iter().find(|d| d.is_trigger())
    }

    /// Iterate over descriptors in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, BindingDescriptor> {
        self.descriptors.iter()
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether no descriptors are registered.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Substitute `%TOKEN%` placeholders in every option value.
    ///
    /// Returns a new set; `self` is left untouched so the same declaration
    /// can be bound to several environments.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnresolvedPlaceholder`] listing every token that has
    /// no entry in `env`.
    pub fn resolve(&self, env: &Environment) -> Result<FunctionBindings, RegistryError> {
        let mut unresolved = Vec::new();
        let mut descriptors = Vec::with_capacity(self.descriptors.len());

        for descriptor in &self.descriptors {
            let resolved = descriptor.map_options(|option, value| {
                match placeholder::substitute(value, env) {
                    Ok(substituted) => substituted.into_owned(),
                    Err(tokens) => {
                        unresolved.extend(tokens.into_iter().map(|token| UnresolvedToken {
                            variable: descriptor.variable().to_string(),
                            option: option.to_string(),
                            token,
                        }));
                        value.to_string()
                    }
                }
            });
            descriptors.push(resolved);
        }

        if !unresolved.is_empty() {
            tracing::warn!(
                function = %self.function,
                count = unresolved.len(),
                "unresolved binding placeholders"
            );
            return Err(RegistryError::UnresolvedPlaceholder {
                function: self.function.clone(),
                tokens: unresolved,
            });
        }

        Ok(FunctionBindings {
            function: self.function.clone(),
            descriptors,
        })
    }

    /// Validate the set and freeze it.
    ///
    /// Kind defaults are applied before required options are checked.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::MissingTrigger`] when no trigger is declared
    /// - [`RegistryError::UnresolvedPlaceholder`] when placeholders remain
    /// - [`RegistryError::IncompleteBinding`] when a required option is empty
    /// - [`RegistryError::Validation`] when resolved secret metadata is malformed
    pub fn finalize(&self) -> Result<ResolvedBindingSet, RegistryError> {
        let Some(trigger) = self.descriptors.iter().position(|d| d.is_trigger()) else {
            return Err(RegistryError::MissingTrigger {
                function: self.function.clone(),
            });
        };

        let leftover: Vec<UnresolvedToken> = self
            .descriptors
            .iter()
            .flat_map(|descriptor| {
                descriptor.options().iter().flat_map(move |(option, value)| {
                    placeholder::tokens(value).map(move |token| UnresolvedToken {
                        variable: descriptor.variable().to_string(),
                        option: option.clone(),
                        token: token.to_string(),
                    })
                })
            })
            .collect();
        if !leftover.is_empty() {
            return Err(RegistryError::UnresolvedPlaceholder {
                function: self.function.clone(),
                tokens: leftover,
            });
        }

        let descriptors: Vec<BindingDescriptor> = self
            .descriptors
            .iter()
            .map(|d| d.with_defaults(&self.function))
            .collect();

        for descriptor in &descriptors {
            if let Some(option) = descriptor.incomplete_option() {
                return Err(RegistryError::IncompleteBinding {
                    function: self.function.clone(),
                    variable: descriptor.variable().to_string(),
                    option,
                });
            }
            descriptor
                .metadata()
                .map_err(|source| RegistryError::Validation {
                    function: self.function.clone(),
                    source,
                })?;
        }

        Ok(ResolvedBindingSet {
            function: self.function.clone(),
            descriptors,
            trigger,
        })
    }
}

// ============================================================================
// ResolvedBindingSet - immutable, finalized bindings
// ============================================================================

/// A finalized, immutable descriptor set for one function.
///
/// Every placeholder is resolved and every kind default applied. Safe to
/// share read-only across concurrent invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBindingSet {
    function: String,
    descriptors: Vec<BindingDescriptor>,
    trigger: usize,
}

impl ResolvedBindingSet {
    /// The function name.
    pub fn function(&self) -> &str {
        &self.function
    }

    /// The trigger descriptor.
    pub fn trigger(&self) -> &BindingDescriptor {
        &self.descriptors[self.trigger]
    }

    /// Look up a descriptor by variable name.
    pub fn get(&self, variable: &str) -> Option<&BindingDescriptor> {
        self.descriptors.iter().find(|d| d.variable() == variable)
    }

    /// Iterate over descriptors in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, BindingDescriptor> {
        self.descriptors.iter()
    }

    /// Descriptors whose values flow into the handler (In and Trigger).
    pub fn inputs(&self) -> impl Iterator<Item = &BindingDescriptor> {
        self.descriptors.iter().filter(|d| d.direction().is_input())
    }

    /// Descriptors the handler may set (Out).
    pub fn outputs(&self) -> impl Iterator<Item = &BindingDescriptor> {
        self.descriptors.iter().filter(|d| !d.direction().is_input())
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Always `false`: a finalized set contains at least its trigger.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl<'a> IntoIterator for &'a ResolvedBindingSet {
    type Item = &'a BindingDescriptor;
    type IntoIter = std::slice::Iter<'a, BindingDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.iter()
    }
}

// ============================================================================
// Registry - mutable registration phase
// ============================================================================

/// Collects descriptors per function during registration.
///
/// The registry is not meant to be shared with invocation traffic; publish a
/// [`BindingTable`] with [`Registry::freeze`] before serving.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    functions: BTreeMap<String, FunctionBindings>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor under `function`.
    ///
    /// # Errors
    ///
    /// See [`FunctionBindings::insert`].
    pub fn register(
        &mut self,
        function: impl Into<String>,
        descriptor: BindingDescriptor,
    ) -> Result<(), RegistryError> {
        let function = function.into();
        tracing::debug!(
            function = %function,
            variable = %descriptor.variable(),
            direction = %descriptor.direction(),
            kind = %descriptor.kind(),
            "registering binding"
        );
        self.functions
            .entry(function.clone())
            .or_insert_with(|| FunctionBindings::new(function))
            .insert(descriptor)
            .inspect_err(|err| tracing::warn!(error = %err, "binding registration rejected"))
    }

    /// Register a descriptor, returning the registry for chaining.
    pub fn with_binding(
        mut self,
        function: impl Into<String>,
        descriptor: BindingDescriptor,
    ) -> Result<Self, RegistryError> {
        self.register(function, descriptor)?;
        Ok(self)
    }

    /// The declared (unresolved) set for `function`.
    pub fn declared(&self, function: &str) -> Option<&FunctionBindings> {
        self.functions.get(function)
    }

    /// Registered function names, in sorted order.
    pub fn functions(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Number of registered functions.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether no functions are registered.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    fn lookup(&self, function: &str) -> Result<&FunctionBindings, RegistryError> {
        self.functions
            .get(function)
            .ok_or_else(|| RegistryError::UnknownFunction {
                function: function.to_string(),
            })
    }

    /// Resolve placeholders in `function`'s declared set against `env`.
    pub fn resolve(
        &self,
        function: &str,
        env: &Environment,
    ) -> Result<FunctionBindings, RegistryError> {
        self.lookup(function)?.resolve(env)
    }

    /// Finalize `function`'s declared set as is.
    ///
    /// Use [`Registry::bind`] when the declaration contains placeholders.
    pub fn finalize(&self, function: &str) -> Result<ResolvedBindingSet, RegistryError> {
        self.lookup(function)?.finalize()
    }

    /// Resolve then finalize `function` against `env`.
    pub fn bind(
        &self,
        function: &str,
        env: &Environment,
    ) -> Result<ResolvedBindingSet, RegistryError> {
        let resolved = self.resolve(function, env)?.finalize()?;
        tracing::debug!(function = %function, bindings = resolved.len(), "bound function");
        Ok(resolved)
    }

    /// Bind every registered function and publish an immutable table.
    ///
    /// Fails on the first function that cannot be bound.
    pub fn freeze(&self, env: &Environment) -> Result<BindingTable, RegistryError> {
        let table = self
            .functions()
            .map(|function| self.bind(function, env))
            .collect::<Result<BindingTable, _>>()
            .inspect_err(|err| tracing::warn!(error = %err, "binding table rejected"))?;
        tracing::info!(functions = table.len(), "binding table frozen");
        Ok(table)
    }
}

// ============================================================================
// BindingTable - frozen snapshot served to the dispatcher
// ============================================================================

/// An immutable snapshot of every finalized function.
///
/// Cloning is cheap; sets are shared via [`Arc`].
#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    sets: BTreeMap<String, Arc<ResolvedBindingSet>>,
}

impl BindingTable {
    /// Look up a function's bindings.
    pub fn get(&self, function: &str) -> Option<&Arc<ResolvedBindingSet>> {
        self.sets.get(function)
    }

    /// Function names, in sorted order.
    pub fn functions(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    /// Iterate over every finalized set.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResolvedBindingSet>> {
        self.sets.values()
    }

    /// Number of functions.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

impl FromIterator<ResolvedBindingSet> for BindingTable {
    fn from_iter<I: IntoIterator<Item = ResolvedBindingSet>>(iter: I) -> Self {
        Self {
            sets: iter
                .into_iter()
                .map(|set| (set.function.clone(), Arc::new(set)))
                .collect(),
        }
    }
}
