//! Binding descriptors.
//!
//! A [`BindingDescriptor`] is the immutable record of one binding
//! declaration. It is validated against its kind's option table when it is
//! constructed; placeholder resolution and kind defaults later produce new
//! descriptors instead of mutating the declared one.

use crate::{
    error::ValidationError,
    kind::{BindingKind, DefaultValue, UnknownTag},
    value::RawValue,
};
use std::{collections::BTreeMap, fmt, str::FromStr};

/// Option key holding secret-store request metadata.
pub const METADATA: &str = "metadata";

/// The role a binding plays in an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// A value fetched for the handler before it runs.
    In,
    /// A value the handler may set for the host to deliver.
    Out,
    /// The event that starts the invocation.
    Trigger,
}

impl Direction {
    /// The tag used for this direction in manifests and log output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
            Direction::Trigger => "trigger",
        }
    }

    /// Whether values flow from the payload into the handler.
    pub const fn is_input(self) -> bool {
        matches!(self, Direction::In | Direction::Trigger)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Direction::In, Direction::Out, Direction::Trigger]
            .into_iter()
            .find(|direction| direction.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownTag {
                what: "direction",
                tag: s.to_string(),
            })
    }
}

/// An immutable binding declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingDescriptor {
    direction: Direction,
    kind: BindingKind,
    variable: String,
    options: BTreeMap<String, String>,
    default_value: Option<RawValue>,
}

impl BindingDescriptor {
    /// Construct and validate a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the variable is empty, the kind does
    /// not support `direction`, an option key is not in the kind's table, or a
    /// required option without a default is missing.
    pub fn new<I, K, V>(
        direction: Direction,
        kind: BindingKind,
        variable: impl Into<String>,
        options: I,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::validated(
            direction,
            kind,
            variable.into(),
            collect_options(options),
            None,
        )
    }

    /// Construct a descriptor from string tags, as found in manifests.
    pub fn parse<I, K, V>(
        direction: &str,
        kind: &str,
        variable: impl Into<String>,
        options: I,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let variable = variable.into();
        let tag_error = |source| ValidationError::UnknownTag {
            variable: variable.clone(),
            source,
        };
        let direction = direction.parse::<Direction>().map_err(tag_error)?;
        let kind = kind.parse::<BindingKind>().map_err(tag_error)?;
        Self::validated(direction, kind, variable, collect_options(options), None)
    }

    /// Start building a trigger descriptor.
    pub fn trigger(kind: BindingKind, variable: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder::new(Direction::Trigger, kind, variable)
    }

    /// Start building an input descriptor.
    pub fn input(kind: BindingKind, variable: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder::new(Direction::In, kind, variable)
    }

    /// Start building an output descriptor.
    pub fn output(kind: BindingKind, variable: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder::new(Direction::Out, kind, variable)
    }

    fn validated(
        direction: Direction,
        kind: BindingKind,
        variable: String,
        options: BTreeMap<String, String>,
        default_value: Option<RawValue>,
    ) -> Result<Self, ValidationError> {
        if variable.trim().is_empty() {
            return Err(ValidationError::EmptyVariable);
        }
        if !kind.supports(direction) {
            return Err(ValidationError::UnsupportedDirection {
                variable,
                kind,
                direction,
            });
        }
        if default_value.is_some() && direction == Direction::Out {
            return Err(ValidationError::OutputDefault { variable });
        }
        if let Some(option) = options
            .keys()
            .find(|key| kind.option(direction, key).is_none())
        {
            return Err(ValidationError::UnknownOption {
                option: option.clone(),
                variable,
                kind,
            });
        }
        if let Some(spec) = kind
            .options(direction)
            .iter()
            .find(|spec| !spec.may_be_omitted() && !options.contains_key(spec.name))
        {
            return Err(ValidationError::MissingOption {
                variable,
                option: spec.name,
            });
        }

        let descriptor = Self {
            direction,
            kind,
            variable,
            options,
            default_value,
        };
        // Placeholder-bearing metadata is checked again after resolution.
        if descriptor.option(METADATA).is_some_and(|m| !m.contains('%')) {
            descriptor.metadata()?;
        }
        Ok(descriptor)
    }

    /// The declared direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The declared kind.
    pub fn kind(&self) -> BindingKind {
        self.kind
    }

    /// The variable name addressing this binding's payload slot.
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// All declared options.
    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    /// Look up a single option value.
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    /// The value used when the payload lacks this input.
    pub fn default_value(&self) -> Option<&RawValue> {
        self.default_value.as_ref()
    }

    /// Whether this is the function's trigger.
    pub fn is_trigger(&self) -> bool {
        self.direction == Direction::Trigger
    }

    /// Produce a copy whose option values have been rewritten by `f`.
    ///
    /// Keys are unchanged, so the copy stays valid for the same table.
    pub fn map_options<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&str, &str) -> String,
    {
        Self {
            options: self
                .options
                .iter()
                .map(|(name, value)| (name.clone(), f(name, value)))
                .collect(),
            ..self.clone()
        }
    }

    /// Produce a copy with the kind's defaults filled in.
    ///
    /// Options that are absent or empty take their table default. Defaults
    /// are applied in table order, so derived defaults see earlier results.
    /// A topic trigger's `route` always ends up with a leading `/`.
    pub fn with_defaults(&self, function: &str) -> Self {
        let mut options = self.options.clone();
        for spec in self.kind.options(self.direction) {
            let Some(default) = spec.default else {
                continue;
            };
            if options.get(spec.name).is_some_and(|v| !v.is_empty()) {
                continue;
            }
            let value = match default {
                DefaultValue::Literal(literal) => literal.to_string(),
                DefaultValue::FunctionName => function.to_string(),
                DefaultValue::Derived { from, prefix } => {
                    let base = options.get(from).map(String::as_str).unwrap_or_default();
                    format!("{prefix}{base}")
                }
            };
            options.insert(spec.name.to_string(), value);
        }
        if self.kind == BindingKind::TopicTrigger
            && let Some(route) = options.get_mut("route")
            && !route.starts_with('/')
        {
            route.insert(0, '/');
        }
        Self {
            options,
            ..self.clone()
        }
    }

    /// The first required option whose value is missing or blank.
    pub fn incomplete_option(&self) -> Option<&'static str> {
        self.kind
            .options(self.direction)
            .iter()
            .filter(|spec| spec.required)
            .find(|spec| self.option(spec.name).is_none_or(|v| v.trim().is_empty()))
            .map(|spec| spec.name)
    }

    /// Parse the secret-store `metadata` option into `key=value` pairs.
    ///
    /// An absent or empty option yields no pairs.
    pub fn metadata(&self) -> Result<Vec<(String, String)>, ValidationError> {
        let Some(raw) = self.option(METADATA).filter(|m| !m.is_empty()) else {
            return Ok(Vec::new());
        };
        let malformed = |reason| ValidationError::MalformedMetadata {
            variable: self.variable.clone(),
            metadata: raw.to_string(),
            reason,
        };
        raw.split('&')
            .map(|pair| {
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| malformed("expected `key=value` pairs joined by `&`"))?;
                if key.trim().is_empty() {
                    return Err(malformed("metadata keys must not be empty"));
                }
                Ok((key.to_string(), value.to_string()))
            })
            .collect()
    }
}

fn collect_options<I, K, V>(options: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    options
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Builder for [`BindingDescriptor`].
///
/// # Example
///
/// ```rust
/// use bindery_core::{BindingDescriptor, BindingKind};
///
/// let trigger = BindingDescriptor::trigger(BindingKind::TopicTrigger, "payload")
///     .option("pubSubName", "%PubSubName%")
///     .option("topic", "B")
///     .build()
///     .unwrap();
/// assert_eq!(trigger.option("topic"), Some("B"));
/// ```
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    direction: Direction,
    kind: BindingKind,
    variable: String,
    options: BTreeMap<String, String>,
    default_value: Option<RawValue>,
}

impl DescriptorBuilder {
    /// Create a builder with no options.
    pub fn new(direction: Direction, kind: BindingKind, variable: impl Into<String>) -> Self {
        Self {
            direction,
            kind,
            variable: variable.into(),
            options: BTreeMap::new(),
            default_value: None,
        }
    }

    /// Set an option.
    pub fn option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    /// Set the value used when the payload lacks this input.
    pub fn default_value(mut self, value: impl Into<RawValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Validate and build the descriptor.
    pub fn build(self) -> Result<BindingDescriptor, ValidationError> {
        BindingDescriptor::validated(
            self.direction,
            self.kind,
            self.variable,
            self.options,
            self.default_value,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_kind_tag() {
        let err = BindingDescriptor::parse("trigger", "http-trigger", "req", [("route", "x")])
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownTag { ref variable, .. } if variable == "req"));
    }

    #[test]
    fn rejects_direction_not_supported_by_kind() {
        let err = BindingDescriptor::new(
            Direction::In,
            BindingKind::PubSub,
            "message",
            [("pubSubName", "bus"), ("topic", "A")],
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedDirection { .. }));
    }

    #[test]
    fn rejects_unknown_option_key() {
        let err = BindingDescriptor::output(BindingKind::StateStore, "product")
            .option("stateStore", "statestore")
            .option("key", "order")
            .option("etag", "1")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownOption {
                variable: "product".into(),
                kind: BindingKind::StateStore,
                option: "etag".into(),
            }
        );
    }

    #[test]
    fn missing_required_option_without_default_fails() {
        let err = BindingDescriptor::output(BindingKind::StateStore, "product")
            .option("stateStore", "statestore")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingOption {
                variable: "product".into(),
                option: "key",
            }
        );
    }

    #[test]
    fn missing_option_with_default_is_accepted() {
        let descriptor =
            BindingDescriptor::trigger(BindingKind::ServiceInvocationTrigger, "payload")
                .build()
                .unwrap();
        assert_eq!(descriptor.option("methodName"), None);
        let defaulted = descriptor.with_defaults("CreateNewOrder");
        assert_eq!(defaulted.option("methodName"), Some("CreateNewOrder"));
    }

    #[test]
    fn empty_variable_is_rejected() {
        let err = BindingDescriptor::trigger(BindingKind::ServiceInvocationTrigger, "  ")
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyVariable);
    }

    #[test]
    fn outputs_cannot_declare_defaults() {
        let err = BindingDescriptor::output(BindingKind::PubSub, "message")
            .option("pubSubName", "bus")
            .option("topic", "B")
            .default_value("x")
            .build()
            .unwrap_err();
        assert!(matches!(err, ValidationError::OutputDefault { .. }));
    }

    #[test]
    fn topic_trigger_defaults_derive_route_from_topic() {
        let descriptor = BindingDescriptor::trigger(BindingKind::TopicTrigger, "payload")
            .option("pubSubName", "messagebus")
            .build()
            .unwrap()
            .with_defaults("PrintTopicMessage");
        assert_eq!(descriptor.option("topic"), Some("PrintTopicMessage"));
        assert_eq!(descriptor.option("route"), Some("/PrintTopicMessage"));
    }

    #[test]
    fn explicit_route_gains_leading_slash() {
        let descriptor = BindingDescriptor::trigger(BindingKind::TopicTrigger, "payload")
            .option("pubSubName", "messagebus")
            .option("topic", "A")
            .option("route", "orders")
            .build()
            .unwrap()
            .with_defaults("PrintTopicMessage");
        assert_eq!(descriptor.option("route"), Some("/orders"));

        let rooted = descriptor.with_defaults("PrintTopicMessage");
        assert_eq!(rooted.option("route"), Some("/orders"));
    }

    #[test]
    fn explicit_values_win_over_defaults() {
        let descriptor = BindingDescriptor::output(BindingKind::ServiceInvoke, "payload")
            .option("appId", "orders")
            .option("methodName", "create")
            .option("httpVerb", "put")
            .build()
            .unwrap()
            .with_defaults("InvokeOutputBinding");
        assert_eq!(descriptor.option("httpVerb"), Some("put"));
    }

    #[test]
    fn empty_required_option_is_reported_as_incomplete() {
        let descriptor = BindingDescriptor::trigger(BindingKind::TopicTrigger, "payload")
            .option("pubSubName", "")
            .option("topic", "B")
            .build()
            .unwrap()
            .with_defaults("PrintTopicMessage");
        assert_eq!(descriptor.incomplete_option(), Some("pubSubName"));
    }

    #[test]
    fn secret_metadata_parses_pairs() {
        let descriptor = BindingDescriptor::input(BindingKind::SecretStore, "secret")
            .option("secretStoreName", "kubernetes")
            .option("key", "my-secret")
            .option("metadata", "metadata.namespace=default&version=2")
            .build()
            .unwrap();
        assert_eq!(
            descriptor.metadata().unwrap(),
            vec![
                ("metadata.namespace".to_string(), "default".to_string()),
                ("version".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn malformed_metadata_is_rejected_at_construction() {
        let err = BindingDescriptor::input(BindingKind::SecretStore, "secret")
            .option("secretStoreName", "kubernetes")
            .option("key", "my-secret")
            .option("metadata", "namespace")
            .build()
            .unwrap_err();
        assert!(matches!(err, ValidationError::MalformedMetadata { .. }));
    }

    #[test]
    fn placeholder_metadata_is_deferred() {
        let descriptor = BindingDescriptor::input(BindingKind::SecretStore, "secret")
            .option("secretStoreName", "kubernetes")
            .option("key", "my-secret")
            .option("metadata", "%SecretMetadata%")
            .build();
        assert!(descriptor.is_ok());
    }

    #[test]
    fn map_options_leaves_original_untouched() {
        let declared = BindingDescriptor::output(BindingKind::PubSub, "message")
            .option("pubSubName", "%PubSubName%")
            .option("topic", "B")
            .build()
            .unwrap();
        let mapped = declared.map_options(|_, value| value.replace("%PubSubName%", "bus"));
        assert_eq!(declared.option("pubSubName"), Some("%PubSubName%"));
        assert_eq!(mapped.option("pubSubName"), Some("bus"));
    }
}
