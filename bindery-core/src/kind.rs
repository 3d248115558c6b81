//! Binding kinds and their canonical option tables.
//!
//! Every kind carries exactly one option table per allowed direction. The
//! table lists which option keys may appear on a descriptor, which of them
//! must end up non-empty, and the default applied during finalization.

use crate::descriptor::Direction;
use std::{fmt, str::FromStr};

/// Option key naming the sidecar HTTP address. Accepted on every non-trigger kind.
pub const DAPR_ADDRESS: &str = "daprAddress";

/// The closed set of binding families understood by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BindingKind {
    /// Reads or saves a single state-store entry.
    StateStore,
    /// Publishes a message to a pub/sub topic.
    PubSub,
    /// Fires when a message arrives on a pub/sub topic.
    TopicTrigger,
    /// Fires when another application invokes a method on this one.
    ServiceInvocationTrigger,
    /// Invokes a method on another application.
    ServiceInvoke,
    /// Generic input/output binding (queues, cron, external systems).
    GenericBinding,
    /// Reads a secret from a secret store.
    SecretStore,
}

/// How raw payload values for a kind are turned into handler inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// The raw text or bytes are handed over unchanged.
    Passthrough,
    /// A CloudEvents envelope; the `data` field is unwrapped when present.
    CloudEvent,
    /// The payload must be a JSON object.
    JsonObject,
}

/// Where an option's value comes from when the declaration leaves it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    /// A fixed literal.
    Literal(&'static str),
    /// The name of the function the descriptor is registered under.
    FunctionName,
    /// Another option's (already defaulted) value with a prefix prepended.
    Derived {
        /// The option to copy from.
        from: &'static str,
        /// Text placed in front of the copied value.
        prefix: &'static str,
    },
}

/// One row of a kind's option table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSpec {
    /// Option key as written in declarations.
    pub name: &'static str,
    /// Whether the final value must be non-empty.
    pub required: bool,
    /// Value applied at finalization when the option is absent.
    pub default: Option<DefaultValue>,
}

impl OptionSpec {
    const fn required(name: &'static str) -> Self {
        Self {
            name,
            required: true,
            default: None,
        }
    }

    const fn optional(name: &'static str) -> Self {
        Self {
            name,
            required: false,
            default: None,
        }
    }

    const fn defaulted(name: &'static str, default: DefaultValue) -> Self {
        Self {
            name,
            required: true,
            default: Some(default),
        }
    }

    /// Whether a declaration may omit this option.
    pub fn may_be_omitted(&self) -> bool {
        !self.required || self.default.is_some()
    }
}

const STATE_STORE: &[OptionSpec] = &[
    OptionSpec::required("stateStore"),
    OptionSpec::required("key"),
    OptionSpec::optional(DAPR_ADDRESS),
];

const PUB_SUB: &[OptionSpec] = &[
    OptionSpec::required("pubSubName"),
    OptionSpec::required("topic"),
    OptionSpec::optional(DAPR_ADDRESS),
];

// `route` must come after `topic` so that a defaulted topic feeds the route.
const TOPIC_TRIGGER: &[OptionSpec] = &[
    OptionSpec::required("pubSubName"),
    OptionSpec::defaulted("topic", DefaultValue::FunctionName),
    OptionSpec::defaulted(
        "route",
        DefaultValue::Derived {
            from: "topic",
            prefix: "/",
        },
    ),
];

const SERVICE_INVOCATION_TRIGGER: &[OptionSpec] =
    &[OptionSpec::defaulted("methodName", DefaultValue::FunctionName)];

const SERVICE_INVOKE: &[OptionSpec] = &[
    OptionSpec::required("appId"),
    OptionSpec::required("methodName"),
    OptionSpec::defaulted("httpVerb", DefaultValue::Literal("POST")),
    OptionSpec::optional(DAPR_ADDRESS),
];

const BINDING_TRIGGER: &[OptionSpec] =
    &[OptionSpec::defaulted("bindingName", DefaultValue::FunctionName)];

const BINDING_OUTPUT: &[OptionSpec] = &[
    OptionSpec::required("bindingName"),
    OptionSpec::required("operation"),
    OptionSpec::optional(DAPR_ADDRESS),
];

const SECRET_STORE: &[OptionSpec] = &[
    OptionSpec::required("secretStoreName"),
    OptionSpec::required("key"),
    OptionSpec::optional("metadata"),
    OptionSpec::optional(DAPR_ADDRESS),
];

impl BindingKind {
    /// Every kind, in declaration order.
    pub const ALL: [BindingKind; 7] = [
        BindingKind::StateStore,
        BindingKind::PubSub,
        BindingKind::TopicTrigger,
        BindingKind::ServiceInvocationTrigger,
        BindingKind::ServiceInvoke,
        BindingKind::GenericBinding,
        BindingKind::SecretStore,
    ];

    /// The tag used for this kind in manifests and log output.
    pub const fn tag(self) -> &'static str {
        match self {
            BindingKind::StateStore => "state-store",
            BindingKind::PubSub => "pub-sub",
            BindingKind::TopicTrigger => "topic-trigger",
            BindingKind::ServiceInvocationTrigger => "service-invocation-trigger",
            BindingKind::ServiceInvoke => "service-invoke",
            BindingKind::GenericBinding => "generic-binding",
            BindingKind::SecretStore => "secret-store",
        }
    }

    /// Directions a descriptor of this kind may declare.
    pub const fn directions(self) -> &'static [Direction] {
        match self {
            BindingKind::StateStore => &[Direction::In, Direction::Out],
            BindingKind::PubSub | BindingKind::ServiceInvoke => &[Direction::Out],
            BindingKind::TopicTrigger | BindingKind::ServiceInvocationTrigger => {
                &[Direction::Trigger]
            }
            BindingKind::GenericBinding => &[Direction::Out, Direction::Trigger],
            BindingKind::SecretStore => &[Direction::In],
        }
    }

    /// Whether `direction` is allowed for this kind.
    pub fn supports(self, direction: Direction) -> bool {
        self.directions().contains(&direction)
    }

    /// The option table for this kind used in `direction`.
    ///
    /// Returns an empty table for unsupported directions.
    pub const fn options(self, direction: Direction) -> &'static [OptionSpec] {
        match (self, direction) {
            (BindingKind::StateStore, Direction::In | Direction::Out) => STATE_STORE,
            (BindingKind::PubSub, Direction::Out) => PUB_SUB,
            (BindingKind::TopicTrigger, Direction::Trigger) => TOPIC_TRIGGER,
            (BindingKind::ServiceInvocationTrigger, Direction::Trigger) => {
                SERVICE_INVOCATION_TRIGGER
            }
            (BindingKind::ServiceInvoke, Direction::Out) => SERVICE_INVOKE,
            (BindingKind::GenericBinding, Direction::Trigger) => BINDING_TRIGGER,
            (BindingKind::GenericBinding, Direction::Out) => BINDING_OUTPUT,
            (BindingKind::SecretStore, Direction::In) => SECRET_STORE,
            _ => &[],
        }
    }

    /// Looks up a single option row.
    pub fn option(self, direction: Direction, name: &str) -> Option<&'static OptionSpec> {
        self.options(direction).iter().find(|spec| spec.name == name)
    }

    /// How raw payload values for this kind are decoded.
    pub const fn payload_shape(self) -> PayloadShape {
        match self {
            BindingKind::TopicTrigger => PayloadShape::CloudEvent,
            BindingKind::SecretStore => PayloadShape::JsonObject,
            _ => PayloadShape::Passthrough,
        }
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error returned when a direction or kind tag is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what} `{tag}`")]
pub struct UnknownTag {
    /// What was being parsed (`"kind"` or `"direction"`).
    pub what: &'static str,
    /// The rejected input.
    pub tag: String,
}

impl FromStr for BindingKind {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BindingKind::ALL
            .into_iter()
            .find(|kind| kind.tag().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownTag {
                what: "kind",
                tag: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_from_str() {
        for kind in BindingKind::ALL {
            assert_eq!(kind.tag().parse::<BindingKind>(), Ok(kind));
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = "queue-trigger".parse::<BindingKind>().unwrap_err();
        assert_eq!(err.what, "kind");
        assert_eq!(err.tag, "queue-trigger");
    }

    #[test]
    fn generic_binding_tables_depend_on_direction() {
        let kind = BindingKind::GenericBinding;
        assert!(kind.option(Direction::Out, "operation").is_some());
        assert!(kind.option(Direction::Trigger, "operation").is_none());
        assert!(kind.options(Direction::In).is_empty());
    }

    #[test]
    fn route_follows_topic_in_table_order() {
        let names: Vec<_> = BindingKind::TopicTrigger
            .options(Direction::Trigger)
            .iter()
            .map(|spec| spec.name)
            .collect();
        let topic = names.iter().position(|n| *n == "topic").unwrap();
        let route = names.iter().position(|n| *n == "route").unwrap();
        assert!(topic < route);
    }
}
