//! Sidecar request shapes derived from finalized bindings.
//!
//! The registry and dispatcher never talk to a sidecar themselves. These
//! types describe what the host has to send: the request that fetches each
//! input, the body that delivers each staged output, and the topic
//! subscriptions to advertise.

use crate::registry::{BindingTable, ResolvedBindingSet};
use bindery_core::{BindingDescriptor, BindingKind, DAPR_ADDRESS, Direction, Outputs};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A topic subscription as advertised to the sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicSubscription {
    /// Pub/sub component name.
    pub pubsubname: String,
    /// Topic name.
    pub topic: String,
    /// HTTP route the sidecar delivers events to.
    pub route: String,
}

/// A request to fetch a state entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetStateRequest {
    /// Sidecar address override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dapr_address: Option<String>,
    /// State store component name.
    pub state_store: String,
    /// State key.
    pub key: String,
}

/// A request to fetch a secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSecretRequest {
    /// Sidecar address override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dapr_address: Option<String>,
    /// Secret store component name.
    pub secret_store_name: String,
    /// Secret key.
    pub key: String,
    /// Query metadata, parsed from the `metadata` option.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// What the host must fetch before invoking the handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InputRequest {
    /// Read a state entry.
    GetState(GetStateRequest),
    /// Read a secret.
    GetSecret(GetSecretRequest),
}

/// One record of a save-state request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateRecord {
    /// State key.
    pub key: String,
    /// Value to save.
    pub value: Value,
}

/// Body for saving state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveStateRequest {
    /// Sidecar address override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dapr_address: Option<String>,
    /// State store component name.
    pub state_store: String,
    /// Records to save.
    pub records: Vec<StateRecord>,
}

/// Body for publishing to a topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    /// Sidecar address override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dapr_address: Option<String>,
    /// Pub/sub component name.
    #[serde(rename = "pubsubname")]
    pub pubsub_name: String,
    /// Topic name.
    pub topic: String,
    /// Message payload.
    pub payload: Value,
}

/// Body for invoking a method on another application.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeMethodRequest {
    /// Sidecar address override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dapr_address: Option<String>,
    /// Target application id.
    pub app_id: String,
    /// Target method.
    pub method_name: String,
    /// HTTP verb, upper-cased.
    pub http_verb: String,
    /// Request body.
    pub body: Value,
}

/// Body for a generic output binding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingRequest {
    /// Sidecar address override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dapr_address: Option<String>,
    /// Binding component name.
    pub binding_name: String,
    /// Binding operation.
    pub operation: String,
    /// Binding data.
    pub data: Value,
}

/// What the host must send for one staged output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutputEnvelope {
    /// Save state.
    SaveState(SaveStateRequest),
    /// Publish a message.
    Publish(PublishRequest),
    /// Invoke a remote method.
    InvokeMethod(InvokeMethodRequest),
    /// Call a generic output binding.
    Binding(BindingRequest),
}

fn option(descriptor: &BindingDescriptor, name: &str) -> String {
    descriptor.option(name).unwrap_or_default().to_string()
}

fn address(descriptor: &BindingDescriptor) -> Option<String> {
    descriptor
        .option(DAPR_ADDRESS)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
}

impl ResolvedBindingSet {
    /// The topic subscription for a topic-triggered function.
    pub fn subscription(&self) -> Option<TopicSubscription> {
        let trigger = self.trigger();
        (trigger.kind() == BindingKind::TopicTrigger).then(|| TopicSubscription {
            pubsubname: option(trigger, "pubSubName"),
            topic: option(trigger, "topic"),
            route: option(trigger, "route"),
        })
    }

    /// The HTTP route the host listens on for this function's trigger.
    pub fn trigger_route(&self) -> String {
        let trigger = self.trigger();
        let path = match trigger.kind() {
            BindingKind::TopicTrigger => option(trigger, "route"),
            BindingKind::ServiceInvocationTrigger => option(trigger, "methodName"),
            _ => option(trigger, "bindingName"),
        };
        if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        }
    }

    /// The fetch request for every input binding, keyed by variable.
    pub fn input_requests(&self) -> BTreeMap<String, InputRequest> {
        self.iter()
            .filter(|d| d.direction() == Direction::In)
            .filter_map(|d| {
                let request = match d.kind() {
                    BindingKind::StateStore => InputRequest::GetState(GetStateRequest {
                        dapr_address: address(d),
                        state_store: option(d, "stateStore"),
                        key: option(d, "key"),
                    }),
                    BindingKind::SecretStore => InputRequest::GetSecret(GetSecretRequest {
                        dapr_address: address(d),
                        secret_store_name: option(d, "secretStoreName"),
                        key: option(d, "key"),
                        // `finalize` rejects malformed metadata, so this cannot fail here.
                        metadata: d.metadata().unwrap_or_default().into_iter().collect(),
                    }),
                    _ => return None,
                };
                Some((d.variable().to_string(), request))
            })
            .collect()
    }

    /// Render staged outputs into sidecar request bodies, keyed by variable.
    ///
    /// Values under names that are not declared outputs are ignored.
    pub fn envelopes(&self, outputs: &Outputs) -> BTreeMap<String, OutputEnvelope> {
        self.outputs()
            .filter_map(|d| {
                let value = outputs.get(d.variable())?.to_json();
                let envelope = match d.kind() {
                    BindingKind::StateStore => OutputEnvelope::SaveState(SaveStateRequest {
                        dapr_address: address(d),
                        state_store: option(d, "stateStore"),
                        records: vec![StateRecord {
                            key: option(d, "key"),
                            value,
                        }],
                    }),
                    BindingKind::PubSub => OutputEnvelope::Publish(PublishRequest {
                        dapr_address: address(d),
                        pubsub_name: option(d, "pubSubName"),
                        topic: option(d, "topic"),
                        payload: value,
                    }),
                    BindingKind::ServiceInvoke => OutputEnvelope::InvokeMethod(InvokeMethodRequest {
                        dapr_address: address(d),
                        app_id: option(d, "appId"),
                        method_name: option(d, "methodName"),
                        http_verb: option(d, "httpVerb").to_ascii_uppercase(),
                        body: value,
                    }),
                    BindingKind::GenericBinding => OutputEnvelope::Binding(BindingRequest {
                        dapr_address: address(d),
                        binding_name: option(d, "bindingName"),
                        operation: option(d, "operation"),
                        data: value,
                    }),
                    _ => return None,
                };
                Some((d.variable().to_string(), envelope))
            })
            .collect()
    }
}

impl BindingTable {
    /// Every topic subscription in the table, in function order.
    pub fn subscriptions(&self) -> Vec<TopicSubscription> {
        self.iter().filter_map(|set| set.subscription()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{environment::Environment, registry::Registry};
    use serde_json::json;

    fn transfer_set() -> ResolvedBindingSet {
        let trigger = BindingDescriptor::trigger(BindingKind::TopicTrigger, "topicMessage")
            .option("pubSubName", "%PubSubName%")
            .option("topic", "A")
            .build()
            .unwrap();
        let publish = BindingDescriptor::output(BindingKind::PubSub, "state")
            .option("pubSubName", "%PubSubName%")
            .option("topic", "B")
            .build()
            .unwrap();
        let save = BindingDescriptor::output(BindingKind::StateStore, "product")
            .option("stateStore", "statestore")
            .option("key", "order")
            .option("daprAddress", "http://localhost:3501")
            .build()
            .unwrap();
        Registry::new()
            .with_binding("TransferEventBetweenTopics", trigger)
            .unwrap()
            .with_binding("TransferEventBetweenTopics", publish)
            .unwrap()
            .with_binding("TransferEventBetweenTopics", save)
            .unwrap()
            .bind(
                "TransferEventBetweenTopics",
                &Environment::new().with("PubSubName", "messagebus"),
            )
            .unwrap()
    }

    #[test]
    fn topic_trigger_yields_subscription() {
        let set = transfer_set();
        assert_eq!(
            set.subscription(),
            Some(TopicSubscription {
                pubsubname: "messagebus".into(),
                topic: "A".into(),
                route: "/A".into(),
            })
        );
        assert_eq!(set.trigger_route(), "/A");
    }

    #[test]
    fn explicit_route_matches_listening_route() {
        let trigger = BindingDescriptor::trigger(BindingKind::TopicTrigger, "payload")
            .option("pubSubName", "messagebus")
            .option("topic", "A")
            .option("route", "orders")
            .build()
            .unwrap();
        let set = Registry::new()
            .with_binding("PrintTopicMessage", trigger)
            .unwrap()
            .finalize("PrintTopicMessage")
            .unwrap();

        let subscription = set.subscription().unwrap();
        assert_eq!(subscription.route, "/orders");
        assert_eq!(set.trigger_route(), subscription.route);
    }

    #[test]
    fn only_set_outputs_are_rendered() {
        let set = transfer_set();
        let mut outputs = Outputs::new();
        outputs.set("state", r#"{"payload":"Transfer from Topic A: hi"}"#);
        let envelopes = set.envelopes(&outputs);
        assert_eq!(envelopes.len(), 1);
        let rendered = serde_json::to_value(&envelopes["state"]).unwrap();
        assert_eq!(
            rendered,
            json!({
                "type": "publish",
                "pubsubname": "messagebus",
                "topic": "B",
                "payload": { "payload": "Transfer from Topic A: hi" }
            })
        );
    }

    #[test]
    fn state_envelope_carries_address_and_record() {
        let set = transfer_set();
        let outputs: Outputs = [("product", "plain text")].into_iter().collect();
        let rendered = serde_json::to_value(&set.envelopes(&outputs)["product"]).unwrap();
        assert_eq!(
            rendered,
            json!({
                "type": "save-state",
                "daprAddress": "http://localhost:3501",
                "stateStore": "statestore",
                "records": [{ "key": "order", "value": "plain text" }]
            })
        );
    }

    #[test]
    fn invoke_envelope_uses_default_verb() {
        let trigger = BindingDescriptor::trigger(BindingKind::ServiceInvocationTrigger, "req")
            .build()
            .unwrap();
        let invoke = BindingDescriptor::output(BindingKind::ServiceInvoke, "payload")
            .option("appId", "orders")
            .option("methodName", "CreateNewOrder")
            .build()
            .unwrap();
        let set = Registry::new()
            .with_binding("InvokeOutputBinding", trigger)
            .unwrap()
            .with_binding("InvokeOutputBinding", invoke)
            .unwrap()
            .finalize("InvokeOutputBinding")
            .unwrap();
        assert_eq!(set.trigger_route(), "/InvokeOutputBinding");

        let outputs: Outputs = [("payload", r#"{"body":"x"}"#)].into_iter().collect();
        let OutputEnvelope::InvokeMethod(request) = &set.envelopes(&outputs)["payload"] else {
            panic!("expected an invoke envelope");
        };
        assert_eq!(request.http_verb, "POST");
        assert_eq!(request.body, json!({ "body": "x" }));
    }

    #[test]
    fn secret_input_request_parses_metadata() {
        let trigger = BindingDescriptor::trigger(BindingKind::ServiceInvocationTrigger, "args")
            .option("methodName", "RetrieveSecret")
            .build()
            .unwrap();
        let secret = BindingDescriptor::input(BindingKind::SecretStore, "secret")
            .option("secretStoreName", "kubernetes")
            .option("key", "my-secret")
            .option("metadata", "metadata.namespace=default")
            .build()
            .unwrap();
        let set = Registry::new()
            .with_binding("RetrieveSecret", trigger)
            .unwrap()
            .with_binding("RetrieveSecret", secret)
            .unwrap()
            .finalize("RetrieveSecret")
            .unwrap();

        let requests = set.input_requests();
        let rendered = serde_json::to_value(&requests["secret"]).unwrap();
        assert_eq!(
            rendered,
            json!({
                "type": "get-secret",
                "secretStoreName": "kubernetes",
                "key": "my-secret",
                "metadata": { "metadata.namespace": "default" }
            })
        );
        assert_eq!(set.subscription(), None);
    }

    #[test]
    fn table_lists_subscriptions() {
        let set = transfer_set();
        let table: BindingTable = [set].into_iter().collect();
        assert_eq!(table.subscriptions().len(), 1);
    }
}
