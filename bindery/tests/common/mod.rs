#![allow(dead_code)]

use bindery::{BindingDescriptor, BindingKind, Environment, Registry};

// ============================================================================
// Descriptors
// ============================================================================

pub fn topic_trigger(variable: &str, pubsub: &str, topic: &str) -> BindingDescriptor {
    BindingDescriptor::trigger(BindingKind::TopicTrigger, variable)
        .option("pubSubName", pubsub)
        .option("topic", topic)
        .build()
        .unwrap()
}

pub fn invocation_trigger(variable: &str) -> BindingDescriptor {
    BindingDescriptor::trigger(BindingKind::ServiceInvocationTrigger, variable)
        .build()
        .unwrap()
}

pub fn state_output(variable: &str, store: &str, key: &str) -> BindingDescriptor {
    BindingDescriptor::output(BindingKind::StateStore, variable)
        .option("stateStore", store)
        .option("key", key)
        .build()
        .unwrap()
}

pub fn publish_output(variable: &str, pubsub: &str, topic: &str) -> BindingDescriptor {
    BindingDescriptor::output(BindingKind::PubSub, variable)
        .option("pubSubName", pubsub)
        .option("topic", topic)
        .build()
        .unwrap()
}

// ============================================================================
// Sample deployment
// ============================================================================

pub fn sample_env() -> Environment {
    Environment::new()
        .with("PubSubName", "messagebus")
        .with("StateStoreName", "statestore")
}

/// The order and messaging functions used across integration tests.
pub fn sample_registry() -> Registry {
    let mut registry = Registry::new();

    registry
        .register("PrintTopicMessage", topic_trigger("payload", "%PubSubName%", "B"))
        .unwrap();

    registry
        .register("CreateNewOrder", invocation_trigger("payload"))
        .unwrap();
    registry
        .register("CreateNewOrder", state_output("product", "%StateStoreName%", "order"))
        .unwrap();

    registry
        .register(
            "TransferEventBetweenTopics",
            topic_trigger("subEvent", "%PubSubName%", "A"),
        )
        .unwrap();
    registry
        .register(
            "TransferEventBetweenTopics",
            publish_output("pubEvent", "%PubSubName%", "B"),
        )
        .unwrap();

    registry
}
