use std::ops::Deref;
use std::sync::Arc;
use tracing::info;

use super::router::{DeliveryScope, TopicRouter};

/// Container-local relay
///
/// Same contract as the global [`EventBus`](super::EventBus) but only
/// reachable by the components the container hands it to. A container
/// creates one when it connects and calls [`ScopedRelay::teardown`] when
/// it disconnects; from then on every clone held by its children is quiet.
#[derive(Debug, Clone)]
pub struct ScopedRelay {
    router: Arc<TopicRouter>,
}

impl ScopedRelay {
    pub fn new(container: impl Into<String>) -> Self {
        let container = container.into();
        info!(container = %container, "Opening scoped relay");
        Self {
            router: Arc::new(TopicRouter::new(DeliveryScope::Container(container))),
        }
    }

    /// Label of the owning container
    pub fn container(&self) -> &str {
        match self.router.scope() {
            DeliveryScope::Container(label) => label,
            DeliveryScope::Global => "global",
        }
    }

    /// Drops every subscription; the relay stays quiet afterwards
    pub fn teardown(&self) {
        info!(container = %self.container(), "Closing scoped relay");
        self.router.clear();
    }
}

impl Deref for ScopedRelay {
    type Target = TopicRouter;

    fn deref(&self) -> &Self::Target {
        &self.router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Envelope, EventBus, KnownTopic};
    use serde_json::json;

    #[test]
    fn test_relay_does_not_leak_to_global_bus() {
        let bus = EventBus::new();
        let relay = ScopedRelay::new("sibling container #1");

        bus.subscribe_fn(KnownTopic::MessageSent, |_: &Envelope| Ok(()))
            .unwrap();
        relay
            .subscribe_fn(KnownTopic::MessageSent, |_: &Envelope| Ok(()))
            .unwrap();

        let report = relay
            .publish(KnownTopic::MessageSent, json!({"message": "psst"}))
            .unwrap();

        assert_eq!(report.delivered, 1);
        assert_eq!(bus.subscriber_count(KnownTopic::MessageSent), 1);
    }

    #[test]
    fn test_teardown_silences_every_clone() {
        let relay = ScopedRelay::new("parent #5");
        let child_copy = relay.clone();

        relay
            .subscribe_fn(KnownTopic::ChildResponse, |_: &Envelope| Ok(()))
            .unwrap();
        relay.teardown();

        let report = child_copy
            .publish(KnownTopic::ChildResponse, json!({"response": "Not now!"}))
            .unwrap();

        assert_eq!(report.delivered, 0);
        assert!(!child_copy.is_active());
        assert_eq!(relay.container(), "parent #5");
    }
}
