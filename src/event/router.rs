use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    envelope::Envelope,
    handler::{FnSubscriber, Subscriber, SubscriberError},
    topic::Topic,
};

/// Errors returned to the immediate caller of a router operation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouterError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Boundary within which a router's subscribers are reachable
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "container", rename_all = "snake_case")]
pub enum DeliveryScope {
    /// The process-wide bus, alive for the whole process
    Global,
    /// A relay owned by one container, alive while the container is connected
    Container(String),
}

impl fmt::Display for DeliveryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryScope::Global => f.write_str("global"),
            DeliveryScope::Container(label) => write!(f, "container:{}", label),
        }
    }
}

/// Unique identifier of one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifies the consumer that owns a group of subscriptions
///
/// Components tag their registrations with an owner so they can drop all of
/// them at once when they disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(Uuid);

impl OwnerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Returned by `subscribe`, consumed by `unsubscribe`
///
/// Handles are plain values: dropping one does not unsubscribe. A handle
/// from another router, or one whose subscription is already gone, is
/// simply ignored by `unsubscribe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    id: SubscriptionId,
    topic: Topic,
}

impl SubscriptionHandle {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }
}

/// One subscriber that failed during a dispatch
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryFailure {
    pub subscription: SubscriptionId,
    pub subscriber: String,
    pub error: SubscriberError,
}

/// Outcome of a single `publish`
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub topic: Topic,
    /// Number of subscribers invoked, failed ones included
    pub delivered: usize,
    pub failures: Vec<DeliveryFailure>,
}

impl PublishReport {
    fn quiet(topic: Topic) -> Self {
        Self {
            topic,
            delivered: 0,
            failures: Vec::new(),
        }
    }

    /// Subscribers that handled the message without error
    pub fn succeeded(&self) -> usize {
        self.delivered - self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Clone)]
struct Subscription {
    id: SubscriptionId,
    owner: Option<OwnerId>,
    subscriber: Arc<dyn Subscriber>,
}

struct RouterState {
    active: bool,
    topics: HashMap<Topic, Vec<Subscription>>,
}

/// Topic-based publish/subscribe with synchronous, snapshot-based fan-out
///
/// Each topic keeps its subscriptions in registration order. `publish`
/// copies the list for the topic, releases the lock and then calls every
/// subscriber in that copy, so callbacks that subscribe or unsubscribe
/// (on any topic) only affect later publishes.
///
/// A failing or panicking subscriber is recorded in the [`PublishReport`]
/// and the remaining subscribers are still called.
///
/// After [`TopicRouter::clear`] the router is quiet for good: publishes
/// deliver nothing and subscribes register nothing.
pub struct TopicRouter {
    scope: DeliveryScope,
    state: RwLock<RouterState>,
}

impl TopicRouter {
    pub fn new(scope: DeliveryScope) -> Self {
        Self {
            scope,
            state: RwLock::new(RouterState {
                active: true,
                topics: HashMap::new(),
            }),
        }
    }

    pub fn scope(&self) -> &DeliveryScope {
        &self.scope
    }

    /// Registers a subscriber for `topic`, after any existing ones
    pub fn subscribe(
        &self,
        topic: impl AsRef<str>,
        subscriber: Arc<dyn Subscriber>,
    ) -> Result<SubscriptionHandle, RouterError> {
        self.register(topic.as_ref(), None, subscriber)
    }

    /// Registers a closure for `topic`
    pub fn subscribe_fn<F>(
        &self,
        topic: impl AsRef<str>,
        callback: F,
    ) -> Result<SubscriptionHandle, RouterError>
    where
        F: Fn(&Envelope) -> Result<(), SubscriberError> + Send + Sync + 'static,
    {
        self.register(topic.as_ref(), None, Arc::new(FnSubscriber::new(callback)))
    }

    /// Registers a subscriber on behalf of `owner`, see [`TopicRouter::unsubscribe_owner`]
    pub fn subscribe_for(
        &self,
        owner: OwnerId,
        topic: impl AsRef<str>,
        subscriber: Arc<dyn Subscriber>,
    ) -> Result<SubscriptionHandle, RouterError> {
        self.register(topic.as_ref(), Some(owner), subscriber)
    }

    fn register(
        &self,
        topic: &str,
        owner: Option<OwnerId>,
        subscriber: Arc<dyn Subscriber>,
    ) -> Result<SubscriptionHandle, RouterError> {
        let topic = Topic::new(topic)?;
        let handle = SubscriptionHandle {
            id: SubscriptionId(Uuid::new_v4()),
            topic: topic.clone(),
        };

        let mut state = self.write_state();
        if !state.active {
            debug!(
                scope = %self.scope,
                topic = %topic,
                subscriber = subscriber.name(),
                "Router torn down - ignoring subscription"
            );
            return Ok(handle);
        }

        debug!(
            scope = %self.scope,
            topic = %topic,
            subscriber = subscriber.name(),
            subscription = %handle.id,
            "Subscriber registered"
        );

        state.topics.entry(topic).or_default().push(Subscription {
            id: handle.id,
            owner,
            subscriber,
        });

        Ok(handle)
    }

    /// Removes the subscription behind `handle`
    ///
    /// Returns whether anything was removed. Unknown or already removed
    /// handles are a no-op.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        let mut state = self.write_state();

        let Some(subscriptions) = state.topics.get_mut(&handle.topic) else {
            return false;
        };

        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != handle.id);
        let removed = subscriptions.len() < before;

        if subscriptions.is_empty() {
            state.topics.remove(&handle.topic);
        }

        if removed {
            debug!(
                scope = %self.scope,
                topic = %handle.topic,
                subscription = %handle.id,
                "Subscriber removed"
            );
        }

        removed
    }

    /// Removes every subscription registered for `owner`, on all topics
    pub fn unsubscribe_owner(&self, owner: OwnerId) -> usize {
        let mut state = self.write_state();
        let mut removed = 0;

        state.topics.retain(|_, subscriptions| {
            let before = subscriptions.len();
            subscriptions.retain(|s| s.owner != Some(owner));
            removed += before - subscriptions.len();
            !subscriptions.is_empty()
        });

        if removed > 0 {
            debug!(scope = %self.scope, removed = removed, "Owner subscriptions removed");
        }

        removed
    }

    /// Publishes `payload` on `topic` with no origin
    pub fn publish(
        &self,
        topic: impl AsRef<str>,
        payload: serde_json::Value,
    ) -> Result<PublishReport, RouterError> {
        let topic = Topic::new(topic.as_ref())?;
        Ok(self.dispatch(Envelope::new(topic, payload, None)))
    }

    /// Publishes `payload` on `topic`, recording who sent it
    pub fn publish_from(
        &self,
        origin: impl Into<String>,
        topic: impl AsRef<str>,
        payload: serde_json::Value,
    ) -> Result<PublishReport, RouterError> {
        let topic = Topic::new(topic.as_ref())?;
        Ok(self.dispatch(Envelope::new(topic, payload, Some(origin.into()))))
    }

    fn dispatch(&self, envelope: Envelope) -> PublishReport {
        // Snapshot under the lock, deliver without it
        let snapshot: Vec<Subscription> = {
            let state = self.read_state();
            if !state.active {
                debug!(
                    scope = %self.scope,
                    topic = %envelope.topic,
                    "Router torn down - publish dropped"
                );
                return PublishReport::quiet(envelope.topic);
            }
            state
                .topics
                .get(&envelope.topic)
                .cloned()
                .unwrap_or_default()
        };

        let mut report = PublishReport::quiet(envelope.topic.clone());

        for subscription in &snapshot {
            report.delivered += 1;

            if let Err(error) = deliver(subscription, &envelope) {
                warn!(
                    scope = %self.scope,
                    topic = %envelope.topic,
                    subscriber = subscription.subscriber.name(),
                    subscription = %subscription.id,
                    error = %error,
                    "Subscriber failed - continuing with remaining subscribers"
                );
                report.failures.push(DeliveryFailure {
                    subscription: subscription.id,
                    subscriber: subscription.subscriber.name().to_string(),
                    error,
                });
            }
        }

        debug!(
            scope = %self.scope,
            topic = %envelope.topic,
            origin = ?envelope.origin,
            delivered = report.delivered,
            failed = report.failures.len(),
            "Message published"
        );

        report
    }

    /// Tears the router down: drops every subscription and goes quiet
    pub fn clear(&self) {
        let mut state = self.write_state();
        let dropped: usize = state.topics.values().map(Vec::len).sum();
        state.topics.clear();
        state.active = false;

        info!(scope = %self.scope, dropped = dropped, "Router torn down");
    }

    pub fn is_active(&self) -> bool {
        self.read_state().active
    }

    pub fn subscriber_count(&self, topic: impl AsRef<str>) -> usize {
        self.read_state()
            .topics
            .get(topic.as_ref())
            .map_or(0, Vec::len)
    }

    /// Topics that currently have at least one subscriber, sorted
    pub fn topics(&self) -> Vec<Topic> {
        let mut topics: Vec<Topic> = self.read_state().topics.keys().cloned().collect();
        topics.sort();
        topics
    }

    // Subscribers run outside the lock, so a poisoned lock only means a
    // panic while the map itself was being edited; the map is still whole.
    fn read_state(&self) -> RwLockReadGuard<'_, RouterState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, RouterState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for TopicRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopicRouter")
            .field("scope", &self.scope)
            .field("active", &self.is_active())
            .field("topics", &self.topics())
            .finish()
    }
}

fn deliver(subscription: &Subscription, envelope: &Envelope) -> Result<(), SubscriberError> {
    let subscriber = &subscription.subscriber;
    match panic::catch_unwind(AssertUnwindSafe(|| subscriber.on_message(envelope))) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(SubscriberError::Panicked(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Arc<dyn Subscriber>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let make_log = log.clone();
        let make = move |label: &str| -> Arc<dyn Subscriber> {
            let log = make_log.clone();
            let label = label.to_string();
            Arc::new(FnSubscriber::named(label.clone(), move |_: &Envelope| {
                log.lock().unwrap().push(label.clone());
                Ok(())
            }))
        };
        (log, make)
    }

    #[test]
    fn test_publish_without_subscribers_delivers_nothing() {
        let router = TopicRouter::new(DeliveryScope::Global);

        let report = router.publish("nobody-listens", json!({})).unwrap();

        assert_eq!(report.delivered, 0);
        assert!(report.is_clean());
    }

    #[test]
    fn test_empty_topic_is_invalid_argument() {
        let router = TopicRouter::new(DeliveryScope::Global);

        let subscribe = router.subscribe("", Arc::new(crate::event::NoOpSubscriber));
        let publish = router.publish("", json!({}));

        assert!(matches!(subscribe, Err(RouterError::InvalidArgument(_))));
        assert!(matches!(publish, Err(RouterError::InvalidArgument(_))));
    }

    #[test]
    fn test_same_subscriber_registered_twice_is_called_twice() {
        let router = TopicRouter::new(DeliveryScope::Global);
        let (log, make) = recorder();
        let subscriber = make("twice");

        router.subscribe("t", subscriber.clone()).unwrap();
        router.subscribe("t", subscriber).unwrap();
        let report = router.publish("t", json!(null)).unwrap();

        assert_eq!(report.delivered, 2);
        assert_eq!(*log.lock().unwrap(), vec!["twice", "twice"]);
    }

    #[test]
    fn test_unsubscribe_keeps_order_of_remaining() {
        let router = TopicRouter::new(DeliveryScope::Global);
        let (log, make) = recorder();

        router.subscribe("t", make("a")).unwrap();
        let b = router.subscribe("t", make("b")).unwrap();
        router.subscribe("t", make("c")).unwrap();

        assert!(router.unsubscribe(&b));
        router.publish("t", json!(null)).unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["a", "c"]);
    }

    #[test]
    fn test_handle_from_another_router_is_ignored() {
        let first = TopicRouter::new(DeliveryScope::Global);
        let second = TopicRouter::new(DeliveryScope::Container("box".to_string()));

        let handle = first
            .subscribe("t", Arc::new(crate::event::NoOpSubscriber))
            .unwrap();
        second
            .subscribe("t", Arc::new(crate::event::NoOpSubscriber))
            .unwrap();

        assert!(!second.unsubscribe(&handle));
        assert_eq!(second.subscriber_count("t"), 1);
        assert_eq!(first.subscriber_count("t"), 1);
    }

    #[test]
    fn test_unsubscribe_owner_removes_only_that_owner() {
        let router = TopicRouter::new(DeliveryScope::Global);
        let (log, make) = recorder();
        let owner = OwnerId::new();

        router.subscribe_for(owner, "x", make("owned-x")).unwrap();
        router.subscribe_for(owner, "y", make("owned-y")).unwrap();
        router.subscribe("x", make("other")).unwrap();

        assert_eq!(router.unsubscribe_owner(owner), 2);
        assert_eq!(router.unsubscribe_owner(owner), 0);

        router.publish("x", json!(null)).unwrap();
        router.publish("y", json!(null)).unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["other"]);
        assert_eq!(router.topics(), vec![Topic::new("x").unwrap()]);
    }

    #[test]
    fn test_panicking_subscriber_is_reported() {
        let router = TopicRouter::new(DeliveryScope::Global);
        let (log, make) = recorder();

        router
            .subscribe_fn("t", |_: &Envelope| -> Result<(), SubscriberError> {
                panic!("listener exploded")
            })
            .unwrap();
        router.subscribe("t", make("after")).unwrap();

        let report = router.publish("t", json!(null)).unwrap();

        assert_eq!(report.delivered, 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(
            report.failures[0].error,
            SubscriberError::Panicked("listener exploded".to_string())
        );
        assert_eq!(*log.lock().unwrap(), vec!["after"]);
    }

    #[test]
    fn test_subscribe_after_clear_registers_nothing() {
        let router = TopicRouter::new(DeliveryScope::Container("playground".to_string()));
        router.clear();

        let handle = router
            .subscribe("t", Arc::new(crate::event::NoOpSubscriber))
            .unwrap();

        assert!(!router.is_active());
        assert_eq!(router.subscriber_count("t"), 0);
        assert!(!router.unsubscribe(&handle));
    }

    #[test]
    fn test_publish_from_sets_origin() {
        let router = TopicRouter::new(DeliveryScope::Global);
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();

        router
            .subscribe_fn("t", move |envelope: &Envelope| {
                *sink.lock().unwrap() = envelope.origin.clone();
                Ok(())
            })
            .unwrap();
        router.publish_from("sender #7", "t", json!({})).unwrap();

        assert_eq!(seen.lock().unwrap().as_deref(), Some("sender #7"));
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(DeliveryScope::Global.to_string(), "global");
        assert_eq!(
            DeliveryScope::Container("parent #12".to_string()).to_string(),
            "container:parent #12"
        );
    }
}
