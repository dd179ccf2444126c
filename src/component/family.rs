use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

use super::{bound::BoundField, errors::ComponentError, id::ComponentId};
use crate::event::{
    Envelope, KnownTopic, OwnerId, PublishReport, ScopedRelay, Subscriber, SubscriberError,
};

/// The two answers a child can give
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildReply {
    Yes,
    NotNow,
}

impl ChildReply {
    pub fn text(&self) -> &'static str {
        match self {
            ChildReply::Yes => "Yes, I will!",
            ChildReply::NotNow => "Not now!",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChildResponsePayload {
    response: String,
}

#[derive(Debug, Default)]
struct ResponseLog {
    count: u32,
    last: Option<String>,
}

/// Parent side of the family demo
///
/// Talks down to its child by writing the child's `message` field and
/// hears back through a relay it owns, on the `child-response` topic.
pub struct ParentComponent {
    id: ComponentId,
    owner: OwnerId,
    relay: Option<ScopedRelay>,
    responses: Arc<Mutex<ResponseLog>>,
    child: ChildComponent,
}

impl ParentComponent {
    pub fn new() -> Self {
        let id = ComponentId::random();
        info!(component = "parent", id = %id, "Parent component constructed");
        Self {
            id,
            owner: OwnerId::new(),
            relay: None,
            responses: Arc::new(Mutex::new(ResponseLog::default())),
            child: ChildComponent::new("Be good!"),
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn is_connected(&self) -> bool {
        self.relay.is_some()
    }

    /// Opens the family relay and connects the child to it
    pub fn connect(&mut self) -> Result<(), ComponentError> {
        if self.relay.is_some() {
            debug!(component = "parent", id = %self.id, "Already connected");
            return Ok(());
        }

        info!(component = "parent", id = %self.id, "Setting up the family");

        let relay = ScopedRelay::new(format!("parent {}", self.id));
        relay.subscribe_for(
            self.owner,
            KnownTopic::ChildResponse,
            Arc::new(ResponseCounter {
                parent: self.id,
                log: self.responses.clone(),
            }),
        )?;

        self.child.connect(relay.clone());
        self.relay = Some(relay);
        Ok(())
    }

    /// Writes the child's message attribute
    pub fn send_to_child(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(
            component = "parent",
            id = %self.id,
            message = %message,
            "Sent message to child"
        );
        self.child.set_message(message);
    }

    pub fn child(&self) -> &ChildComponent {
        &self.child
    }

    pub fn response_count(&self) -> u32 {
        self.lock_responses().count
    }

    /// What the response panel shows
    pub fn response_text(&self) -> String {
        let log = self.lock_responses();
        match &log.last {
            None => "Waiting for response...".to_string(),
            Some(last) if log.count > 1 => format!("Child says: {} ({} times)", last, log.count),
            Some(last) => format!("Child says: {}", last),
        }
    }

    /// Closes the relay; the child stays attached but can no longer be heard
    pub fn disconnect(&mut self) {
        info!(component = "parent", id = %self.id, "Family disbanded, cleaning up");
        if let Some(relay) = self.relay.take() {
            relay.teardown();
        }
        self.child.disconnect();
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, ResponseLog> {
        self.responses.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ParentComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ParentComponent {
    fn drop(&mut self) {
        if self.relay.is_some() {
            self.disconnect();
        }
    }
}

struct ResponseCounter {
    parent: ComponentId,
    log: Arc<Mutex<ResponseLog>>,
}

impl Subscriber for ResponseCounter {
    fn on_message(&self, envelope: &Envelope) -> Result<(), SubscriberError> {
        let payload: ChildResponsePayload = envelope.payload_as()?;

        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.count += 1;
        log.last = Some(payload.response.clone());

        info!(
            component = "parent",
            id = %self.parent,
            response = %payload.response,
            count = log.count,
            "Received response from child"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "ParentComponent"
    }
}

/// Child side of the family demo
pub struct ChildComponent {
    id: ComponentId,
    message: BoundField<String>,
    messages_received: Arc<AtomicU32>,
    relay: Option<ScopedRelay>,
}

impl ChildComponent {
    pub fn new(initial_message: impl Into<String>) -> Self {
        let id = ComponentId::random();
        let messages_received = Arc::new(AtomicU32::new(0));
        let counter = messages_received.clone();

        let message = BoundField::new("message", initial_message.into()).with_hook(
            move |_old: &String, new: &String| {
                counter.fetch_add(1, Ordering::Relaxed);
                info!(
                    component = "child",
                    id = %id,
                    message = %new,
                    "Received message from parent"
                );
            },
        );

        info!(component = "child", id = %id, "Child component constructed");

        Self {
            id,
            message,
            messages_received,
            relay: None,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn message(&self) -> &str {
        self.message.get()
    }

    /// How many times the parent wrote the message attribute
    pub fn messages_received(&self) -> u32 {
        self.messages_received.load(Ordering::Relaxed)
    }

    fn set_message(&mut self, message: String) {
        self.message.set(message);
    }

    fn connect(&mut self, relay: ScopedRelay) {
        info!(component = "child", id = %self.id, "Child connected");
        self.relay = Some(relay);
    }

    fn disconnect(&mut self) {
        if self.relay.take().is_some() {
            info!(component = "child", id = %self.id, "Child disconnected");
        }
    }

    /// Answers the parent on the family relay
    pub fn respond(&self, reply: ChildReply) -> Result<PublishReport, ComponentError> {
        let relay = self
            .relay
            .as_ref()
            .ok_or_else(|| ComponentError::NotConnected(format!("child {}", self.id)))?;

        info!(
            component = "child",
            id = %self.id,
            response = reply.text(),
            "Responding to parent"
        );

        let report = relay.publish_from(
            format!("child {}", self.id),
            KnownTopic::ChildResponse,
            json!({ "response": reply.text() }),
        )?;
        Ok(report)
    }
}
