use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

use super::{bound::BoundField, errors::ComponentError, id::ComponentId};
use crate::event::{
    Envelope, KnownTopic, OwnerId, PublishReport, ScopedRelay, Subscriber, SubscriberError,
};

/// Messages a receiver keeps, newest first
pub const RECEIVER_HISTORY: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MessageSentPayload {
    message: String,
    sender: String,
}

/// One message as a receiver saw it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceivedMessage {
    pub text: String,
    pub sender: String,
    pub received_at: DateTime<Utc>,
}

/// Name for the receiver at `index`: X, Y, Z, then R4, R5, ...
pub fn receiver_name(index: usize) -> String {
    match index {
        0..=2 => char::from(b'X' + index as u8).to_string(),
        _ => format!("R{}", index + 1),
    }
}

/// Container of the sibling demo
///
/// Siblings never see each other. Senders publish `message-sent` on the
/// container's relay, the container logs the hop, and every receiver
/// subscribed to that relay gets the message.
pub struct SiblingContainer {
    id: ComponentId,
    owner: OwnerId,
    relay: Option<ScopedRelay>,
    relayed: Arc<AtomicU32>,
    senders: Vec<SiblingSender>,
    receivers: Vec<SiblingReceiver>,
}

impl SiblingContainer {
    pub fn new() -> Self {
        let id = ComponentId::random();
        info!(component = "sibling-container", id = %id, "Sibling container constructed");
        Self {
            id,
            owner: OwnerId::new(),
            relay: None,
            relayed: Arc::new(AtomicU32::new(0)),
            senders: vec![SiblingSender::new("A"), SiblingSender::new("B")],
            receivers: (0..2).map(|i| SiblingReceiver::new(receiver_name(i))).collect(),
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn connect(&mut self) -> Result<(), ComponentError> {
        if self.relay.is_some() {
            debug!(component = "sibling-container", id = %self.id, "Already connected");
            return Ok(());
        }

        info!(component = "sibling-container", id = %self.id, "Setting up the playground");

        let relay = ScopedRelay::new(format!("sibling container {}", self.id));

        // The container hears every message first, receivers follow in order
        relay.subscribe_for(
            self.owner,
            KnownTopic::MessageSent,
            Arc::new(RelayLogger {
                container: self.id,
                relayed: self.relayed.clone(),
            }),
        )?;

        for sender in &mut self.senders {
            sender.connect(relay.clone());
        }
        for receiver in &mut self.receivers {
            receiver.connect(&relay)?;
        }

        self.relay = Some(relay);
        Ok(())
    }

    /// Adds a receiver, connecting it right away if the container is live
    pub fn add_receiver(&mut self) -> Result<&SiblingReceiver, ComponentError> {
        let name = receiver_name(self.receivers.len());
        let mut receiver = SiblingReceiver::new(name.clone());

        if let Some(relay) = &self.relay {
            receiver.connect(relay)?;
        }

        info!(
            component = "sibling-container",
            id = %self.id,
            receiver = %name,
            "Added new receiver"
        );

        self.receivers.push(receiver);
        Ok(&self.receivers[self.receivers.len() - 1])
    }

    pub fn sender(&self, name: &str) -> Option<&SiblingSender> {
        self.senders.iter().find(|s| s.name() == name)
    }

    pub fn sender_mut(&mut self, name: &str) -> Option<&mut SiblingSender> {
        self.senders.iter_mut().find(|s| s.name() == name)
    }

    pub fn senders(&self) -> &[SiblingSender] {
        &self.senders
    }

    pub fn receiver(&self, name: &str) -> Option<&SiblingReceiver> {
        self.receivers.iter().find(|r| r.name() == name)
    }

    pub fn receivers(&self) -> &[SiblingReceiver] {
        &self.receivers
    }

    /// Messages the container has relayed so far
    pub fn relayed_count(&self) -> u32 {
        self.relayed.load(Ordering::Relaxed)
    }

    pub fn disconnect(&mut self) {
        info!(component = "sibling-container", id = %self.id, "Playground closed, cleaning up");
        for sender in &mut self.senders {
            sender.disconnect();
        }
        for receiver in &mut self.receivers {
            receiver.disconnect();
        }
        if let Some(relay) = self.relay.take() {
            relay.teardown();
        }
    }
}

impl Default for SiblingContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SiblingContainer {
    fn drop(&mut self) {
        if self.relay.is_some() {
            self.disconnect();
        }
    }
}

struct RelayLogger {
    container: ComponentId,
    relayed: Arc<AtomicU32>,
}

impl Subscriber for RelayLogger {
    fn on_message(&self, envelope: &Envelope) -> Result<(), SubscriberError> {
        let payload: MessageSentPayload = envelope.payload_as()?;
        self.relayed.fetch_add(1, Ordering::Relaxed);
        info!(
            component = "sibling-container",
            id = %self.container,
            message = %payload.message,
            sender = %payload.sender,
            "Relayed message"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "SiblingContainer"
    }
}

/// Sends messages to every receiver in its container
pub struct SiblingSender {
    id: ComponentId,
    name: BoundField<String>,
    relay: Option<ScopedRelay>,
}

impl SiblingSender {
    pub fn new(name: impl Into<String>) -> Self {
        let id = ComponentId::random();
        let name = BoundField::new("name", name.into()).with_hook(
            move |old: &String, new: &String| {
                info!(component = "sibling-sender", id = %id, from = %old, to = %new, "Renamed");
            },
        );
        info!(component = "sibling-sender", id = %id, name = %name.get(), "Ready to send messages");
        Self {
            id,
            name,
            relay: None,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.name.get()
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name.set(name.into());
    }

    fn connect(&mut self, relay: ScopedRelay) {
        self.relay = Some(relay);
    }

    fn disconnect(&mut self) {
        if self.relay.take().is_some() {
            info!(component = "sibling-sender", id = %self.id, name = %self.name(), "Signing off");
        }
    }

    pub fn send(&self, message: impl Into<String>) -> Result<PublishReport, ComponentError> {
        let relay = self.relay.as_ref().ok_or_else(|| {
            ComponentError::NotConnected(format!("sender {} {}", self.name(), self.id))
        })?;
        let message = message.into();

        info!(
            component = "sibling-sender",
            id = %self.id,
            name = %self.name(),
            message = %message,
            "Sent message"
        );

        let payload = json!({ "message": message, "sender": self.name() });
        Ok(relay.publish_from(
            format!("sender {}", self.name()),
            KnownTopic::MessageSent,
            payload,
        )?)
    }
}

/// Shows what its siblings sent
pub struct SiblingReceiver {
    id: ComponentId,
    owner: OwnerId,
    name: String,
    inbox: Arc<Mutex<VecDeque<ReceivedMessage>>>,
    relay: Option<ScopedRelay>,
}

impl SiblingReceiver {
    pub fn new(name: impl Into<String>) -> Self {
        let id = ComponentId::random();
        let name = name.into();
        info!(component = "sibling-receiver", id = %id, name = %name, "Receiver constructed");
        Self {
            id,
            owner: OwnerId::new(),
            name,
            inbox: Arc::new(Mutex::new(VecDeque::with_capacity(RECEIVER_HISTORY))),
            relay: None,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn connect(&mut self, relay: &ScopedRelay) -> Result<(), ComponentError> {
        relay.subscribe_for(
            self.owner,
            KnownTopic::MessageSent,
            Arc::new(Inbox {
                receiver: self.id,
                name: self.name.clone(),
                messages: self.inbox.clone(),
            }),
        )?;
        self.relay = Some(relay.clone());
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(relay) = self.relay.take() {
            relay.unsubscribe_owner(self.owner);
        }
    }

    /// Recent messages, newest first
    pub fn messages(&self) -> Vec<ReceivedMessage> {
        self.lock_inbox().iter().cloned().collect()
    }

    /// What the receiver card shows
    pub fn latest_text(&self) -> String {
        match self.lock_inbox().front() {
            Some(latest) => format!("From Sender {}: {}", latest.sender, latest.text),
            None => "No messages yet".to_string(),
        }
    }

    fn lock_inbox(&self) -> std::sync::MutexGuard<'_, VecDeque<ReceivedMessage>> {
        self.inbox.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct Inbox {
    receiver: ComponentId,
    name: String,
    messages: Arc<Mutex<VecDeque<ReceivedMessage>>>,
}

impl Subscriber for Inbox {
    fn on_message(&self, envelope: &Envelope) -> Result<(), SubscriberError> {
        let payload: MessageSentPayload = envelope.payload_as()?;

        let mut messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        messages.push_front(ReceivedMessage {
            text: payload.message.clone(),
            sender: payload.sender.clone(),
            received_at: envelope.published_at,
        });
        messages.truncate(RECEIVER_HISTORY);

        info!(
            component = "sibling-receiver",
            id = %self.receiver,
            name = %self.name,
            message = %payload.message,
            sender = %payload.sender,
            "Received message"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "SiblingReceiver"
    }
}
