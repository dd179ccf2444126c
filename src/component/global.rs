use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use super::{errors::ComponentError, id::ComponentId};
use crate::event::{
    Envelope, EventBus, KnownTopic, OwnerId, PublishReport, Subscriber, SubscriberError,
};

/// Default number of entries a listener keeps
pub const DEFAULT_LISTENER_HISTORY: usize = 10;

const FALLBACK_ANNOUNCEMENT: &str = "Important announcement!";

/// Topics every listener follows
const LISTENED_TOPICS: [KnownTopic; 3] = [
    KnownTopic::GlobalMessage,
    KnownTopic::GlobalAnnouncement,
    KnownTopic::ThemeChange,
];

/// Payload shape shared by all global topics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalPayload {
    pub message: String,
    pub sender: ComponentId,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub urgent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Message,
    Announcement,
    Theme,
}

/// Colour scheme of a listener card, switched by `theme-change`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// `"dark"` selects the dark theme, anything else the light one
    pub fn from_message(message: &str) -> Self {
        if message == "dark" {
            Theme::Dark
        } else {
            Theme::Light
        }
    }
}

/// One line in a listener's history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerEntry {
    pub kind: EntryKind,
    pub message: String,
    pub sender: ComponentId,
    pub timestamp: DateTime<Utc>,
    pub urgent: bool,
}

/// Publishes on the process-wide bus
pub struct GlobalSender {
    id: ComponentId,
    bus: EventBus,
    sent: AtomicU64,
}

impl GlobalSender {
    pub fn new(bus: EventBus) -> Self {
        let id = ComponentId::random();
        info!(component = "global-sender", id = %id, "Global sender ready");
        Self {
            id,
            bus,
            sent: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn messages_sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Publishes `message` on any topic
    pub fn send(
        &self,
        topic: impl AsRef<str>,
        message: impl Into<String>,
    ) -> Result<PublishReport, ComponentError> {
        self.dispatch(topic.as_ref(), message.into(), false)
    }

    /// Publishes an urgent `global-announcement`
    pub fn announce(&self, message: impl Into<String>) -> Result<PublishReport, ComponentError> {
        let mut message = message.into();
        if message.is_empty() {
            message = FALLBACK_ANNOUNCEMENT.to_string();
        }
        self.dispatch(KnownTopic::GlobalAnnouncement.as_ref(), message, true)
    }

    fn dispatch(
        &self,
        topic: &str,
        message: String,
        urgent: bool,
    ) -> Result<PublishReport, ComponentError> {
        let payload = GlobalPayload {
            message,
            sender: self.id,
            timestamp: Utc::now(),
            urgent,
        };
        let report = self.bus.publish_from(
            format!("global sender {}", self.id),
            topic,
            serde_json::to_value(&payload)?,
        )?;
        self.sent.fetch_add(1, Ordering::Relaxed);

        info!(
            component = "global-sender",
            id = %self.id,
            topic = %topic,
            message = %payload.message,
            delivered = report.delivered,
            "Dispatched message"
        );
        Ok(report)
    }
}

/// Listens to the process-wide bus and keeps a short history
pub struct GlobalListener {
    id: ComponentId,
    owner: OwnerId,
    bus: EventBus,
    subscribed: bool,
    history: Arc<Mutex<VecDeque<ListenerEntry>>>,
    theme: Arc<Mutex<Theme>>,
    capacity: usize,
}

impl GlobalListener {
    pub fn new(bus: EventBus) -> Self {
        Self::with_history(bus, DEFAULT_LISTENER_HISTORY)
    }

    /// Creates a listener keeping at most `capacity` entries (at least one)
    pub fn with_history(bus: EventBus, capacity: usize) -> Self {
        Self::with_id(bus, ComponentId::random(), capacity)
    }

    /// Creates a listener under an id the caller has already reserved
    pub(crate) fn with_id(bus: EventBus, id: ComponentId, capacity: usize) -> Self {
        info!(component = "global-listener", id = %id, "Global listener constructed");
        Self {
            id,
            owner: OwnerId::new(),
            bus,
            subscribed: false,
            history: Arc::new(Mutex::new(VecDeque::new())),
            theme: Arc::new(Mutex::new(Theme::default())),
            capacity: capacity.max(1),
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Starts listening to every global topic
    pub fn connect(&mut self) -> Result<(), ComponentError> {
        info!(component = "global-listener", id = %self.id, "Listening to global events");
        self.subscribe_all()
    }

    /// Flips between subscribed and unsubscribed, returns the new state
    pub fn toggle_subscription(&mut self) -> Result<bool, ComponentError> {
        if self.subscribed {
            self.unsubscribe_all();
            info!(component = "global-listener", id = %self.id, "Unsubscribed from global events");
        } else {
            self.subscribe_all()?;
            info!(component = "global-listener", id = %self.id, "Subscribed to global events");
        }
        Ok(self.subscribed)
    }

    pub fn clear_messages(&self) {
        self.lock_history().clear();
        info!(component = "global-listener", id = %self.id, "Cleared message history");
    }

    /// History, newest first
    pub fn messages(&self) -> Vec<ListenerEntry> {
        self.lock_history().iter().cloned().collect()
    }

    /// Theme set by the most recent `theme-change`
    pub fn theme(&self) -> Theme {
        *self.theme.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn disconnect(&mut self) {
        info!(component = "global-listener", id = %self.id, "Disconnecting and cleaning up");
        self.unsubscribe_all();
    }

    fn subscribe_all(&mut self) -> Result<(), ComponentError> {
        if self.subscribed {
            debug!(component = "global-listener", id = %self.id, "Already subscribed");
            return Ok(());
        }

        for topic in LISTENED_TOPICS {
            let feed = ListenerFeed {
                listener: self.id,
                kind: entry_kind(topic),
                history: self.history.clone(),
                theme: self.theme.clone(),
                capacity: self.capacity,
            };
            if let Err(e) = self.bus.subscribe_for(self.owner, topic, Arc::new(feed)) {
                // Don't leave a partial set of subscriptions behind
                self.bus.unsubscribe_owner(self.owner);
                return Err(e.into());
            }
        }

        self.subscribed = true;
        Ok(())
    }

    fn unsubscribe_all(&mut self) {
        let removed = self.bus.unsubscribe_owner(self.owner);
        debug!(component = "global-listener", id = %self.id, removed = removed, "Unsubscribed");
        self.subscribed = false;
    }

    fn lock_history(&self) -> MutexGuard<'_, VecDeque<ListenerEntry>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn entry_kind(topic: KnownTopic) -> EntryKind {
    match topic {
        KnownTopic::GlobalAnnouncement => EntryKind::Announcement,
        KnownTopic::ThemeChange => EntryKind::Theme,
        _ => EntryKind::Message,
    }
}

impl Drop for GlobalListener {
    fn drop(&mut self) {
        if self.subscribed {
            self.unsubscribe_all();
        }
    }
}

struct ListenerFeed {
    listener: ComponentId,
    kind: EntryKind,
    history: Arc<Mutex<VecDeque<ListenerEntry>>>,
    theme: Arc<Mutex<Theme>>,
    capacity: usize,
}

impl Subscriber for ListenerFeed {
    fn on_message(&self, envelope: &Envelope) -> Result<(), SubscriberError> {
        let payload: GlobalPayload = envelope.payload_as().map_err(|e| {
            warn!(
                component = "global-listener",
                id = %self.listener,
                topic = %envelope.topic,
                error = %e,
                "Ignoring malformed global payload"
            );
            SubscriberError::from(e)
        })?;

        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.push_front(ListenerEntry {
            kind: self.kind,
            message: payload.message.clone(),
            sender: payload.sender,
            timestamp: payload.timestamp,
            urgent: payload.urgent,
        });
        history.truncate(self.capacity);
        drop(history);

        if self.kind == EntryKind::Theme {
            *self.theme.lock().unwrap_or_else(PoisonError::into_inner) =
                Theme::from_message(&payload.message);
        }

        match self.kind {
            EntryKind::Announcement => info!(
                component = "global-listener",
                id = %self.listener,
                message = %payload.message,
                sender = %payload.sender,
                urgent = payload.urgent,
                "Received announcement"
            ),
            _ => info!(
                component = "global-listener",
                id = %self.listener,
                kind = ?self.kind,
                message = %payload.message,
                sender = %payload.sender,
                "Received message"
            ),
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "GlobalListener"
    }
}
