use serde::Serialize;
use thiserror::Error;

use super::envelope::Envelope;

/// Errors a subscriber can report back to the router
///
/// These never abort a dispatch. The router collects them and returns them
/// to the publisher as part of the publish report.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SubscriberError {
    #[error("Subscriber rejected message: {0}")]
    Rejected(String),

    #[error("Payload did not match the expected shape: {0}")]
    InvalidPayload(String),

    #[error("Subscriber panicked: {0}")]
    Panicked(String),
}

impl SubscriberError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        SubscriberError::Rejected(msg.into())
    }

    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        SubscriberError::InvalidPayload(msg.into())
    }
}

impl From<serde_json::Error> for SubscriberError {
    fn from(err: serde_json::Error) -> Self {
        SubscriberError::InvalidPayload(err.to_string())
    }
}

/// Trait for anything that wants to receive routed messages
///
/// Subscribers run synchronously inside `publish`, in registration order.
/// They may subscribe or unsubscribe on the same router while running; the
/// change applies from the next publish on.
///
/// Examples:
/// - GlobalListener: keeps a history of bus messages
/// - SiblingReceiver: shows the latest message relayed by its container
/// - ParentComponent: counts replies from its child
pub trait Subscriber: Send + Sync {
    /// Handle one envelope
    fn on_message(&self, envelope: &Envelope) -> Result<(), SubscriberError>;

    /// Get a human-readable name for this subscriber (for logging/debugging)
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// Adapts a closure into a [`Subscriber`]
pub struct FnSubscriber<F> {
    name: String,
    callback: F,
}

impl<F> FnSubscriber<F>
where
    F: Fn(&Envelope) -> Result<(), SubscriberError> + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self::named("closure", callback)
    }

    pub fn named(name: impl Into<String>, callback: F) -> Self {
        Self {
            name: name.into(),
            callback,
        }
    }
}

impl<F> Subscriber for FnSubscriber<F>
where
    F: Fn(&Envelope) -> Result<(), SubscriberError> + Send + Sync,
{
    fn on_message(&self, envelope: &Envelope) -> Result<(), SubscriberError> {
        (self.callback)(envelope)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A subscriber that accepts everything and does nothing
///
/// Useful in tests that need a registration but don't care about delivery.
pub struct NoOpSubscriber;

impl Subscriber for NoOpSubscriber {
    fn on_message(&self, _envelope: &Envelope) -> Result<(), SubscriberError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "NoOpSubscriber"
    }
}
