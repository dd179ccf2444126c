use std::sync::{Arc, Mutex};

use component_talk::event::{Envelope, Subscriber, SubscriberError};

// ============================================================================
// Recording Infrastructure
// ============================================================================

/// Shared, ordered log of which subscriber saw what
#[derive(Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<(String, Envelope)>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, label: &str, envelope: &Envelope) {
        self.calls
            .lock()
            .unwrap()
            .push((label.to_string(), envelope.clone()));
    }

    /// Labels in call order
    pub fn labels(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(label, _)| label.clone())
            .collect()
    }

    pub fn envelopes_for(&self, label: &str) -> Vec<Envelope> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| l == label)
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

/// Subscriber that appends its label to a [`CallLog`]
pub struct RecordingSubscriber {
    label: String,
    log: CallLog,
}

impl RecordingSubscriber {
    pub fn new(label: &str, log: &CallLog) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            log: log.clone(),
        })
    }
}

impl Subscriber for RecordingSubscriber {
    fn on_message(&self, envelope: &Envelope) -> Result<(), SubscriberError> {
        self.log.record(&self.label, envelope);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Subscriber that records the call and then fails
pub struct FailingSubscriber {
    label: String,
    log: CallLog,
}

impl FailingSubscriber {
    pub fn new(label: &str, log: &CallLog) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            log: log.clone(),
        })
    }
}

impl Subscriber for FailingSubscriber {
    fn on_message(&self, envelope: &Envelope) -> Result<(), SubscriberError> {
        self.log.record(&self.label, envelope);
        Err(SubscriberError::rejected(format!("{} refuses", self.label)))
    }

    fn name(&self) -> &str {
        &self.label
    }
}
