use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::topic::Topic;

/// A message as delivered to subscribers
///
/// Envelopes are built by the router at publish time and handed to every
/// subscriber by shared reference, so nobody downstream can alter them.
/// The payload carries no schema; readers pick the fields they know.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub topic: Topic,
    pub payload: serde_json::Value,
    pub published_at: DateTime<Utc>,
    /// Who published it, for display and debugging only
    pub origin: Option<String>,
}

impl Envelope {
    pub(crate) fn new(topic: Topic, payload: serde_json::Value, origin: Option<String>) -> Self {
        Self {
            topic,
            payload,
            published_at: Utc::now(),
            origin,
        }
    }

    /// Decodes the payload into a typed view
    pub fn payload_as<T>(&self) -> Result<T, serde_json::Error>
    where
        T: for<'de> Deserialize<'de>,
    {
        T::deserialize(&self.payload)
    }

    /// Reads a string field of the payload, if present
    pub fn payload_str(&self, field: &str) -> Option<&str> {
        self.payload.get(field).and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Greeting {
        message: String,
        sender: u32,
    }

    #[test]
    fn test_payload_as_decodes_known_fields() {
        let envelope = Envelope::new(
            Topic::new("global-message").unwrap(),
            json!({"message": "hi", "sender": 42, "extra": true}),
            None,
        );

        let greeting: Greeting = envelope.payload_as().unwrap();
        assert_eq!(greeting.message, "hi");
        assert_eq!(greeting.sender, 42);
    }

    #[test]
    fn test_payload_as_reports_missing_fields() {
        let envelope = Envelope::new(
            Topic::new("global-message").unwrap(),
            json!({"sender": 42}),
            Some("sender #42".to_string()),
        );

        assert!(envelope.payload_as::<Greeting>().is_err());
        assert_eq!(envelope.payload_str("message"), None);
        assert_eq!(envelope.origin.as_deref(), Some("sender #42"));
    }
}
