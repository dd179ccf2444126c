use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use super::router::RouterError;

/// Name of a class of routed messages
///
/// Any non-empty string is a legal topic. Topics are compared by exact
/// value, so `"theme-change"` and `"Theme-Change"` are different topics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Topic(String);

impl Topic {
    /// Creates a topic, rejecting the empty string
    pub fn new(name: impl Into<String>) -> Result<Self, RouterError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RouterError::InvalidArgument(
                "topic must not be empty".to_string(),
            ));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Topic {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Topic {
    type Error = RouterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Topic::new(value)
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.0
    }
}

impl From<KnownTopic> for Topic {
    fn from(topic: KnownTopic) -> Self {
        // Every known topic has a non-empty kebab-case name
        Topic(topic.to_string())
    }
}

/// Topics used by the communication demos
///
/// The router does not enforce this vocabulary; it only saves callers from
/// spelling the names by hand.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum KnownTopic {
    // Process-wide bus
    GlobalMessage,
    GlobalAnnouncement,
    ThemeChange,

    // Container-local relays
    MessageSent,
    ChildResponse,
}

impl KnownTopic {
    /// Whether this topic travels on the process-wide bus
    pub fn is_global(&self) -> bool {
        matches!(
            self,
            KnownTopic::GlobalMessage | KnownTopic::GlobalAnnouncement | KnownTopic::ThemeChange
        )
    }
}
