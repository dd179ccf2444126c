use serde::{Deserialize, Serialize};

use crate::component::{ComponentId, ListenerEntry, Theme};
use crate::event::PublishReport;

/// Request payload for publishing on the global bus
///
/// `topic` is a plain string so that any topic can be used; an empty one
/// is rejected by the router with 400.
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub topic: String,
    pub message: String,
}

/// Request payload for an urgent announcement
#[derive(Debug, Deserialize)]
pub struct AnnounceRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FailureResponse {
    pub subscriber: String,
    pub error: String,
}

/// Response for publish and announce
#[derive(Debug, Serialize, Deserialize)]
pub struct PublishResponse {
    pub topic: String,
    pub delivered: usize,
    pub failures: Vec<FailureResponse>,
}

impl From<PublishReport> for PublishResponse {
    fn from(report: PublishReport) -> Self {
        Self {
            topic: report.topic.to_string(),
            delivered: report.delivered,
            failures: report
                .failures
                .into_iter()
                .map(|f| FailureResponse {
                    subscriber: f.subscriber,
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }
}

/// A listener card as the client sees it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerResponse {
    pub id: ComponentId,
    pub subscribed: bool,
    pub theme: Theme,
    pub messages: Vec<ListenerEntry>,
}
