use thiserror::Error;

use crate::event::RouterError;

#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("Component is not connected: {0}")]
    NotConnected(String),

    #[error("Router error: {0}")]
    Router(#[from] RouterError),

    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Timers need a Tokio runtime: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
