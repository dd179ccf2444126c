use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

use crate::component::{ComponentError, GlobalSender};
use crate::config::AppConfig;
use crate::event::{EventBus, RouterError};
use crate::global::{ListenerRegistry, RegistryError};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub event_bus: EventBus,
    pub sender: Arc<GlobalSender>,
    pub listeners: ListenerRegistry,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(event_bus: EventBus, config: AppConfig) -> Self {
        Self {
            sender: Arc::new(GlobalSender::new(event_bus.clone())),
            listeners: ListenerRegistry::with_capacity(config.max_listeners),
            event_bus,
            config,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error")]
    Internal,
}

impl From<RouterError> for AppError {
    fn from(err: RouterError) -> Self {
        match err {
            RouterError::InvalidArgument(msg) => AppError::InvalidArgument(msg),
        }
    }
}

impl From<ComponentError> for AppError {
    fn from(err: ComponentError) -> Self {
        match err {
            ComponentError::Router(e) => e.into(),
            other => {
                error!(error = %other, "Component operation failed");
                AppError::Internal
            }
        }
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Full(open) => {
                AppError::Unavailable(format!("listener limit reached: {} open", open))
            }
            RegistryError::Component(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InvalidArgument(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_errors_map_to_status_codes() {
        let cases = [
            (
                AppError::from(ComponentError::NotConnected("child #7".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::from(ComponentError::Router(RouterError::InvalidArgument(
                    "empty topic".to_string(),
                ))),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::from(RegistryError::Full(3)),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
