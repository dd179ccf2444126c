// HTTP surface of the global bus demo
//
// Each route stands in for one button of the demo page.

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::shared::AppState;

// Public API - what other modules can use
pub use handlers::{
    announce, clear_listener, close_listener, get_listener, list_listeners, open_listener,
    publish_message, toggle_listener,
};
pub use registry::{ListenerRegistry, RegistryError, DEFAULT_MAX_LISTENERS};
pub use types::{
    AnnounceRequest, FailureResponse, ListenerResponse, PublishRequest, PublishResponse,
};

// Internal modules
mod handlers;
mod registry;
mod types;

/// Routes for the global demo, ready to be merged into the app router
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/global/publish", post(publish_message))
        .route("/global/announce", post(announce))
        .route("/global/listeners", post(open_listener).get(list_listeners))
        .route(
            "/global/listeners/:id",
            get(get_listener).delete(close_listener),
        )
        .route("/global/listeners/:id/toggle", post(toggle_listener))
        .route("/global/listeners/:id/messages", delete(clear_listener))
}
