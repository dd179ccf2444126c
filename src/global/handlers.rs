use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use super::types::{AnnounceRequest, ListenerResponse, PublishRequest, PublishResponse};
use crate::component::ComponentId;
use crate::shared::{AppError, AppState};

/// HTTP handler for publishing on the global bus
///
/// POST /global/publish
/// Returns how many listeners were reached and which ones failed
#[instrument(name = "publish_global", skip(state))]
pub async fn publish_message(
    State(state): State<AppState>,
    Json(request): Json<PublishRequest>,
) -> Result<Json<PublishResponse>, AppError> {
    let report = state.sender.send(&request.topic, request.message)?;

    info!(
        topic = %report.topic,
        delivered = report.delivered,
        failed = report.failures.len(),
        "Global message published"
    );

    Ok(Json(report.into()))
}

/// HTTP handler for urgent announcements
///
/// POST /global/announce
#[instrument(name = "announce_global", skip(state))]
pub async fn announce(
    State(state): State<AppState>,
    Json(request): Json<AnnounceRequest>,
) -> Result<Json<PublishResponse>, AppError> {
    let report = state.sender.announce(request.message)?;

    info!(delivered = report.delivered, "Announcement published");

    Ok(Json(report.into()))
}

/// HTTP handler for opening a listener card
///
/// POST /global/listeners
#[instrument(name = "open_listener", skip(state))]
pub async fn open_listener(
    State(state): State<AppState>,
) -> Result<Json<ListenerResponse>, AppError> {
    let listener = state
        .listeners
        .open(&state.event_bus, state.config.listener_history)?;
    Ok(Json(listener))
}

/// GET /global/listeners
#[instrument(name = "list_listeners", skip(state))]
pub async fn list_listeners(State(state): State<AppState>) -> Json<Vec<ListenerResponse>> {
    Json(state.listeners.list())
}

/// GET /global/listeners/:id
#[instrument(name = "get_listener", skip(state))]
pub async fn get_listener(
    State(state): State<AppState>,
    Path(id): Path<u16>,
) -> Result<Json<ListenerResponse>, AppError> {
    state
        .listeners
        .get(ComponentId::from(id))
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// POST /global/listeners/:id/toggle
#[instrument(name = "toggle_listener", skip(state))]
pub async fn toggle_listener(
    State(state): State<AppState>,
    Path(id): Path<u16>,
) -> Result<Json<ListenerResponse>, AppError> {
    state
        .listeners
        .toggle(ComponentId::from(id))?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// DELETE /global/listeners/:id/messages
#[instrument(name = "clear_listener", skip(state))]
pub async fn clear_listener(
    State(state): State<AppState>,
    Path(id): Path<u16>,
) -> Result<Json<ListenerResponse>, AppError> {
    state
        .listeners
        .clear_messages(ComponentId::from(id))
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// DELETE /global/listeners/:id
#[instrument(name = "close_listener", skip(state))]
pub async fn close_listener(
    State(state): State<AppState>,
    Path(id): Path<u16>,
) -> Result<StatusCode, AppError> {
    if state.listeners.close(ComponentId::from(id)) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

fn not_found(id: u16) -> AppError {
    AppError::NotFound(format!("listener #{}", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Theme;
    use crate::global::routes;
    use crate::shared::test_utils::AppStateBuilder;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use tower::ServiceExt; // for `oneshot`

    fn app(state: AppState) -> Router {
        routes().with_state(state)
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_publish_reaches_open_listener() {
        let state = AppStateBuilder::new().build();
        let listener = state
            .listeners
            .open(&state.event_bus, state.config.listener_history)
            .unwrap();

        let response = app(state.clone())
            .oneshot(post_json(
                "/global/publish",
                r#"{"topic": "global-message", "message": "hello everyone"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let published: PublishResponse = body_json(response).await;
        assert_eq!(published.topic, "global-message");
        assert_eq!(published.delivered, 1);
        assert!(published.failures.is_empty());

        let view = state.listeners.get(listener.id).unwrap();
        assert_eq!(view.messages[0].message, "hello everyone");
    }

    #[tokio::test]
    async fn test_publish_empty_topic_is_bad_request() {
        let state = AppStateBuilder::new().build();

        let response = app(state)
            .oneshot(post_json(
                "/global/publish",
                r#"{"topic": "", "message": "lost"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_publish_missing_field_is_unprocessable() {
        let state = AppStateBuilder::new().build();

        let response = app(state)
            .oneshot(post_json("/global/publish", r#"{"message": "no topic"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_announce_without_message_uses_fallback() {
        let state = AppStateBuilder::new().build();
        let listener = state.listeners.open(&state.event_bus, 10).unwrap();

        let response = app(state.clone())
            .oneshot(post_json("/global/announce", "{}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let view = state.listeners.get(listener.id).unwrap();
        assert_eq!(view.messages[0].message, "Important announcement!");
        assert!(view.messages[0].urgent);
    }

    #[tokio::test]
    async fn test_open_and_list_listeners() {
        let state = AppStateBuilder::new().build();
        let app = app(state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/global/listeners")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let opened: ListenerResponse = body_json(response).await;
        assert!(opened.subscribed);
        assert!(opened.messages.is_empty());

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/global/listeners")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let listed: Vec<ListenerResponse> = body_json(response).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, opened.id);
    }

    #[tokio::test]
    async fn test_open_listener_when_full_is_unavailable() {
        let state = AppStateBuilder::new().with_max_listeners(1).build();
        let open = || {
            Request::builder()
                .method("POST")
                .uri("/global/listeners")
                .body(Body::empty())
                .unwrap()
        };

        let response = app(state.clone()).oneshot(open()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app(state.clone()).oneshot(open()).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(state.listeners.len(), 1);
    }

    #[tokio::test]
    async fn test_listener_view_reports_theme() {
        let state = AppStateBuilder::new().build();
        let listener = state.listeners.open(&state.event_bus, 10).unwrap();
        assert_eq!(listener.theme, Theme::Light);
        state.sender.send("theme-change", "dark").unwrap();

        let response = app(state.clone())
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(format!("/global/listeners/{}", listener.id.value()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let view: ListenerResponse = body_json(response).await;
        assert_eq!(view.theme, Theme::Dark);
    }

    #[tokio::test]
    async fn test_toggle_listener_flips_subscription() {
        let state = AppStateBuilder::new().build();
        let listener = state.listeners.open(&state.event_bus, 10).unwrap();

        let response = app(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/global/listeners/{}/toggle", listener.id.value()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let toggled: ListenerResponse = body_json(response).await;
        assert!(!toggled.subscribed);

        let report = state.sender.send("global-message", "unheard").unwrap();
        assert_eq!(report.delivered, 0);
    }

    #[tokio::test]
    async fn test_clear_listener_empties_history() {
        let state = AppStateBuilder::new().with_listener_history(3).build();
        let listener = state.listeners.open(&state.event_bus, 3).unwrap();
        state.sender.send("theme-change", "dark").unwrap();

        let response = app(state.clone())
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/global/listeners/{}/messages", listener.id.value()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cleared: ListenerResponse = body_json(response).await;
        assert!(cleared.messages.is_empty());
        assert!(cleared.subscribed);
    }

    #[tokio::test]
    async fn test_close_listener_then_not_found() {
        let state = AppStateBuilder::new().build();
        let listener = state.listeners.open(&state.event_bus, 10).unwrap();
        let uri = format!("/global/listeners/{}", listener.id.value());
        let app = app(state.clone());

        let delete = || {
            Request::builder()
                .method("DELETE")
                .uri(uri.clone())
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(state.event_bus.topics().is_empty());

        let response = app.clone().oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(uri.clone())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
