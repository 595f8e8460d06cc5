//! Session REST surface (spec.md §6): list, reset, and delete sessions.
//! Collaborates with the streaming bridge rather than replacing it — no
//! turn can be driven over REST.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use crate::state::AppState;

fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// `GET /v1/sessions`
pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let sessions = state.sessions.list();
    Json(serde_json::json!({
        "sessions": sessions,
        "count": sessions.len(),
    }))
}

/// `GET /v1/sessions/:id`
pub async fn get_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.sessions.get(&id) {
        Some(session) => Json(serde_json::json!({
            "id": session.id,
            "message_count": session.messages.len(),
            "iteration_count": session.iteration_count,
            "last_activity": session.last_activity,
        }))
        .into_response(),
        None => api_error(StatusCode::NOT_FOUND, "session not found"),
    }
}

/// `POST /v1/sessions/:id/reset`
pub async fn reset_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.sessions.reset(&id) {
        Ok(()) => Json(serde_json::json!({ "id": id, "reset": true })).into_response(),
        Err(_) => api_error(StatusCode::NOT_FOUND, "session not found"),
    }
}

/// `DELETE /v1/sessions/:id`
pub async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    state.sessions.delete(&id);
    StatusCode::NO_CONTENT
}

/// `GET /v1/providers` — readiness probe. A provider that failed to
/// initialize (bad/missing key) is reported here rather than aborting
/// startup; see `ProviderRegistry::from_config`.
pub async fn list_providers(State(state): State<AppState>) -> impl IntoResponse {
    let ready: Vec<&str> = state.llm.ready_ids();
    let errors: Vec<_> = state
        .llm
        .init_errors()
        .iter()
        .map(|e| serde_json::json!({ "provider_id": e.provider_id, "error": e.error }))
        .collect();
    Json(serde_json::json!({ "ready": ready, "errors": errors }))
}
