//! HTTP endpoints: health and poll history.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::session::SessionHub;

/// `GET /health`
pub async fn health_handler(State(hub): State<Arc<SessionHub>>) -> impl IntoResponse {
    let stats = hub.stats();
    Json(json!({
        "status": "ok",
        "state": stats.state,
        "participants": stats.participants,
        "connections": stats.connections,
        "polls": stats.polls_completed,
    }))
}

/// `GET /api/history`: concluded polls, oldest first.
pub async fn history_handler(State(hub): State<Arc<SessionHub>>) -> impl IntoResponse {
    Json(json!({ "history": hub.history() }))
}
