use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::StatusDto;
use crate::interface_adapters::state::AppState;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::warn;

/// Tick counter and online players per map.
pub async fn status_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.sessions.status().await {
        Ok(status) => (StatusCode::OK, Json(StatusDto::from(status))).into_response(),
        Err(e) => {
            warn!(error = %e, "status request failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: "world unavailable".to_string(),
                }),
            )
                .into_response()
        }
    }
}
