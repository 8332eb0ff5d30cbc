// Network adapter modules split by player sockets vs operational HTTP routes.

pub mod client;
pub mod internal;

pub use client::{world_update_serializer, ws_handler};
pub use internal::status_handler;

use crate::interface_adapters::state::AppState;
use axum::{Router, routing::get};
use std::sync::Arc;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}
