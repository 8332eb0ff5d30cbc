use crate::interface_adapters::store::InMemoryPlayerStore;
use crate::use_cases::SessionService;
use axum::extract::ws::Utf8Bytes;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Serialized world update for one map, shared by every connection on that map.
#[derive(Debug, Clone)]
pub struct MapBytes {
    pub map: Arc<str>,
    pub bytes: Utf8Bytes,
}

#[derive(Clone)]
pub struct AppState {
    // Session workflows backed by the world task and the player store.
    pub sessions: SessionService<InMemoryPlayerStore>,
    // Serialized world updates, shared across all connections.
    pub world_bytes_tx: broadcast::Sender<MapBytes>,
    // Latest serialized update per map for lag recovery.
    pub world_latest_tx: watch::Sender<BTreeMap<Arc<str>, Utf8Bytes>>,
}
