// Use-case level inputs/outputs for the world loop.

use crate::domain::errors::ActionError;
use crate::domain::events::VisualEvent;
use crate::domain::{ChestSnapshot, EnemySnapshot, PlayerId, PlayerRecord, PlayerSnapshot};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Requests from the session side, drained by the world task at each tick boundary.
#[derive(Debug)]
pub enum WorldCommand {
    Spawn {
        name: String,
        addr: SocketAddr,
        // None creates a fresh character on the default map.
        record: Option<PlayerRecord>,
        reply: oneshot::Sender<SpawnOutcome>,
    },
    Despawn {
        name: String,
        reply: oneshot::Sender<Option<PlayerRecord>>,
    },
    Move {
        player_id: PlayerId,
        x_speed: i32,
        y_speed: i32,
    },
    Actions {
        owner: String,
        actions: Vec<String>,
        reply: oneshot::Sender<Vec<Result<(), ActionError>>>,
    },
    IsOnline {
        name: String,
        reply: oneshot::Sender<bool>,
    },
    SnapshotPlayers {
        reply: oneshot::Sender<Vec<PlayerRecord>>,
    },
    Status {
        reply: oneshot::Sender<WorldStatus>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnOutcome {
    Accepted {
        player_id: PlayerId,
        map: String,
        x: i32,
        y: i32,
    },
    AlreadyOnline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldStatus {
    pub tick: u64,
    pub online: BTreeMap<String, usize>,
}

/// Snapshot of one map after a tick.
#[derive(Debug, Clone)]
pub struct WorldUpdate {
    pub tick: u64,
    pub map: Arc<str>,
    pub players: Vec<PlayerSnapshot>,
    pub chests: Vec<ChestSnapshot>,
    pub enemies: Vec<EnemySnapshot>,
    pub events: Vec<VisualEvent>,
}
