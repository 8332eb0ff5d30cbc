// Wire protocol DTOs and conversions for public world server messages.

use crate::domain::errors::{ActionError, ActionErrorKind};
use crate::domain::events::VisualEvent;
use crate::domain::{ChestSnapshot, EnemySnapshot, PlayerSnapshot};
use crate::use_cases::{CheckOutcome, SpawnOutcome, WorldStatus, WorldUpdate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Result of an account check.
    CheckPlayer { result: CheckResultDto },
    // Result of a login request.
    Login(LoginResultDto),
    // Per-item outcome of an action batch, in request order.
    ActionResults { results: Vec<ActionResultDto> },
    // Acknowledges a logoff; the socket closes afterwards.
    LoggedOff { saved: bool },
    // Snapshot of the client's map for a given tick.
    WorldUpdate(WorldUpdateDto),
    // Request-level failure that does not end the session.
    Error { message: String },
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    CheckPlayer { user: String, pass: String },
    // Accepted only after a successful check for the same user on this connection.
    Login { user: String },
    Logoff,
    Move(MoveDto),
    Actions { actions: Vec<String> },
}

/// Desired velocity for the next tick; clamped server-side.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MoveDto {
    #[serde(default)]
    pub x_speed: i32,
    #[serde(default)]
    pub y_speed: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckResultDto {
    AccountCreated,
    Good,
    Bad,
}

impl From<CheckOutcome> for CheckResultDto {
    fn from(outcome: CheckOutcome) -> Self {
        match outcome {
            CheckOutcome::AccountCreated => CheckResultDto::AccountCreated,
            CheckOutcome::Good => CheckResultDto::Good,
            CheckOutcome::Bad => CheckResultDto::Bad,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResultDto {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<String>,
    pub x: i32,
    pub y: i32,
}

impl LoginResultDto {
    pub fn rejected() -> Self {
        Self {
            accepted: false,
            player_id: None,
            map: None,
            x: 0,
            y: 0,
        }
    }
}

impl From<&SpawnOutcome> for LoginResultDto {
    fn from(outcome: &SpawnOutcome) -> Self {
        match outcome {
            SpawnOutcome::Accepted {
                player_id,
                map,
                x,
                y,
            } => Self {
                accepted: true,
                player_id: Some(player_id.to_string()),
                map: Some(map.clone()),
                x: *x,
                y: *y,
            },
            SpawnOutcome::AlreadyOnline => Self::rejected(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionResultDto {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Result<(), ActionError>> for ActionResultDto {
    fn from(result: &Result<(), ActionError>) -> Self {
        match result {
            Ok(()) => Self {
                ok: true,
                kind: None,
                error: None,
            },
            Err(e) => Self {
                ok: false,
                kind: Some(match e.kind() {
                    ActionErrorKind::Malformed => "malformed",
                    ActionErrorKind::InvalidTarget => "invalid_target",
                }),
                error: Some(e.to_string()),
            },
        }
    }
}

/// Snapshot of one map sent to the clients on that map each tick.
#[derive(Debug, Clone, Serialize)]
pub struct WorldUpdateDto {
    pub tick: u64,
    pub map: String,
    pub players: Vec<PlayerStateDto>,
    pub chests: Vec<ChestStateDto>,
    pub enemies: Vec<EnemyStateDto>,
    pub events: Vec<EventDto>,
}

impl From<WorldUpdate> for WorldUpdateDto {
    fn from(update: WorldUpdate) -> Self {
        Self {
            tick: update.tick,
            map: update.map.to_string(),
            players: update.players.iter().map(PlayerStateDto::from).collect(),
            chests: update.chests.iter().map(ChestStateDto::from).collect(),
            enemies: update.enemies.iter().map(EnemyStateDto::from).collect(),
            events: update.events.iter().map(EventDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerStateDto {
    pub id: String,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub hp: i32,
    pub max_hp: i32,
    pub money: u64,
    pub base_xp: u64,
}

impl From<&PlayerSnapshot> for PlayerStateDto {
    fn from(p: &PlayerSnapshot) -> Self {
        Self {
            id: p.id.to_string(),
            name: p.name.clone(),
            x: p.x,
            y: p.y,
            hp: p.hp,
            max_hp: p.max_hp,
            money: p.money,
            base_xp: p.base_xp,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChestStateDto {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub money: u64,
    pub items: Vec<String>,
}

impl From<&ChestSnapshot> for ChestStateDto {
    fn from(c: &ChestSnapshot) -> Self {
        Self {
            id: c.id.to_string(),
            x: c.x,
            y: c.y,
            money: c.money,
            items: c.item_ids.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnemyStateDto {
    pub id: String,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub hp: i32,
    pub max_hp: i32,
    pub alive: bool,
}

impl From<&EnemySnapshot> for EnemyStateDto {
    fn from(e: &EnemySnapshot) -> Self {
        Self {
            id: e.id.to_string(),
            name: e.name.clone(),
            x: e.x,
            y: e.y,
            hp: e.hp,
            max_hp: e.max_hp,
            alive: e.alive,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventDto {
    pub x: i32,
    pub y: i32,
    pub remaining: f32,
    pub payload: String,
}

impl From<&VisualEvent> for EventDto {
    fn from(e: &VisualEvent) -> Self {
        Self {
            x: e.pos.x,
            y: e.pos.y,
            remaining: e.remaining,
            payload: e.payload.clone(),
        }
    }
}

/// Body of `GET /status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusDto {
    pub tick: u64,
    pub online: BTreeMap<String, usize>,
}

impl From<WorldStatus> for StatusDto {
    fn from(status: WorldStatus) -> Self {
        Self {
            tick: status.tick,
            online: status.online,
        }
    }
}
