use crate::domain::tuning::{EnemyDeathPolicy, PlayerDeathPolicy};
use std::{env, time::Duration};
use tracing::warn;

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("WORLD_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

pub fn tick_interval() -> Duration {
    let millis = env::var("TICK_INTERVAL_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|millis| *millis > 0)
        .unwrap_or(20);
    Duration::from_millis(millis)
}

// 0 disables autosave.
pub fn autosave_interval_secs() -> u64 {
    env::var("AUTOSAVE_INTERVAL_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(300)
}

/// Map ids to load; the first one is where new characters start.
pub fn map_files() -> Vec<String> {
    let files: Vec<String> = env::var("MAP_FILES")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if files.is_empty() {
        vec!["default".to_string()]
    } else {
        files
    }
}

pub fn enemy_death_policy() -> EnemyDeathPolicy {
    parse_or_default("ENEMY_DEATH_POLICY")
}

pub fn player_death_policy() -> PlayerDeathPolicy {
    parse_or_default("PLAYER_DEATH_POLICY")
}

fn parse_or_default<T>(key: &str) -> T
where
    T: std::str::FromStr + Default,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!(key, value = %raw, error = %e, "invalid setting; using default");
            T::default()
        }),
        Err(_) => T::default(),
    }
}

pub const COMMAND_CHANNEL_CAPACITY: usize = 1024;
pub const WORLD_BROADCAST_CAPACITY: usize = 128;
