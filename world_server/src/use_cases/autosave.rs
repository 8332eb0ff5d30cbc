// Periodic persistence of online players, off the world task.

use crate::domain::ports::PlayerStore;
use crate::use_cases::session::SessionError;
use crate::use_cases::types::WorldCommand;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveConfig {
    pub interval_seconds: u64,
}

impl AutosaveConfig {
    /// `None` when autosave is disabled.
    pub fn interval(self) -> Option<Duration> {
        (self.interval_seconds > 0).then(|| Duration::from_secs(self.interval_seconds))
    }
}

#[derive(Debug, Default)]
pub struct AutosaveReport {
    pub saved_players: usize,
    pub player_errors: Vec<String>,
    pub flush_error: Option<String>,
}

/// Saves every online player from a snapshot taken at a tick boundary.
pub async fn autosave_once<S: PlayerStore>(
    store: &S,
    commands: &mpsc::Sender<WorldCommand>,
) -> Result<AutosaveReport, SessionError> {
    let (reply, rx) = oneshot::channel();
    commands
        .send(WorldCommand::SnapshotPlayers { reply })
        .await
        .map_err(|_| SessionError::WorldUnavailable)?;
    let records = rx.await.map_err(|_| SessionError::WorldUnavailable)?;

    let mut report = AutosaveReport::default();
    for record in &records {
        match store.save_player(record).await {
            Ok(()) => report.saved_players += 1,
            Err(e) => report.player_errors.push(format!("{}: {e}", record.name)),
        }
    }
    if let Err(e) = store.flush().await {
        report.flush_error = Some(e.to_string());
    }
    Ok(report)
}

pub async fn autosave_task<S: PlayerStore + 'static>(
    store: Arc<S>,
    commands: mpsc::Sender<WorldCommand>,
    config: AutosaveConfig,
) {
    let Some(period) = config.interval() else {
        info!("autosave disabled");
        return;
    };
    let mut interval = tokio::time::interval(period);
    // The first tick completes immediately; nothing to save at startup.
    interval.tick().await;

    loop {
        interval.tick().await;
        match autosave_once(store.as_ref(), &commands).await {
            Ok(report) => {
                for error in &report.player_errors {
                    warn!(error = %error, "autosave failed for player");
                }
                if let Some(error) = &report.flush_error {
                    warn!(error = %error, "autosave flush failed");
                }
                info!(
                    saved = report.saved_players,
                    failed = report.player_errors.len(),
                    "autosave complete"
                );
            }
            Err(e) => {
                warn!(error = %e, "autosave stopped");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::open_map;
    use crate::domain::tuning::WorldTuning;
    use crate::domain::world::{LoadedMap, Region, World};
    use crate::use_cases::engine::WorldEngine;
    use crate::use_cases::session::SessionService;
    use crate::use_cases::test_support::{FailureFlags, RecordingStore};
    use crate::use_cases::world::{WorldSettings, spawn_world};
    use std::net::SocketAddr;

    fn commands() -> mpsc::Sender<WorldCommand> {
        let loaded = LoadedMap {
            map: open_map(10, 10),
            chests: Vec::new(),
            enemies: Vec::new(),
        };
        let world = World::new(vec![Region::new(loaded, 0.005)]).expect("one region");
        spawn_world(
            WorldEngine::new(world, WorldTuning::default()),
            &WorldSettings {
                command_channel_capacity: 16,
                world_broadcast_capacity: 16,
                tick_interval: Duration::from_millis(5),
            },
        )
        .command_tx
    }

    #[test]
    fn when_interval_is_zero_then_autosave_is_disabled() {
        assert_eq!(AutosaveConfig { interval_seconds: 0 }.interval(), None);
        assert_eq!(
            AutosaveConfig { interval_seconds: 300 }.interval(),
            Some(Duration::from_secs(300))
        );
    }

    #[tokio::test]
    async fn when_players_are_online_then_each_one_is_saved() {
        let store = RecordingStore::new();
        store.insert_test_account("alice", "pw");
        store.insert_test_account("bob", "pw");
        let commands = commands();
        let sessions = SessionService::new(Arc::new(store.clone()), commands.clone());
        let addr = SocketAddr::from(([127, 0, 0, 1], 4000));
        sessions.login("alice", addr).await.expect("login alice");
        sessions.login("bob", addr).await.expect("login bob");

        let report = autosave_once(&store, &commands).await.expect("autosave");
        assert_eq!(report.saved_players, 2);
        assert!(report.player_errors.is_empty());
        assert!(store.record_of("alice").is_some());
        assert_eq!(store.flush_count(), 1);
    }

    #[tokio::test]
    async fn when_snapshot_is_written_after_logoff_then_logoff_record_survives() {
        let store = RecordingStore::new();
        store.insert_test_account("alice", "pw");
        let commands = commands();
        let sessions = SessionService::new(Arc::new(store.clone()), commands.clone());
        sessions
            .login("alice", SocketAddr::from(([127, 0, 0, 1], 4002)))
            .await
            .expect("login");

        let (reply, rx) = oneshot::channel();
        commands
            .send(WorldCommand::SnapshotPlayers { reply })
            .await
            .expect("world running");
        let mut stale = rx.await.expect("snapshot").pop().expect("alice online");
        stale.money = 12_345;

        assert!(sessions.logoff("alice").await.expect("logoff"));
        let logged_off = store.record_of("alice").expect("saved on logoff");
        store.save_player(&stale).await.expect("late snapshot write");

        let stored = store.record_of("alice").expect("record");
        assert_eq!(stored, logged_off);
        assert!(stored.revision > stale.revision);
    }

    #[tokio::test]
    async fn when_saves_fail_then_errors_are_collected_not_raised() {
        let store = RecordingStore::new().with_failures(FailureFlags {
            save: true,
            ..FailureFlags::default()
        });
        store.insert_test_account("carol", "pw");
        let commands = commands();
        let sessions = SessionService::new(Arc::new(store.clone()), commands.clone());
        sessions
            .login("carol", SocketAddr::from(([127, 0, 0, 1], 4001)))
            .await
            .expect("login");

        let report = autosave_once(&store, &commands).await.expect("autosave");
        assert_eq!(report.saved_players, 0);
        assert_eq!(report.player_errors.len(), 1);
    }
}
