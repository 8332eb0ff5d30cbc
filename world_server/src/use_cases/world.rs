// Fixed-period scheduler driving the world engine.

use super::engine::WorldEngine;
use super::types::{WorldCommand, WorldUpdate};
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

/// Channel capacities and cadence for a world task.
#[derive(Debug, Clone)]
pub struct WorldSettings {
    /// Capacity for inbound session commands.
    pub command_channel_capacity: usize,
    /// Capacity for broadcast world updates.
    pub world_broadcast_capacity: usize,
    /// Fixed tick interval for the simulation.
    pub tick_interval: Duration,
}

/// Channels for talking to a running world task.
#[derive(Clone)]
pub struct WorldHandle {
    pub command_tx: mpsc::Sender<WorldCommand>,
    pub world_tx: broadcast::Sender<WorldUpdate>,
}

/// Spawns the world task and returns its handle.
pub fn spawn_world(engine: WorldEngine, settings: &WorldSettings) -> WorldHandle {
    let (command_tx, command_rx) = mpsc::channel(settings.command_channel_capacity);
    let (world_tx, _world_rx) = broadcast::channel(settings.world_broadcast_capacity);

    tokio::spawn(world_task(
        engine,
        command_rx,
        world_tx.clone(),
        settings.tick_interval,
    ));

    WorldHandle {
        command_tx,
        world_tx,
    }
}

pub async fn world_task(
    mut engine: WorldEngine,
    mut command_rx: mpsc::Receiver<WorldCommand>,
    world_tx: broadcast::Sender<WorldUpdate>,
    tick_interval: Duration,
) {
    // Drive the fixed-step loop at the configured tick rate.
    let mut interval = tokio::time::interval(tick_interval);
    // A slow tick must not cause a burst of catch-up ticks.
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    info!(tick_ms = tick_interval.as_millis() as u64, "world task started");

    loop {
        interval.tick().await;

        // Commands that arrived since the last tick take effect now, never mid-tick.
        loop {
            match command_rx.try_recv() {
                Ok(command) => engine.handle(command),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!(tick = engine.tick(), "command channel closed; world task exiting");
                    return;
                }
            }
        }

        let Some(outcome) = engine.tick_guarded() else {
            continue;
        };
        for update in outcome.updates {
            // No subscribers is fine; broadcast never blocks the tick.
            let _ = world_tx.send(update);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::open_map;
    use crate::domain::tuning::WorldTuning;
    use crate::domain::world::{LoadedMap, Region, World};
    use crate::use_cases::types::SpawnOutcome;
    use std::net::SocketAddr;
    use tokio::sync::oneshot;

    fn settings() -> WorldSettings {
        WorldSettings {
            command_channel_capacity: 16,
            world_broadcast_capacity: 16,
            tick_interval: Duration::from_millis(5),
        }
    }

    fn engine() -> WorldEngine {
        let loaded = LoadedMap {
            map: open_map(10, 10),
            chests: Vec::new(),
            enemies: Vec::new(),
        };
        let world = World::new(vec![Region::new(loaded, 0.005)]).expect("one region");
        WorldEngine::new(world, WorldTuning::default())
    }

    #[tokio::test]
    async fn when_player_spawns_then_following_updates_include_it() {
        let handle = spawn_world(engine(), &settings());
        let mut updates = handle.world_tx.subscribe();

        let (reply, rx) = oneshot::channel();
        handle
            .command_tx
            .send(WorldCommand::Spawn {
                name: "alice".to_string(),
                addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
                record: None,
                reply,
            })
            .await
            .expect("world task running");
        let SpawnOutcome::Accepted { player_id, map, .. } = rx.await.expect("reply") else {
            panic!("spawn refused");
        };
        assert_eq!(map, "test");

        let update = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match updates.recv().await {
                    Ok(update) if update.players.iter().any(|p| p.id == player_id) => {
                        break update;
                    }
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => panic!("world closed"),
                }
            }
        })
        .await
        .expect("update with player");
        assert!(update.tick > 0);
    }
}
