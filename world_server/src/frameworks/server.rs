// Framework bootstrap for the world server runtime.

use crate::domain::ports::MapLoader;
use crate::domain::tuning::WorldTuning;
use crate::domain::world::{Region, World};
use crate::frameworks::config;
use crate::interface_adapters::maps::TomlMapLoader;
use crate::interface_adapters::net::{router, world_update_serializer};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::store::InMemoryPlayerStore;
use crate::use_cases::autosave::{AutosaveConfig, autosave_task};
use crate::use_cases::{SessionService, WorldEngine, WorldSettings, spawn_world};

use axum::extract::ws::Utf8Bytes;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};
use tokio::sync::{broadcast, watch};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    // build state
    let state = build_state()?;
    let app = router(state);

    tracing::info!(%address, "listening");

    // Sessions need the peer address, so the service carries connect info.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn load_world(loader: &impl MapLoader, map_ids: &[String], fact_decrement: f32) -> Result<World> {
    let mut regions = Vec::with_capacity(map_ids.len());
    for map_id in map_ids {
        let loaded = loader.load_map(map_id).map_err(|e| {
            std::io::Error::other(format!("failed to load map {map_id}: {e}"))
        })?;
        tracing::info!(
            map = %loaded.map.name,
            chests = loaded.chests.len(),
            enemies = loaded.enemies.len(),
            "map loaded"
        );
        regions.push(Region::new(loaded, fact_decrement));
    }
    World::new(regions).ok_or_else(|| std::io::Error::other("no maps configured"))
}

fn build_state() -> Result<Arc<AppState>> {
    let tick_interval = config::tick_interval();

    let mut tuning = WorldTuning::default();
    tuning.movement.tick_seconds = tick_interval.as_secs_f32();
    tuning.enemy_death = config::enemy_death_policy();
    tuning.player_death = config::player_death_policy();
    tracing::debug!(?tuning, "world tuning");

    let world = load_world(
        &TomlMapLoader::new(),
        &config::map_files(),
        tuning.ai.fact_decrement,
    )?;

    // Spawn the world task; it owns all simulation state from here on.
    let handle = spawn_world(
        WorldEngine::new(world, tuning),
        &WorldSettings {
            command_channel_capacity: config::COMMAND_CHANNEL_CAPACITY,
            world_broadcast_capacity: config::WORLD_BROADCAST_CAPACITY,
            tick_interval,
        },
    );

    // Serialized updates are shared by every connection on a map.
    let (world_bytes_tx, _world_bytes_rx) = broadcast::channel(config::WORLD_BROADCAST_CAPACITY);
    let (world_latest_tx, _world_latest_rx) = watch::channel(BTreeMap::<Arc<str>, Utf8Bytes>::new());
    tokio::spawn(world_update_serializer(
        handle.world_tx.subscribe(),
        world_bytes_tx.clone(),
        world_latest_tx.clone(),
    ));

    let store = Arc::new(InMemoryPlayerStore::new());
    tokio::spawn(autosave_task(
        Arc::clone(&store),
        handle.command_tx.clone(),
        AutosaveConfig {
            interval_seconds: config::autosave_interval_secs(),
        },
    ));

    Ok(Arc::new(AppState {
        sessions: SessionService::new(store, handle.command_tx),
        world_bytes_tx,
        world_latest_tx,
    }))
}
