// Domain layer: core simulation types and rules.

pub mod actions;
pub mod ai;
pub mod errors;
pub mod events;
pub mod items;
pub mod map;
pub mod memory;
pub mod pathfinding;
pub mod ports;
pub mod state;
pub mod systems;
pub mod tuning;
pub mod world;

#[cfg(test)]
pub(crate) mod fixtures;

pub use errors::{ActionError, MapLoadError, MoveError, StoreError, TickError};
pub use map::{Cell, GameMap, Grid, Position};
pub use state::{
    Chest, ChestSnapshot, Enemy, EnemySnapshot, Player, PlayerId, PlayerRecord, PlayerSnapshot,
};
pub use world::{LoadedMap, Region, World};
