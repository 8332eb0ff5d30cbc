// Use cases layer: application workflows for the world server.

pub mod autosave;
pub mod engine;
pub mod session;
pub mod types;
pub mod world;

#[cfg(test)]
pub(crate) mod test_support;

pub use engine::{TickOutcome, WorldEngine};
pub use session::{CheckOutcome, SessionError, SessionService};
pub use types::{SpawnOutcome, WorldCommand, WorldStatus, WorldUpdate};
pub use world::{WorldHandle, WorldSettings, spawn_world};
