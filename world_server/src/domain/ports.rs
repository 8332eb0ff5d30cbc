// Narrow interfaces to collaborators that live outside the simulation.

use crate::domain::errors::{MapLoadError, StoreError};
use crate::domain::state::{Character, PlayerRecord};
use crate::domain::world::LoadedMap;
use async_trait::async_trait;

/// Account and character persistence.
#[async_trait]
pub trait PlayerStore: Send + Sync {
    async fn account_exists(&self, name: &str) -> Result<bool, StoreError>;

    async fn create_account(&self, name: &str, password: &str, email: &str)
    -> Result<(), StoreError>;

    async fn validate_login(&self, name: &str, password: &str) -> Result<bool, StoreError>;

    /// `None` means the account has never entered the world.
    async fn load_player(&self, name: &str) -> Result<Option<PlayerRecord>, StoreError>;

    async fn save_player(&self, record: &PlayerRecord) -> Result<(), StoreError>;

    async fn save_map_assignment(&self, map: &str, name: &str) -> Result<(), StoreError>;

    async fn flush(&self) -> Result<(), StoreError>;
}

/// Loads map geometry and its initial population. Called once per configured map at startup.
pub trait MapLoader: Send + Sync {
    fn load_map(&self, map_id: &str) -> Result<LoadedMap, MapLoadError>;
}

/// Produces the damage one attack deals. Balancing lives behind this seam.
pub trait DamageCalculator: Send + Sync {
    fn damage(&self, attacker: &Character, defender: &Character) -> i32;
}
