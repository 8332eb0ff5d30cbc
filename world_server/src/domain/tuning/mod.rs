// Gameplay tuning, kept apart from runtime/server configuration.

pub mod ai;
pub mod combat;
pub mod movement;
pub mod policy;

pub use ai::AiTuning;
pub use combat::CombatTuning;
pub use movement::MovementTuning;
pub use policy::{EnemyDeathPolicy, PlayerDeathPolicy};

#[derive(Debug, Clone, Copy, Default)]
pub struct WorldTuning {
    pub ai: AiTuning,
    pub combat: CombatTuning,
    pub movement: MovementTuning,
    pub enemy_death: EnemyDeathPolicy,
    pub player_death: PlayerDeathPolicy,
}
