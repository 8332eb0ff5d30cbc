/// Gameplay tuning for melee combat.

#[derive(Debug, Clone, Copy)]
pub struct CombatTuning {
    /// Ticks between attacks at zero attack speed.
    pub base_interval: u32,

    /// Seconds a damage event stays visible to clients.
    pub event_duration: f32,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            base_interval: 50,
            event_duration: 0.5,
        }
    }
}
