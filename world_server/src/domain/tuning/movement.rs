/// Gameplay tuning for grid movement.

#[derive(Debug, Clone, Copy)]
pub struct MovementTuning {
    /// Pixel size of one grid cell.
    pub cell_size: i32,

    /// Pixels moved per axis per tick.
    pub step: i32,

    /// Simulated seconds per tick, used to age visual events.
    pub tick_seconds: f32,
}

impl Default for MovementTuning {
    fn default() -> Self {
        Self {
            cell_size: 40,
            step: 5,
            tick_seconds: 0.02,
        }
    }
}
