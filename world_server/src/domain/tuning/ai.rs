/// Gameplay tuning for enemy agents and their location memory.

#[derive(Debug, Clone, Copy)]
pub struct AiTuning {
    /// Straight-line sight radius in pixels.
    pub sight_range: f32,

    /// Confidence every location fact loses per tick.
    pub fact_decrement: f32,

    /// Confidence of a fresh sighting.
    pub sighting_confidence: f32,

    /// Faint hint recorded at the first player's position when memory is empty.
    pub seed_confidence: Option<f32>,
}

impl Default for AiTuning {
    fn default() -> Self {
        Self {
            sight_range: 320.0,
            fact_decrement: 0.005,
            sighting_confidence: 1.0,
            seed_confidence: Some(0.1),
        }
    }
}
