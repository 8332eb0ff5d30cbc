// Transient client-facing events (damage numbers and the like).

use crate::domain::map::Position;

#[derive(Debug, Clone, PartialEq)]
pub struct VisualEvent {
    pub pos: Position,
    /// Seconds left before the event is purged.
    pub remaining: f32,
    pub payload: String,
}

impl VisualEvent {
    pub fn new(pos: Position, duration: f32, payload: impl Into<String>) -> Self {
        Self {
            pos,
            remaining: duration,
            payload: payload.into(),
        }
    }
}

/// Ages every event by `dt` seconds and purges the expired ones.
pub fn decay_events(events: &mut Vec<VisualEvent>, dt: f32) {
    for event in events.iter_mut() {
        event.remaining -= dt;
    }
    events.retain(|e| e.remaining > 0.0);
}
