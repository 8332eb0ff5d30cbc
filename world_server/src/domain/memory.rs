// Decaying memory of where pursued players were last seen.

use crate::domain::map::Position;
use std::collections::BTreeMap;

/// Confidence-weighted location facts. Ordered so ties resolve the same way every run.
#[derive(Debug, Clone)]
pub struct LocationMemory {
    facts: BTreeMap<Position, f32>,
    decrement: f32,
}

impl LocationMemory {
    pub fn new(decrement: f32) -> Self {
        Self {
            facts: BTreeMap::new(),
            decrement,
        }
    }

    /// Stores a sighting; an existing entry is overwritten, never accumulated.
    pub fn record(&mut self, at: Position, confidence: f32) {
        self.facts.insert(at, confidence.clamp(0.0, 1.0));
    }

    /// Lowers every confidence by the decrement and drops entries that fell below zero.
    /// Returns how many facts were purged.
    pub fn decay(&mut self) -> usize {
        let before = self.facts.len();
        for confidence in self.facts.values_mut() {
            *confidence -= self.decrement;
        }
        self.facts.retain(|_, confidence| *confidence >= 0.0);
        before - self.facts.len()
    }

    /// Highest-confidence location; facts at exactly zero are never returned.
    pub fn best(&self) -> Option<(Position, f32)> {
        let mut best: Option<(Position, f32)> = None;
        for (pos, confidence) in &self.facts {
            if *confidence > best.map_or(0.0, |(_, c)| c) {
                best = Some((*pos, *confidence));
            }
        }
        best
    }

    pub fn confidence(&self, at: Position) -> Option<f32> {
        self.facts.get(&at).copied()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}
