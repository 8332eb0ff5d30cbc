// Per-tick simulation systems, run in order by the world engine.

pub mod ai;
pub mod chests;
pub mod combat;
pub mod movement;
