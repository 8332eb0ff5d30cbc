use crate::domain::ai::{AgentGoal, AgentGoalTarget, Order, Perception, PlayerSighting, RuleSet};
use crate::domain::memory::LocationMemory;
use crate::domain::state::{Enemy, EnemyId};
use crate::domain::tuning::AiTuning;

/// Runs the first matching rule for every live enemy and collects the movement orders.
pub fn run_rules(
    enemies: &mut [Enemy],
    rules: &RuleSet,
    perception: &Perception<'_>,
) -> Vec<(EnemyId, Order)> {
    enemies
        .iter_mut()
        .filter(|e| e.alive)
        .filter_map(|e| rules.execute(e, perception).map(|order| (e.id, order)))
        .collect()
}

/// World-triggered goal and target transitions, plus location memory updates.
///
/// Called after memory decay so a fresh sighting keeps full confidence until the next tick.
pub fn perceive(
    enemies: &mut [Enemy],
    memory: &mut LocationMemory,
    players: &[PlayerSighting],
    tuning: &AiTuning,
    cell_size: i32,
) {
    if let (Some(seed), Some(first)) = (tuning.seed_confidence, players.first()) {
        if memory.is_empty() {
            memory.record(first.pos, seed);
        }
    }

    for enemy in enemies.iter_mut().filter(|e| e.alive) {
        let behaviour = &mut enemy.behaviour;

        // Players that left the map or died are no longer trackable.
        if let Some(AgentGoalTarget::Player(id)) = behaviour.target {
            if !players.iter().any(|p| p.id == id) {
                behaviour.target = None;
            }
        }

        match behaviour.goal {
            AgentGoal::GuardChest => {
                let Some(AgentGoalTarget::Point(post)) = behaviour.target else {
                    continue;
                };
                let post_cell = post.cell(cell_size);
                if let Some(intruder) = players.iter().find(|p| p.pos.cell(cell_size) == post_cell) {
                    behaviour.set_goal(AgentGoal::KillPlayer);
                    behaviour.target = Some(AgentGoalTarget::Player(intruder.id));
                }
            }
            AgentGoal::FindPlayer => {
                let from = enemy.body.pos;
                if let Some(seen) = players
                    .iter()
                    .find(|p| from.distance(p.pos) <= tuning.sight_range)
                {
                    memory.record(seen.pos, tuning.sighting_confidence);
                    behaviour.target = Some(AgentGoalTarget::Player(seen.id));
                }
            }
            AgentGoal::KillPlayer => {
                if let Some(AgentGoalTarget::Point(at)) = behaviour.target {
                    if memory.confidence(at).is_none() {
                        behaviour.target = None;
                    }
                }
                if behaviour.target.is_none() {
                    behaviour.target = memory.best().map(|(at, _)| AgentGoalTarget::Point(at));
                }
            }
        }
    }
}
