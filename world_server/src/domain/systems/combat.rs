use crate::domain::events::VisualEvent;
use crate::domain::ports::DamageCalculator;
use crate::domain::state::{Character, Chest, ChestId, Enemy, EnemyId, Player, PlayerId};
use crate::domain::tuning::{CombatTuning, EnemyDeathPolicy};

/// Default damage rule: attack minus half the defence, at least one point.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatDamage;

impl DamageCalculator for StatDamage {
    fn damage(&self, attacker: &Character, defender: &Character) -> i32 {
        (attacker.stats.atk - defender.stats.def / 2).max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kill {
    pub player_id: PlayerId,
    pub enemy_id: EnemyId,
    pub experience: u64,
    pub chest_id: ChestId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombatReport {
    pub hits: usize,
    pub kills: Vec<Kill>,
    pub fallen: Vec<PlayerId>,
}

/// Resolves melee between every living player and living enemy sharing a cell.
///
/// Both sides of a pair advance their own cooldown; a hit emits a visual event at the defender.
/// A killed enemy spawns its loot chest into `chests` and rewards the attacker.
#[allow(clippy::too_many_arguments)]
pub fn resolve_combat<'a>(
    players: impl IntoIterator<Item = &'a mut Player>,
    enemies: &mut [Enemy],
    chests: &mut Vec<Chest>,
    events: &mut Vec<VisualEvent>,
    mut next_chest_id: impl FnMut() -> ChestId,
    damage: &dyn DamageCalculator,
    tuning: &CombatTuning,
    cell_size: i32,
) -> CombatReport {
    let mut report = CombatReport::default();

    for player in players {
        if player.body.is_dead() {
            continue;
        }
        let cell = player.body.pos.cell(cell_size);

        for enemy in enemies
            .iter_mut()
            .filter(|e| e.alive && e.body.pos.cell(cell_size) == cell)
        {
            if player.body.tick_attack(tuning.base_interval) {
                let amount = damage.damage(&player.body, &enemy.body);
                let dealt = enemy.body.take_damage(amount);
                events.push(VisualEvent::new(
                    enemy.body.pos,
                    tuning.event_duration,
                    dealt.to_string(),
                ));
                report.hits += 1;

                if enemy.body.is_dead() {
                    let chest_id = next_chest_id();
                    chests.push(enemy.on_death(chest_id));
                    player.gain_experience(enemy.experience);
                    report.kills.push(Kill {
                        player_id: player.id,
                        enemy_id: enemy.id,
                        experience: enemy.experience,
                        chest_id,
                    });
                    continue;
                }
            }

            if enemy.body.tick_attack(tuning.base_interval) {
                let amount = damage.damage(&enemy.body, &player.body);
                let dealt = player.body.take_damage(amount);
                events.push(VisualEvent::new(
                    player.body.pos,
                    tuning.event_duration,
                    dealt.to_string(),
                ));
                report.hits += 1;

                if player.body.is_dead() {
                    report.fallen.push(player.id);
                    break;
                }
            }
        }
    }

    report
}

/// Applies the death policy to enemies that fell this tick. Returns how many were removed.
pub fn apply_enemy_death_policy(enemies: &mut Vec<Enemy>, policy: EnemyDeathPolicy) -> usize {
    match policy {
        EnemyDeathPolicy::Persist => 0,
        EnemyDeathPolicy::Remove => {
            let before = enemies.len();
            enemies.retain(|e| e.alive);
            before - enemies.len()
        }
        EnemyDeathPolicy::Respawn { after_ticks } => {
            for enemy in enemies.iter_mut().filter(|e| !e.alive && e.respawn_in.is_none()) {
                enemy.respawn_in = Some(after_ticks);
            }
            0
        }
    }
}

/// Counts down respawn timers and restores enemies whose timer ran out.
pub fn tick_respawns(enemies: &mut [Enemy]) -> Vec<EnemyId> {
    let mut restored = Vec::new();
    for enemy in enemies.iter_mut().filter(|e| !e.alive) {
        let Some(left) = enemy.respawn_in else {
            continue;
        };
        let left = left.saturating_sub(1);
        if left == 0 {
            enemy.respawn();
            restored.push(enemy.id);
        } else {
            enemy.respawn_in = Some(left);
        }
    }
    restored
}
