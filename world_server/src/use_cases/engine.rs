// One authoritative simulation step over the whole world, plus command handling.

use crate::domain::actions::{apply_action, parse_action};
use crate::domain::ai::{Perception, RuleSet};
use crate::domain::errors::{ActionError, TickError};
use crate::domain::events::decay_events;
use crate::domain::map::Cell;
use crate::domain::pathfinding::{AStar, Pathfinder};
use crate::domain::ports::DamageCalculator;
use crate::domain::systems::{ai, chests, combat, movement};
use crate::domain::tuning::{PlayerDeathPolicy, WorldTuning};
use crate::domain::world::{World, sightings};
use crate::domain::{ChestSnapshot, EnemySnapshot, PlayerId, PlayerRecord, PlayerSnapshot};
use crate::use_cases::types::{SpawnOutcome, WorldCommand, WorldStatus, WorldUpdate};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
pub struct TickOutcome {
    pub tick: u64,
    pub updates: Vec<WorldUpdate>,
    pub faults: Vec<TickError>,
}

pub struct WorldEngine {
    world: World,
    rules: RuleSet,
    pathfinder: Box<dyn Pathfinder>,
    damage: Box<dyn DamageCalculator>,
    tuning: WorldTuning,
    tick: u64,
    // Last revision stamped onto an outgoing player record.
    revision: u64,
}

impl WorldEngine {
    pub fn new(world: World, tuning: WorldTuning) -> Self {
        Self {
            world,
            rules: RuleSet::standard(),
            pathfinder: Box::new(AStar::default()),
            damage: Box::new(combat::StatDamage),
            tuning,
            tick: 0,
            revision: 0,
        }
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_pathfinder(mut self, pathfinder: impl Pathfinder + 'static) -> Self {
        self.pathfinder = Box::new(pathfinder);
        self
    }

    pub fn with_damage(mut self, damage: impl DamageCalculator + 'static) -> Self {
        self.damage = Box::new(damage);
        self
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Applies one session-side command. Replies to dropped receivers are ignored.
    pub fn handle(&mut self, command: WorldCommand) {
        match command {
            WorldCommand::Spawn {
                name,
                addr,
                record,
                reply,
            } => {
                let record = record.unwrap_or_else(|| self.world.new_character(&name));
                self.revision = self.revision.max(record.revision);
                let outcome = match self.world.spawn_player(addr, record) {
                    Some((map, placement)) => {
                        info!(player_id = placement.player_id, %map, %addr, "player spawned");
                        SpawnOutcome::Accepted {
                            player_id: placement.player_id,
                            map: map.to_string(),
                            x: placement.x,
                            y: placement.y,
                        }
                    }
                    None => {
                        warn!(name = %name, "spawn refused; already online");
                        SpawnOutcome::AlreadyOnline
                    }
                };
                let _ = reply.send(outcome);
            }
            WorldCommand::Despawn { name, reply } => {
                let record = self.world.remove_player(&name).map(|player| {
                    info!(player_id = player.id, map = %player.map, "player despawned");
                    player.to_record()
                });
                let _ = reply.send(record.map(|r| self.stamp(r)));
            }
            WorldCommand::Move {
                player_id,
                x_speed,
                y_speed,
            } => {
                let step = self.tuning.movement.step;
                if let Some(player) = self.world.players.get_mut(&player_id) {
                    if !player.body.is_dead() {
                        let (x, y) = movement::clamp_velocity(x_speed, y_speed, step);
                        player.body.x_speed = x;
                        player.body.y_speed = y;
                    }
                }
            }
            WorldCommand::Actions {
                owner,
                actions,
                reply,
            } => {
                let results = actions
                    .iter()
                    .map(|raw| self.apply_raw_action(&owner, raw))
                    .collect();
                let _ = reply.send(results);
            }
            WorldCommand::IsOnline { name, reply } => {
                let _ = reply.send(self.world.is_online(&name));
            }
            WorldCommand::SnapshotPlayers { reply } => {
                let records: Vec<_> = self.world.players.values().map(|p| p.to_record()).collect();
                let records = records.into_iter().map(|r| self.stamp(r)).collect();
                let _ = reply.send(records);
            }
            WorldCommand::Status { reply } => {
                let _ = reply.send(WorldStatus {
                    tick: self.tick,
                    online: self.world.online_per_map(),
                });
            }
        }
    }

    fn stamp(&mut self, mut record: PlayerRecord) -> PlayerRecord {
        self.revision += 1;
        record.revision = self.revision;
        record
    }

    fn apply_raw_action(&mut self, owner: &str, raw: &str) -> Result<(), ActionError> {
        let world = &self.world;
        let action = parse_action(raw, |name| world.is_online(name))?;
        // A session may only act on its own character.
        if action.player != owner {
            return Err(ActionError::UnknownPlayer(action.player));
        }
        let player = self
            .world
            .player_by_name_mut(&action.player)
            .ok_or_else(|| ActionError::UnknownPlayer(action.player.clone()))?;
        apply_action(player, &action)
    }

    /// Runs one tick, containing any panic so the scheduler keeps going.
    /// Returns `None` when the tick panicked; mutations made before the panic are kept.
    pub fn tick_guarded(&mut self) -> Option<TickOutcome> {
        match catch_unwind(AssertUnwindSafe(|| self.step())) {
            Ok(outcome) => {
                for fault in &outcome.faults {
                    warn!(tick = outcome.tick, error = %fault, "tick fault");
                }
                Some(outcome)
            }
            Err(_) => {
                error!(tick = self.tick, "tick panicked; continuing with next tick");
                None
            }
        }
    }

    /// Advances the world by one tick.
    pub fn step(&mut self) -> TickOutcome {
        self.tick += 1;
        let tick = self.tick;
        let tuning = self.tuning;
        let mut faults = Vec::new();

        // Players that join or leave after this point are seen next tick.
        let roster: Vec<PlayerId> = self.world.players.keys().copied().collect();
        for player in self.world.players.values() {
            if !self.world.regions.contains_key(&player.map) {
                faults.push(TickError::MissingRegion {
                    player_id: player.id,
                    map: player.map.to_string(),
                });
            }
        }

        let World {
            regions,
            players,
            chest_ids,
            ..
        } = &mut self.world;
        let on_roster = |id: &PlayerId| roster.binary_search(id).is_ok();

        let mut updates = Vec::with_capacity(regions.len());
        for (name, region) in regions.iter_mut() {
            let cell_size = region.map.cell_size;

            decay_events(&mut region.events, tuning.movement.tick_seconds);
            for enemy_id in combat::tick_respawns(&mut region.enemies) {
                info!(tick, enemy_id, map = %name, "enemy respawned");
            }

            let seen = sightings(players, name, &roster);
            let perception = Perception {
                players: &seen,
                memory: &region.memory,
                sight_range: tuning.ai.sight_range,
            };
            let orders = ai::run_rules(&mut region.enemies, &self.rules, &perception);

            let occupied: Vec<(u64, Cell)> = region
                .enemies
                .iter()
                .filter(|e| e.alive)
                .map(|e| (e.id, e.body.pos.cell(cell_size)))
                .collect();
            for (enemy_id, order) in orders {
                let Some(enemy) = region.enemies.iter_mut().find(|e| e.id == enemy_id) else {
                    continue;
                };
                let busy: Vec<Cell> = occupied
                    .iter()
                    .filter(|(id, _)| *id != enemy_id)
                    .map(|(_, cell)| *cell)
                    .collect();
                if let Err(source) = movement::plan_step(
                    &mut enemy.body,
                    &mut region.map,
                    order.destination(),
                    &busy,
                    self.pathfinder.as_ref(),
                    tuning.movement.step,
                ) {
                    faults.push(TickError::Movement { enemy_id, source });
                }
            }

            for player in players
                .values_mut()
                .filter(|p| on_roster(&p.id) && p.map == *name)
            {
                movement::commit(&mut player.body, &region.map);
            }
            for enemy in region.enemies.iter_mut().filter(|e| e.alive) {
                movement::commit(&mut enemy.body, &region.map);
            }

            let purged = region.memory.decay();
            if purged > 0 {
                debug!(tick, map = %name, purged, "location facts faded");
            }
            let seen = sightings(players, name, &roster);
            ai::perceive(
                &mut region.enemies,
                &mut region.memory,
                &seen,
                &tuning.ai,
                cell_size,
            );

            let pickups = chests::resolve_pickups(
                players
                    .values_mut()
                    .filter(|p| on_roster(&p.id) && p.map == *name),
                &mut region.chests,
                cell_size,
            );
            for pickup in &pickups {
                info!(
                    tick,
                    player_id = pickup.player_id,
                    chest_id = pickup.chest_id,
                    money = pickup.money,
                    items = pickup.items.len(),
                    "chest opened"
                );
            }

            let report = combat::resolve_combat(
                players
                    .values_mut()
                    .filter(|p| on_roster(&p.id) && p.map == *name),
                &mut region.enemies,
                &mut region.chests,
                &mut region.events,
                || chest_ids.next_id(),
                self.damage.as_ref(),
                &tuning.combat,
                cell_size,
            );
            for kill in &report.kills {
                info!(
                    tick,
                    player_id = kill.player_id,
                    enemy_id = kill.enemy_id,
                    experience = kill.experience,
                    "enemy defeated"
                );
            }
            for player_id in &report.fallen {
                let Some(player) = players.get_mut(player_id) else {
                    continue;
                };
                info!(tick, player_id, map = %name, "player fell");
                if tuning.player_death == PlayerDeathPolicy::Respawn {
                    player.body.restore_at(region.map.spawn);
                }
            }
            combat::apply_enemy_death_policy(&mut region.enemies, tuning.enemy_death);

            chests::purge_opened(&mut region.chests);

            updates.push(WorldUpdate {
                tick,
                map: Arc::clone(name),
                players: players
                    .values()
                    .filter(|p| on_roster(&p.id) && p.map == *name)
                    .map(PlayerSnapshot::from)
                    .collect(),
                chests: region.chests.iter().map(ChestSnapshot::from).collect(),
                enemies: region.enemies.iter().map(EnemySnapshot::from).collect(),
                events: region.events.clone(),
            });
        }

        TickOutcome {
            tick,
            updates,
            faults,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ai::{AgentGoal, AgentGoalTarget, AgentType};
    use crate::domain::fixtures::{chest, enemy, guard, open_map};
    use crate::domain::map::{GameMap, Grid, Position};
    use crate::domain::state::{Chest, Enemy, PlayerRecord};
    use crate::domain::world::{LoadedMap, Region};
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::oneshot;

    fn engine_with(chests: Vec<Chest>, enemies: Vec<Enemy>) -> WorldEngine {
        let loaded = LoadedMap {
            map: open_map(40, 32),
            chests,
            enemies,
        };
        let world = World::new(vec![Region::new(loaded, 0.005)]).expect("one region");
        WorldEngine::new(world, WorldTuning::default())
    }

    fn spawn(engine: &mut WorldEngine, name: &str, x: i32, y: i32) -> PlayerId {
        let record = PlayerRecord::new_character(name, "test", Position::new(x, y));
        let (_, placement) = engine
            .world_mut()
            .spawn_player(SocketAddr::from(([127, 0, 0, 1], 7000)), record)
            .expect("spawn");
        placement.player_id
    }

    struct PanicOnce(AtomicBool);

    impl DamageCalculator for PanicOnce {
        fn damage(
            &self,
            _attacker: &crate::domain::state::Character,
            _defender: &crate::domain::state::Character,
        ) -> i32 {
            if !self.0.swap(true, Ordering::SeqCst) {
                panic!("damage table unavailable");
            }
            1
        }
    }

    #[test]
    fn when_player_shares_cell_with_chest_then_one_tick_grants_contents_and_hides_chest() {
        let mut engine = engine_with(vec![chest(1, Position::new(80, 80), 1000, &["4003"])], vec![]);
        let id = spawn(&mut engine, "alice", 80, 80);
        let money_before = engine.world().players[&id].money;

        let outcome = engine.step();

        let alice = &engine.world().players[&id];
        assert!(alice.inventory.contains_id("4003"));
        assert_eq!(alice.money, money_before + 1000);
        assert!(outcome.updates[0].chests.is_empty());
        assert!(engine.step().updates[0].chests.is_empty());
    }

    #[test]
    fn when_player_enters_scout_sight_then_next_tick_remembers_it_with_full_confidence() {
        let mut engine = engine_with(vec![], vec![enemy(AgentType::Scout, Position::new(640, 640))]);
        let id = spawn(&mut engine, "bob", 700, 700);

        engine.step();

        let region = engine.world().region("test").expect("region");
        assert_eq!(region.memory.confidence(Position::new(700, 700)), Some(1.0));
        assert_eq!(
            region.enemies[0].behaviour.target,
            Some(AgentGoalTarget::Player(id))
        );
    }

    #[test]
    fn when_player_steps_on_guarded_chest_then_guard_hunts_within_one_tick() {
        let mut engine = engine_with(
            vec![],
            vec![guard(Position::new(640, 160), Position::new(80, 80))],
        );
        engine.step();
        assert_eq!(
            engine.world().regions["test"].enemies[0].behaviour.goal,
            AgentGoal::GuardChest
        );

        let id = spawn(&mut engine, "carol", 90, 90);
        engine.step();
        let behaviour = &engine.world().regions["test"].enemies[0].behaviour;
        assert_eq!(behaviour.goal, AgentGoal::KillPlayer);
        assert_eq!(behaviour.target, Some(AgentGoalTarget::Player(id)));
    }

    #[test]
    fn when_a_tick_panics_then_the_next_tick_still_runs() {
        let mut orc = enemy(AgentType::Assassin, Position::new(40, 40));
        orc.body.atk_time = 1000;
        let mut engine = engine_with(vec![], vec![orc])
            .with_damage(PanicOnce(AtomicBool::new(false)));
        let id = spawn(&mut engine, "dave", 40, 40);
        engine.world_mut().players.get_mut(&id).expect("dave").body.atk_time = 1000;

        assert!(engine.tick_guarded().is_none());
        let outcome = engine.tick_guarded().expect("second tick completes");
        assert_eq!(outcome.tick, 2);
        assert_eq!(outcome.updates.len(), 1);
    }

    #[test]
    fn when_move_is_requested_then_velocity_is_clamped_and_applied_once() {
        let mut engine = engine_with(vec![], vec![]);
        let id = spawn(&mut engine, "erin", 200, 200);
        engine.handle(WorldCommand::Move {
            player_id: id,
            x_speed: 40,
            y_speed: -40,
        });

        engine.step();
        let erin = &engine.world().players[&id];
        assert_eq!(erin.body.pos, Position::new(205, 195));
        assert!(!erin.body.has_velocity());

        engine.step();
        assert_eq!(engine.world().players[&id].body.pos, Position::new(205, 195));
    }

    #[test]
    fn when_player_falls_then_it_respawns_at_map_spawn() {
        let mut orc = enemy(AgentType::Assassin, Position::new(400, 400));
        orc.body.atk_time = 1000;
        orc.body.stats.atk = 10_000;
        let mut engine = engine_with(vec![], vec![orc]);
        let id = spawn(&mut engine, "frank", 400, 400);

        let outcome = engine.step();
        let frank = &engine.world().players[&id];
        assert_eq!(frank.body.pos, Position::new(20, 20));
        assert_eq!(frank.body.hp, frank.body.stats.max_hp);
        assert!(!outcome.updates[0].events.is_empty());
    }

    #[test]
    fn when_action_batch_mixes_good_and_bad_items_then_each_is_reported() {
        let mut engine = engine_with(vec![], vec![]);
        spawn(&mut engine, "gina", 0, 0);
        spawn(&mut engine, "hank", 40, 0);
        let (reply, mut rx) = oneshot::channel();
        engine.handle(WorldCommand::Actions {
            owner: "gina".to_string(),
            actions: vec![
                "ATTR_UP,gina,0".to_string(),
                "ATTR_UP,nobody,0".to_string(),
                "EQUIP,gina,x".to_string(),
                "ATTR_UP,hank,0".to_string(),
                "EQUIP,gina,0".to_string(),
            ],
            reply,
        });

        let results = rx.try_recv().expect("reply");
        assert_eq!(results[0], Ok(()));
        assert_eq!(results[1], Err(ActionError::UnknownPlayer("nobody".to_string())));
        assert_eq!(results[2], Err(ActionError::BadValue("x".to_string())));
        assert_eq!(results[3], Err(ActionError::UnknownPlayer("hank".to_string())));
        assert_eq!(results[4], Err(ActionError::ItemNotFound(0)));
        let gina = engine.world().player_by_name("gina").expect("gina");
        assert_eq!(
            gina.attribute_points,
            PlayerRecord::STARTING_ATTRIBUTE_POINTS - 1
        );
    }

    #[test]
    fn when_player_is_on_unknown_map_then_tick_reports_fault_and_completes() {
        let mut engine = engine_with(vec![], vec![]);
        let id = spawn(&mut engine, "ivy", 0, 0);
        engine.world_mut().players.get_mut(&id).expect("ivy").map = Arc::from("void");

        let outcome = engine.tick_guarded().expect("tick completes");
        assert_eq!(
            outcome.faults,
            vec![TickError::MissingRegion {
                player_id: id,
                map: "void".to_string(),
            }]
        );
        assert!(outcome.updates[0].players.is_empty());
    }

    #[test]
    fn when_status_is_requested_then_tick_and_online_counts_are_reported() {
        let mut engine = engine_with(vec![], vec![]);
        spawn(&mut engine, "jack", 0, 0);
        engine.step();
        let (reply, mut rx) = oneshot::channel();
        engine.handle(WorldCommand::Status { reply });
        let status = rx.try_recv().expect("status");
        assert_eq!(status.tick, 1);
        assert_eq!(status.online.get("test"), Some(&1));
    }

    fn populated_region(name: &str) -> Region {
        let loaded = LoadedMap {
            map: GameMap::new(name, Grid::open(20, 20), 40, Position::new(20, 20)),
            chests: vec![chest(1, Position::new(700, 700), 50, &[])],
            enemies: vec![enemy(AgentType::Scout, Position::new(700, 100))],
        };
        Region::new(loaded, 0.005)
    }

    #[test]
    fn when_two_maps_are_populated_then_ids_are_unique_and_updates_stay_per_map() {
        let world = World::new(vec![populated_region("east"), populated_region("west")])
            .expect("two regions");
        let mut engine = WorldEngine::new(world, WorldTuning::default());
        for (name, map) in [("erin", "east"), ("walt", "west")] {
            let record = PlayerRecord::new_character(name, map, Position::new(100, 100));
            let (placed_on, _) = engine
                .world_mut()
                .spawn_player(SocketAddr::from(([127, 0, 0, 1], 7001)), record)
                .expect("spawn");
            assert_eq!(&*placed_on, map);
        }

        let outcome = engine.step();
        assert_eq!(outcome.updates.len(), 2);
        let contents = |map: &str| {
            let update = outcome
                .updates
                .iter()
                .find(|u| &*u.map == map)
                .expect("update for map");
            (
                update.players.iter().map(|p| p.name.clone()).collect::<Vec<_>>(),
                update.chests.iter().map(|c| c.id).collect::<Vec<_>>(),
                update.enemies.iter().map(|e| e.id).collect::<Vec<_>>(),
            )
        };
        assert_eq!(contents("east"), (vec!["erin".to_string()], vec![1], vec![1]));
        assert_eq!(contents("west"), (vec!["walt".to_string()], vec![2], vec![2]));
    }

    #[test]
    fn when_records_are_handed_out_then_each_copy_is_newer_than_the_last() {
        let mut engine = engine_with(vec![], vec![]);
        spawn(&mut engine, "alice", 100, 100);

        let (reply, mut rx) = oneshot::channel();
        engine.handle(WorldCommand::SnapshotPlayers { reply });
        let snapshot = rx.try_recv().expect("snapshot");
        let (reply, mut rx) = oneshot::channel();
        engine.handle(WorldCommand::Despawn {
            name: "alice".to_string(),
            reply,
        });
        let mut despawned = rx.try_recv().expect("reply").expect("alice was online");
        assert!(snapshot[0].is_older_than(&despawned));

        // A record saved by an earlier run keeps later copies ahead of it.
        despawned.revision = 50;
        let (reply, _rx) = oneshot::channel();
        engine.handle(WorldCommand::Spawn {
            name: "alice".to_string(),
            addr: SocketAddr::from(([127, 0, 0, 1], 7002)),
            record: Some(despawned),
            reply,
        });
        let (reply, mut rx) = oneshot::channel();
        engine.handle(WorldCommand::SnapshotPlayers { reply });
        assert_eq!(rx.try_recv().expect("snapshot")[0].revision, 51);
    }
}
