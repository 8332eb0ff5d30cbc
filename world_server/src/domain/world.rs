// Authoritative world state: regions (one per map) plus the online roster.

use crate::domain::ai::PlayerSighting;
use crate::domain::events::VisualEvent;
use crate::domain::map::{GameMap, Position};
use crate::domain::memory::LocationMemory;
use crate::domain::state::{Chest, Enemy, Player, PlayerId, PlayerRecord};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

/// A map with its initial population, as produced by a map loader.
#[derive(Debug, Clone)]
pub struct LoadedMap {
    pub map: GameMap,
    pub chests: Vec<Chest>,
    pub enemies: Vec<Enemy>,
}

/// Everything that lives on one map, except the players.
#[derive(Debug, Clone)]
pub struct Region {
    pub map: GameMap,
    pub chests: Vec<Chest>,
    pub enemies: Vec<Enemy>,
    pub events: Vec<VisualEvent>,
    pub memory: LocationMemory,
}

impl Region {
    pub fn new(loaded: LoadedMap, fact_decrement: f32) -> Self {
        Self {
            map: loaded.map,
            chests: loaded.chests,
            enemies: loaded.enemies,
            events: Vec::new(),
            memory: LocationMemory::new(fact_decrement),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub player_id: PlayerId,
    pub x: i32,
    pub y: i32,
}

/// Monotonic id source; ids are never reused for the server's lifetime.
#[derive(Debug, Clone)]
pub struct IdSequence(u64);

impl IdSequence {
    pub fn starting_at(first: u64) -> Self {
        Self(first)
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.0;
        self.0 += 1;
        id
    }
}

#[derive(Debug)]
pub struct World {
    pub regions: BTreeMap<Arc<str>, Region>,
    pub players: BTreeMap<PlayerId, Player>,
    pub chest_ids: IdSequence,
    default_map: Arc<str>,
    player_ids: IdSequence,
}

impl World {
    /// Builds the world from loaded regions. The first region is the default map.
    /// Chest and enemy ids are renumbered so they are unique across maps.
    pub fn new(regions: Vec<Region>) -> Option<Self> {
        let default_map = regions.first()?.map.name.clone();
        let mut chest_ids = IdSequence::starting_at(1);
        let mut enemy_ids = IdSequence::starting_at(1);
        let mut by_name = BTreeMap::new();

        for mut region in regions {
            for chest in &mut region.chests {
                chest.id = chest_ids.next_id();
            }
            for enemy in &mut region.enemies {
                enemy.id = enemy_ids.next_id();
            }
            by_name.insert(region.map.name.clone(), region);
        }

        Some(Self {
            regions: by_name,
            players: BTreeMap::new(),
            chest_ids,
            default_map,
            player_ids: IdSequence::starting_at(1),
        })
    }

    pub fn default_map(&self) -> &Arc<str> {
        &self.default_map
    }

    pub fn region(&self, map: &str) -> Option<&Region> {
        self.regions.get(map)
    }

    pub fn player_by_name(&self, name: &str) -> Option<&Player> {
        self.players.values().find(|p| p.name == name)
    }

    pub fn player_by_name_mut(&mut self, name: &str) -> Option<&mut Player> {
        self.players.values_mut().find(|p| p.name == name)
    }

    pub fn is_online(&self, name: &str) -> bool {
        self.player_by_name(name).is_some()
    }

    /// A fresh character standing on the default map spawn.
    pub fn new_character(&self, name: &str) -> PlayerRecord {
        let spawn = self
            .regions
            .get(&self.default_map)
            .map(|r| r.map.spawn)
            .unwrap_or_default();
        PlayerRecord::new_character(name, self.default_map.to_string(), spawn)
    }

    /// Places a character into the world. Returns `None` if the name is already online.
    ///
    /// A record pointing at an unknown map lands on the default map spawn; a position outside
    /// its map lands on that map's spawn.
    pub fn spawn_player(
        &mut self,
        addr: SocketAddr,
        mut record: PlayerRecord,
    ) -> Option<(Arc<str>, Placement)> {
        if self.is_online(&record.name) {
            return None;
        }

        let region = match self.regions.get(record.map.as_str()) {
            Some(region) => region,
            None => {
                let region = self.regions.get(&self.default_map)?;
                record.x = region.map.spawn.x;
                record.y = region.map.spawn.y;
                region
            }
        };
        if !region.map.contains(Position::new(record.x, record.y)) {
            record.x = region.map.spawn.x;
            record.y = region.map.spawn.y;
        }
        let map = region.map.name.clone();

        let id = self.player_ids.next_id();
        let player = Player::from_record(id, addr, map.clone(), record);
        let placement = Placement {
            player_id: id,
            x: player.body.pos.x,
            y: player.body.pos.y,
        };
        self.players.insert(id, player);
        Some((map, placement))
    }

    pub fn remove_player(&mut self, name: &str) -> Option<Player> {
        let id = self.player_by_name(name)?.id;
        self.players.remove(&id)
    }

    pub fn sightings(&self, map: &str, roster: &[PlayerId]) -> Vec<PlayerSighting> {
        sightings(&self.players, map, roster)
    }

    pub fn online_per_map(&self) -> BTreeMap<String, usize> {
        let mut counts: BTreeMap<String, usize> = self
            .regions
            .keys()
            .map(|name| (name.to_string(), 0))
            .collect();
        for player in self.players.values() {
            *counts.entry(player.map.to_string()).or_default() += 1;
        }
        counts
    }
}

/// Living player positions on one map, in roster order.
pub fn sightings(
    players: &BTreeMap<PlayerId, Player>,
    map: &str,
    roster: &[PlayerId],
) -> Vec<PlayerSighting> {
    roster
        .iter()
        .filter_map(|id| players.get(id))
        .filter(|p| &*p.map == map && !p.body.is_dead())
        .map(|p| PlayerSighting {
            id: p.id,
            pos: p.body.pos,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::{chest, open_map};

    fn world() -> World {
        let loaded = LoadedMap {
            map: open_map(10, 10),
            chests: vec![chest(99, Position::new(80, 80), 10, &[])],
            enemies: Vec::new(),
        };
        World::new(vec![Region::new(loaded, 0.005)]).expect("one region")
    }

    fn addr() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 9000))
    }

    #[test]
    fn when_world_is_built_then_chest_ids_are_renumbered() {
        let mut world = world();
        assert_eq!(world.regions["test"].chests[0].id, 1);
        assert_eq!(world.chest_ids.next_id(), 2);
    }

    #[test]
    fn when_same_name_logs_in_twice_then_second_spawn_is_refused() {
        let mut world = world();
        let record = PlayerRecord::new_character("alice", "test", Position::new(100, 100));
        let (map, placement) = world.spawn_player(addr(), record.clone()).expect("spawn");
        assert_eq!(&*map, "test");
        assert_eq!((placement.x, placement.y), (100, 100));
        assert!(world.spawn_player(addr(), record).is_none());
        assert_eq!(world.players.len(), 1);
    }

    #[test]
    fn when_record_names_unknown_map_then_player_lands_on_default_spawn() {
        let mut world = world();
        let record = PlayerRecord::new_character("bob", "atlantis", Position::new(100, 100));
        let (map, placement) = world.spawn_player(addr(), record).expect("spawn");
        assert_eq!(&*map, "test");
        assert_eq!((placement.x, placement.y), (20, 20));
    }

    #[test]
    fn when_player_is_removed_then_ids_are_never_reused() {
        let mut world = world();
        let record = PlayerRecord::new_character("carol", "test", Position::new(0, 0));
        let (_, first) = world.spawn_player(addr(), record.clone()).expect("spawn");
        assert!(world.remove_player("carol").is_some());
        let (_, second) = world.spawn_player(addr(), record).expect("respawn");
        assert!(second.player_id > first.player_id);
        assert_eq!(world.online_per_map().get("test"), Some(&1));
    }
}
