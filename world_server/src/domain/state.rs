// Domain-level simulation entities and snapshot types.

use crate::domain::ai::{AgentBehaviour, AgentGoalTarget};
use crate::domain::errors::ActionError;
use crate::domain::items::{self, Equipment, Inventory, Item};
use crate::domain::map::Position;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

pub type PlayerId = u64;
pub type EnemyId = u64;
pub type ChestId = u64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatStats {
    pub atk: i32,
    pub def: i32,
    /// Attack speed; higher values shorten the attack interval.
    pub aspd: i32,
    pub max_hp: i32,
}

/// Capability set shared by players and enemies.
#[derive(Debug, Clone)]
pub struct Character {
    pub pos: Position,
    // Desired velocity for the current tick only.
    pub x_speed: i32,
    pub y_speed: i32,
    pub hp: i32,
    // Ticks accumulated since the last attack.
    pub atk_time: u32,
    pub stats: CombatStats,
}

impl Character {
    pub fn new(pos: Position, stats: CombatStats) -> Self {
        Self {
            pos,
            x_speed: 0,
            y_speed: 0,
            hp: stats.max_hp,
            atk_time: 0,
            stats,
        }
    }

    pub fn has_velocity(&self) -> bool {
        self.x_speed != 0 || self.y_speed != 0
    }

    pub fn stop(&mut self) {
        self.x_speed = 0;
        self.y_speed = 0;
    }

    /// Subtracts damage, never letting health drop below zero. Returns the damage applied.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let amount = amount.max(0).min(self.hp);
        self.hp -= amount;
        amount
    }

    pub fn is_dead(&self) -> bool {
        self.hp <= 0
    }

    /// Full health at `pos` with no pending movement or attack progress.
    pub fn restore_at(&mut self, pos: Position) {
        self.pos = pos;
        self.hp = self.stats.max_hp;
        self.atk_time = 0;
        self.stop();
    }

    /// Advances the attack cooldown by one tick and reports whether an attack fires.
    /// The counter resets when it does.
    pub fn tick_attack(&mut self, base_interval: u32) -> bool {
        self.atk_time += 1;
        if f64::from(self.atk_time) >= attack_threshold(base_interval, self.stats.aspd) {
            self.atk_time = 0;
            true
        } else {
            false
        }
    }
}

/// Ticks between attacks: `base_interval / (1 + aspd / 100)`.
pub fn attack_threshold(base_interval: u32, aspd: i32) -> f64 {
    f64::from(base_interval) / (1.0 + f64::from(aspd) / 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Strength,
    Vitality,
    Dexterity,
    Agility,
    Intellect,
    Luck,
}

impl Attribute {
    pub const ALL: [Attribute; 6] = [
        Attribute::Strength,
        Attribute::Vitality,
        Attribute::Dexterity,
        Attribute::Agility,
        Attribute::Intellect,
        Attribute::Luck,
    ];

    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes(pub [i32; 6]);

impl Default for Attributes {
    fn default() -> Self {
        Self([1; 6])
    }
}

impl Attributes {
    pub fn get(&self, attr: Attribute) -> i32 {
        self.0[attr.index()]
    }

    fn raise(&mut self, attr: Attribute) {
        self.0[attr.index()] += 1;
    }
}

/// Persisted player state exchanged with the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub map: String,
    pub x: i32,
    pub y: i32,
    // None restores full health on load.
    pub hp: Option<i32>,
    pub attributes: Attributes,
    pub attribute_points: u32,
    pub base_xp: u64,
    pub job_xp: u64,
    pub stat_xp: u64,
    pub money: u64,
    pub inventory: Vec<Item>,
    pub equipment: Equipment,
    // Stamped by the world each time it hands out a copy. Stores keep the highest one.
    #[serde(default)]
    pub revision: u64,
}

impl PlayerRecord {
    pub const STARTING_ATTRIBUTE_POINTS: u32 = 5;

    /// A fresh character standing at `spawn` on `map`.
    pub fn new_character(name: impl Into<String>, map: impl Into<String>, spawn: Position) -> Self {
        Self {
            name: name.into(),
            map: map.into(),
            x: spawn.x,
            y: spawn.y,
            hp: None,
            attributes: Attributes::default(),
            attribute_points: Self::STARTING_ATTRIBUTE_POINTS,
            base_xp: 0,
            job_xp: 0,
            stat_xp: 0,
            money: 0,
            inventory: Vec::new(),
            equipment: Equipment::default(),
            revision: 0,
        }
    }

    /// True when `stored` was taken later than this copy.
    pub fn is_older_than(&self, stored: &PlayerRecord) -> bool {
        self.revision < stored.revision
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub addr: SocketAddr,
    pub map: Arc<str>,
    pub body: Character,
    pub attributes: Attributes,
    pub attribute_points: u32,
    pub base_xp: u64,
    pub job_xp: u64,
    pub stat_xp: u64,
    pub money: u64,
    pub inventory: Inventory,
    pub equipment: Equipment,
}

impl Player {
    pub fn from_record(id: PlayerId, addr: SocketAddr, map: Arc<str>, record: PlayerRecord) -> Self {
        let mut player = Self {
            id,
            name: record.name,
            addr,
            map,
            body: Character::new(Position::new(record.x, record.y), CombatStats::default()),
            attributes: record.attributes,
            attribute_points: record.attribute_points,
            base_xp: record.base_xp,
            job_xp: record.job_xp,
            stat_xp: record.stat_xp,
            money: record.money,
            inventory: Inventory::from_items(record.inventory),
            equipment: record.equipment,
        };
        player.recompute_stats();
        let max_hp = player.body.stats.max_hp;
        player.body.hp = record.hp.map_or(max_hp, |hp| hp.clamp(1, max_hp));
        player
    }

    pub fn to_record(&self) -> PlayerRecord {
        PlayerRecord {
            name: self.name.clone(),
            map: self.map.to_string(),
            x: self.body.pos.x,
            y: self.body.pos.y,
            hp: Some(self.body.hp),
            attributes: self.attributes,
            attribute_points: self.attribute_points,
            base_xp: self.base_xp,
            job_xp: self.job_xp,
            stat_xp: self.stat_xp,
            money: self.money,
            inventory: self.inventory.items().to_vec(),
            equipment: self.equipment.clone(),
            revision: 0,
        }
    }

    /// Derives combat stats from attributes and equipment.
    pub fn recompute_stats(&mut self) {
        let a = &self.attributes;
        self.body.stats = CombatStats {
            atk: a.get(Attribute::Strength) * 2
                + a.get(Attribute::Dexterity) / 2
                + self.equipment.attack_bonus(),
            def: a.get(Attribute::Vitality) + self.equipment.defence_bonus(),
            aspd: a.get(Attribute::Agility) * 2 + a.get(Attribute::Dexterity) / 2,
            max_hp: 100 + a.get(Attribute::Vitality) * 10,
        };
        self.body.hp = self.body.hp.min(self.body.stats.max_hp);
    }

    pub fn increase_attr(&mut self, index: i32) -> Result<(), ActionError> {
        let attr = Attribute::from_index(index).ok_or(ActionError::UnknownAttribute(index))?;
        if self.attribute_points == 0 {
            return Err(ActionError::NoAttributePoints);
        }
        self.attribute_points -= 1;
        self.attributes.raise(attr);
        self.recompute_stats();
        Ok(())
    }

    pub fn equip(&mut self, index: i32) -> Result<(), ActionError> {
        items::equip(&mut self.inventory, &mut self.equipment, index)?;
        self.recompute_stats();
        Ok(())
    }

    pub fn unequip(&mut self, slot: i32) -> Result<(), ActionError> {
        items::unequip(&mut self.inventory, &mut self.equipment, slot)?;
        self.recompute_stats();
        Ok(())
    }

    pub fn refine(&mut self, index: i32) -> Result<(), ActionError> {
        items::refine(&mut self.inventory, index)
    }

    pub fn gain_experience(&mut self, xp: u64) {
        self.base_xp += xp;
        self.job_xp += xp;
        self.stat_xp += xp;
    }
}

#[derive(Debug, Clone)]
pub struct Enemy {
    pub id: EnemyId,
    pub name: String,
    pub level: i32,
    pub spawn: Position,
    pub body: Character,
    pub behaviour: AgentBehaviour,
    // Guard post restored on respawn.
    pub home_target: Option<AgentGoalTarget>,
    pub experience: u64,
    pub money: u64,
    pub drops: Vec<Item>,
    pub alive: bool,
    // Ticks left until respawn, when a respawn policy is active.
    pub respawn_in: Option<u32>,
}

impl Enemy {
    pub fn stats_for_level(level: i32) -> CombatStats {
        CombatStats {
            atk: 10 + level * 3,
            def: level * 2,
            aspd: level * 2,
            max_hp: 40 + level * 30,
        }
    }

    /// Marks the enemy dead and returns its loot as a chest at its position.
    pub fn on_death(&mut self, chest_id: ChestId) -> Chest {
        self.alive = false;
        self.body.stop();
        self.behaviour.target = None;
        Chest::new(chest_id, self.body.pos, self.money, self.drops.clone())
    }

    pub fn respawn(&mut self) {
        self.body.restore_at(self.spawn);
        self.behaviour.reset(self.home_target);
        self.alive = true;
        self.respawn_in = None;
    }
}

#[derive(Debug, Clone)]
pub struct Chest {
    pub id: ChestId,
    pub pos: Position,
    pub money: u64,
    pub items: Vec<Item>,
    opened: bool,
}

impl Chest {
    pub fn new(id: ChestId, pos: Position, money: u64, items: Vec<Item>) -> Self {
        Self {
            id,
            pos,
            money,
            items,
            opened: false,
        }
    }

    pub fn is_opened(&self) -> bool {
        self.opened
    }

    /// Opens the chest once, yielding its contents; later calls yield nothing.
    pub fn open(&mut self) -> Option<(u64, Vec<Item>)> {
        if self.opened {
            return None;
        }
        self.opened = true;
        Some((self.money, std::mem::take(&mut self.items)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub hp: i32,
    pub max_hp: i32,
    pub money: u64,
    pub base_xp: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnemySnapshot {
    pub id: EnemyId,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub hp: i32,
    pub max_hp: i32,
    pub alive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChestSnapshot {
    pub id: ChestId,
    pub x: i32,
    pub y: i32,
    pub money: u64,
    pub item_ids: Vec<String>,
}

impl From<&Player> for PlayerSnapshot {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            x: p.body.pos.x,
            y: p.body.pos.y,
            hp: p.body.hp,
            max_hp: p.body.stats.max_hp,
            money: p.money,
            base_xp: p.base_xp,
        }
    }
}

impl From<&Enemy> for EnemySnapshot {
    fn from(e: &Enemy) -> Self {
        Self {
            id: e.id,
            name: e.name.clone(),
            x: e.body.pos.x,
            y: e.body.pos.y,
            hp: e.body.hp,
            max_hp: e.body.stats.max_hp,
            alive: e.alive,
        }
    }
}

impl From<&Chest> for ChestSnapshot {
    fn from(c: &Chest) -> Self {
        Self {
            id: c.id,
            x: c.pos.x,
            y: c.pos.y,
            money: c.money,
            item_ids: c.items.iter().map(|i| i.id.clone()).collect(),
        }
    }
}
