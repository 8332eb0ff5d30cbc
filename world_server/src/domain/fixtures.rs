// Builders shared by domain unit tests.

use crate::domain::ai::{AgentBehaviour, AgentGoalTarget, AgentType};
use crate::domain::items::catalog_item;
use crate::domain::map::{GameMap, Grid, Position};
use crate::domain::state::{Character, Chest, Enemy, Player, PlayerRecord};
use std::net::SocketAddr;
use std::sync::Arc;

pub(crate) fn open_map(cols: i32, rows: i32) -> GameMap {
    GameMap::new("test", Grid::open(cols, rows), 40, Position::new(20, 20))
}

pub(crate) fn enemy(agent_type: AgentType, pos: Position) -> Enemy {
    Enemy {
        id: 1,
        name: "Orc".to_string(),
        level: 5,
        spawn: pos,
        body: Character::new(pos, Enemy::stats_for_level(5)),
        behaviour: AgentBehaviour::new(agent_type, None),
        home_target: None,
        experience: 50,
        money: 300,
        drops: vec![catalog_item("7001").expect("jellopy")],
        alive: true,
        respawn_in: None,
    }
}

pub(crate) fn guard(pos: Position, post: Position) -> Enemy {
    let mut guard = enemy(AgentType::Guard, pos);
    guard.home_target = Some(AgentGoalTarget::Point(post));
    guard.behaviour.target = guard.home_target;
    guard
}

pub(crate) fn player(id: u64, name: &str, pos: Position) -> Player {
    let record = PlayerRecord::new_character(name, "test", pos);
    Player::from_record(
        id,
        SocketAddr::from(([127, 0, 0, 1], 40000 + id as u16)),
        Arc::from("test"),
        record,
    )
}

pub(crate) fn chest(id: u64, pos: Position, money: u64, item_ids: &[&str]) -> Chest {
    let items = item_ids
        .iter()
        .map(|id| catalog_item(id).expect("catalog item"))
        .collect();
    Chest::new(id, pos, money, items)
}
