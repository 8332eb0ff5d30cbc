// TOML map definitions: geometry plus the initial chest and enemy population.

use crate::domain::ai::{AgentBehaviour, AgentGoalTarget, AgentType};
use crate::domain::errors::MapLoadError;
use crate::domain::items::{Item, catalog_item};
use crate::domain::map::{GameMap, Grid, Position};
use crate::domain::ports::MapLoader;
use crate::domain::state::{Character, Chest, Enemy};
use crate::domain::world::LoadedMap;
use serde::Deserialize;
use std::path::PathBuf;

/// Map bundled into the binary, used when no map files are configured.
pub const DEFAULT_MAP: &str = include_str!("../../maps/default.toml");

#[derive(Debug, Deserialize)]
struct MapFile {
    name: String,
    cell_size: i32,
    spawn: PointDef,
    // Either explicit tiles ('.' open, '#' wall) or the size of an open field.
    #[serde(default)]
    tiles: Vec<String>,
    #[serde(default)]
    cols: i32,
    #[serde(default)]
    rows: i32,
    #[serde(default)]
    chests: Vec<ChestDef>,
    #[serde(default)]
    enemies: Vec<EnemyDef>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct PointDef {
    x: i32,
    y: i32,
}

#[derive(Debug, Deserialize)]
struct ChestDef {
    x: i32,
    y: i32,
    #[serde(default)]
    money: u64,
    #[serde(default)]
    items: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EnemyDef {
    name: String,
    agent: String,
    level: i32,
    x: i32,
    y: i32,
    // Index into this file's chests; guards patrol it.
    guards: Option<usize>,
    experience: Option<u64>,
    money: Option<u64>,
    drops: Option<Vec<String>>,
}

/// Parses one map definition. Ids are local to the file; the world renumbers them.
pub fn parse_map(source: &str) -> Result<LoadedMap, MapLoadError> {
    let file: MapFile = toml::from_str(source)?;
    if file.cell_size <= 0 {
        return Err(MapLoadError::BadCellSize(file.cell_size));
    }

    let grid = if file.tiles.is_empty() {
        Grid::try_open(file.cols, file.rows)?
    } else {
        Grid::from_rows(&file.tiles)?
    };
    // Pixel extents must fit the i32 coordinate space too.
    if grid.cols().checked_mul(file.cell_size).is_none()
        || grid.rows().checked_mul(file.cell_size).is_none()
    {
        return Err(MapLoadError::TooLarge {
            cols: grid.cols() as usize,
            rows: grid.rows() as usize,
        });
    }

    let spawn = Position::new(file.spawn.x, file.spawn.y);
    let map = GameMap::new(file.name, grid, file.cell_size, spawn);
    check_inside(&map, "spawn", spawn)?;

    let mut chests = Vec::with_capacity(file.chests.len());
    for (index, def) in file.chests.iter().enumerate() {
        let pos = Position::new(def.x, def.y);
        check_inside(&map, "chest", pos)?;
        chests.push(Chest::new(index as u64 + 1, pos, def.money, items(&def.items)?));
    }

    let mut enemies = Vec::with_capacity(file.enemies.len());
    for (index, def) in file.enemies.iter().enumerate() {
        let agent_type: AgentType = def
            .agent
            .parse()
            .map_err(MapLoadError::UnknownAgent)?;
        let pos = Position::new(def.x, def.y);
        check_inside(&map, "enemy", pos)?;

        let home_target = match def.guards {
            Some(chest_index) => {
                let chest = chests.get(chest_index).ok_or_else(|| MapLoadError::BadChestRef {
                    enemy: def.name.clone(),
                    index: chest_index,
                })?;
                Some(AgentGoalTarget::Point(chest.pos))
            }
            None => None,
        };
        let drops = match &def.drops {
            Some(ids) => items(ids)?,
            None => items(&["7001".to_string()])?,
        };

        enemies.push(Enemy {
            id: index as u64 + 1,
            name: def.name.clone(),
            level: def.level,
            spawn: pos,
            body: Character::new(pos, Enemy::stats_for_level(def.level)),
            behaviour: AgentBehaviour::new(agent_type, home_target),
            home_target,
            // Rewards scale with level unless the file says otherwise.
            experience: def.experience.unwrap_or(level_scaled(def.level, 10)),
            money: def.money.unwrap_or(level_scaled(def.level, 60)),
            drops,
            alive: true,
            respawn_in: None,
        });
    }

    Ok(LoadedMap {
        map,
        chests,
        enemies,
    })
}

fn level_scaled(level: i32, per_level: u64) -> u64 {
    level.max(1).unsigned_abs() as u64 * per_level
}

fn items(ids: &[String]) -> Result<Vec<Item>, MapLoadError> {
    ids.iter()
        .map(|id| catalog_item(id).ok_or_else(|| MapLoadError::UnknownItem(id.clone())))
        .collect()
}

fn check_inside(map: &GameMap, what: &str, pos: Position) -> Result<(), MapLoadError> {
    if map.contains(pos) {
        Ok(())
    } else {
        Err(MapLoadError::OutOfBounds {
            what: what.to_string(),
            x: pos.x,
            y: pos.y,
        })
    }
}

/// Loads maps by id: `default` is the bundled map, anything else is a TOML file path.
#[derive(Debug, Clone, Default)]
pub struct TomlMapLoader {
    root: Option<PathBuf>,
}

impl TomlMapLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves relative map paths against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

impl MapLoader for TomlMapLoader {
    fn load_map(&self, map_id: &str) -> Result<LoadedMap, MapLoadError> {
        if map_id == "default" {
            return parse_map(DEFAULT_MAP);
        }
        let path = match &self.root {
            Some(root) => root.join(map_id),
            None => PathBuf::from(map_id),
        };
        let source = std::fs::read_to_string(&path).map_err(|source| MapLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        parse_map(&source)
    }
}
