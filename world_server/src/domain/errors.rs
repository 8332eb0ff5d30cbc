// Domain-level errors for world simulation and session workflows.

use thiserror::Error;

/// Coarse classification of a rejected action, reported back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionErrorKind {
    /// Unknown player, unparseable value or unsupported command.
    Malformed,
    /// The referenced inventory slot or equipment slot cannot take the action.
    InvalidTarget,
}

/// Why a single item of an action batch was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("malformed action: {0}")]
    Malformed(String),
    #[error("No player name found: {0}")]
    UnknownPlayer(String),
    #[error("Bad value: {0}")]
    BadValue(String),
    #[error("No such command: {0}")]
    UnknownCommand(String),
    #[error("No such attribute: {0}")]
    UnknownAttribute(i32),
    #[error("No attribute points left")]
    NoAttributePoints,
    #[error("Item not found: {0}")]
    ItemNotFound(i32),
    #[error("Item not equippable: {0}")]
    NotEquippable(i32),
    #[error("Item cannot be refined: {0}")]
    NotRefinable(i32),
    #[error("Item already at max refine level: {0}")]
    MaxRefine(i32),
    #[error("No such equipment slot: {0}")]
    UnknownSlot(i32),
    #[error("Nothing equipped in slot: {0}")]
    EmptySlot(i32),
    #[error("Inventory is full")]
    InventoryFull,
}

impl ActionError {
    pub fn kind(&self) -> ActionErrorKind {
        match self {
            ActionError::Malformed(_)
            | ActionError::UnknownPlayer(_)
            | ActionError::BadValue(_)
            | ActionError::UnknownCommand(_)
            | ActionError::UnknownAttribute(_)
            | ActionError::UnknownSlot(_) => ActionErrorKind::Malformed,
            ActionError::NoAttributePoints
            | ActionError::ItemNotFound(_)
            | ActionError::NotEquippable(_)
            | ActionError::NotRefinable(_)
            | ActionError::MaxRefine(_)
            | ActionError::EmptySlot(_)
            | ActionError::InventoryFull => ActionErrorKind::InvalidTarget,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("destination ({x}, {y}) is outside the map")]
    OutOfBounds { x: i32, y: i32 },
}

/// Failures reported by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("account not found: {0}")]
    AccountNotFound(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum MapLoadError {
    #[error("failed to read map file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid map definition: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("map has no rows")]
    Empty,
    #[error("map row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("unknown tile '{tile}' in row {row}")]
    UnknownTile { row: usize, tile: char },
    #[error("map of {cols}x{rows} cells is too large")]
    TooLarge { cols: usize, rows: usize },
    #[error("cell size must be positive, got {0}")]
    BadCellSize(i32),
    #[error("unknown item id: {0}")]
    UnknownItem(String),
    #[error("unknown agent type: {0}")]
    UnknownAgent(String),
    #[error("enemy {enemy} guards chest {index}, which does not exist")]
    BadChestRef { enemy: String, index: usize },
    #[error("{what} at ({x}, {y}) lies outside the map")]
    OutOfBounds { what: String, x: i32, y: i32 },
}

/// Faults a tick phase reports without aborting the rest of the tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TickError {
    #[error("player {player_id} is on unknown map {map}")]
    MissingRegion { player_id: u64, map: String },
    #[error("enemy {enemy_id} could not move: {source}")]
    Movement {
        enemy_id: u64,
        #[source]
        source: MoveError,
    },
}
