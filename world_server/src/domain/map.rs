// World maps: pixel positions, grid cells and the walkable cost grid.

use crate::domain::errors::MapLoadError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Pixel-space position of anything placed in the world.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn cell(self, cell_size: i32) -> Cell {
        Cell::new(self.x.div_euclid(cell_size), self.y.div_euclid(cell_size))
    }

    /// Straight-line distance in pixels.
    pub fn distance(self, other: Position) -> f32 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt() as f32
    }
}

/// Discrete grid coordinate (column, row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cell {
    pub col: i32,
    pub row: i32,
}

impl Cell {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    pub fn manhattan(self, other: Cell) -> i32 {
        (self.col - other.col).abs() + (self.row - other.row).abs()
    }

    pub fn center(self, cell_size: i32) -> Position {
        Position::new(
            self.col * cell_size + cell_size / 2,
            self.row * cell_size + cell_size / 2,
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Node {
    pub walkable: bool,
    // Estimated cost to the current destination, refreshed before each path query.
    pub heuristic: i32,
}

#[derive(Debug, Clone)]
pub struct Grid {
    cols: i32,
    rows: i32,
    nodes: Vec<Node>,
}

impl Grid {
    pub const MAX_CELLS: usize = 1 << 22;

    /// Fully walkable grid of `cols` by `rows` cells.
    pub fn try_open(cols: i32, rows: i32) -> Result<Self, MapLoadError> {
        if cols <= 0 || rows <= 0 {
            return Err(MapLoadError::Empty);
        }
        let too_large = || MapLoadError::TooLarge {
            cols: cols as usize,
            rows: rows as usize,
        };
        let cells = usize::try_from(cols)
            .ok()
            .zip(usize::try_from(rows).ok())
            .and_then(|(c, r)| c.checked_mul(r))
            .filter(|&cells| cells <= Self::MAX_CELLS)
            .ok_or_else(too_large)?;
        Ok(Self {
            cols,
            rows,
            nodes: vec![
                Node {
                    walkable: true,
                    heuristic: 0,
                };
                cells
            ],
        })
    }

    #[cfg(test)]
    pub fn open(cols: i32, rows: i32) -> Self {
        Self::try_open(cols, rows).expect("test grid size")
    }

    /// Parses text rows where `.` is walkable and `#` is blocked.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, MapLoadError> {
        let Some(first) = rows.first() else {
            return Err(MapLoadError::Empty);
        };
        let expected = first.as_ref().chars().count();
        if expected == 0 {
            return Err(MapLoadError::Empty);
        }

        let too_large = || MapLoadError::TooLarge {
            cols: expected,
            rows: rows.len(),
        };
        let cols = i32::try_from(expected).map_err(|_| too_large())?;
        let height = i32::try_from(rows.len()).map_err(|_| too_large())?;
        let mut grid = Grid::try_open(cols, height)?;
        for (row, line) in rows.iter().enumerate() {
            let line = line.as_ref();
            let found = line.chars().count();
            if found != expected {
                return Err(MapLoadError::RaggedRow {
                    row,
                    found,
                    expected,
                });
            }
            for (col, tile) in line.chars().enumerate() {
                let walkable = match tile {
                    '.' => true,
                    '#' => false,
                    other => return Err(MapLoadError::UnknownTile { row, tile: other }),
                };
                grid.set_walkable(Cell::new(col as i32, row as i32), walkable);
            }
        }
        Ok(grid)
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn contains(&self, cell: Cell) -> bool {
        (0..self.cols).contains(&cell.col) && (0..self.rows).contains(&cell.row)
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        self.contains(cell)
            .then(|| (cell.row * self.cols + cell.col) as usize)
    }

    pub fn node(&self, cell: Cell) -> Option<&Node> {
        self.index(cell).map(|idx| &self.nodes[idx])
    }

    pub fn is_walkable(&self, cell: Cell) -> bool {
        self.node(cell).is_some_and(|n| n.walkable)
    }

    pub fn set_walkable(&mut self, cell: Cell, walkable: bool) {
        if let Some(idx) = self.index(cell) {
            self.nodes[idx].walkable = walkable;
        }
    }

    pub fn heuristic(&self, cell: Cell) -> i32 {
        self.node(cell).map_or(i32::MAX, |n| n.heuristic)
    }

    /// Refreshes every node's heuristic as the Manhattan distance to `goal`.
    pub fn recompute_heuristic(&mut self, goal: Cell) {
        let cols = self.cols;
        for (idx, node) in self.nodes.iter_mut().enumerate() {
            let cell = Cell::new(idx as i32 % cols, idx as i32 / cols);
            node.heuristic = cell.manhattan(goal);
        }
    }

    /// In-bounds 4-way neighbours.
    pub fn neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        [(1, 0), (-1, 0), (0, 1), (0, -1)]
            .into_iter()
            .map(move |(dc, dr)| Cell::new(cell.col + dc, cell.row + dr))
            .filter(|c| self.contains(*c))
    }
}

#[derive(Debug, Clone)]
pub struct GameMap {
    pub name: Arc<str>,
    // Pixel dimensions; always `grid.cols() * cell_size` by `grid.rows() * cell_size`.
    pub width: i32,
    pub height: i32,
    pub cell_size: i32,
    pub grid: Grid,
    pub spawn: Position,
}

impl GameMap {
    pub fn new(name: impl Into<Arc<str>>, grid: Grid, cell_size: i32, spawn: Position) -> Self {
        Self {
            name: name.into(),
            width: grid.cols() * cell_size,
            height: grid.rows() * cell_size,
            cell_size,
            grid,
            spawn,
        }
    }

    pub fn contains(&self, pos: Position) -> bool {
        (0..self.width).contains(&pos.x) && (0..self.height).contains(&pos.y)
    }

    pub fn clamp(&self, pos: Position) -> Position {
        Position::new(
            pos.x.clamp(0, (self.width - 1).max(0)),
            pos.y.clamp(0, (self.height - 1).max(0)),
        )
    }

    pub fn cell_of(&self, pos: Position) -> Cell {
        pos.cell(self.cell_size)
    }

    pub fn center_of(&self, cell: Cell) -> Position {
        cell.center(self.cell_size)
    }
}
