// Grid pathfinding used by the movement controller.

use crate::domain::map::{Cell, Grid};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Finds an ordered list of cells from `start` (exclusive) to `goal` (inclusive).
///
/// An empty result means no path, including the case where `start == goal`.
pub trait Pathfinder: Send + Sync {
    fn find_path(&self, grid: &Grid, start: Cell, goal: Cell, busy: &[Cell]) -> Vec<Cell>;
}

/// A* over 4-way moves with unit step cost, using the heuristic stored in the grid.
#[derive(Debug, Clone, Copy)]
pub struct AStar {
    pub max_expansions: usize,
}

impl Default for AStar {
    fn default() -> Self {
        Self {
            max_expansions: 4096,
        }
    }
}

impl Pathfinder for AStar {
    fn find_path(&self, grid: &Grid, start: Cell, goal: Cell, busy: &[Cell]) -> Vec<Cell> {
        if start == goal || !grid.contains(start) || !grid.is_walkable(goal) {
            return Vec::new();
        }

        // The goal stays enterable even when occupied; only cells on the way are avoided.
        let busy: HashSet<Cell> = busy.iter().copied().filter(|c| *c != goal).collect();

        let mut open = BinaryHeap::<Reverse<(i32, i32, Cell)>>::new();
        let mut g_scores = HashMap::<Cell, i32>::new();
        let mut came_from = HashMap::<Cell, Cell>::new();

        g_scores.insert(start, 0);
        open.push(Reverse((grid.heuristic(start), 0, start)));

        let mut expanded = 0usize;
        while let Some(Reverse((_f, g_cost, cell))) = open.pop() {
            if g_cost > g_scores.get(&cell).copied().unwrap_or(i32::MAX) {
                continue;
            }
            if cell == goal {
                return reconstruct(start, goal, &came_from);
            }

            expanded += 1;
            if expanded > self.max_expansions {
                break;
            }

            for next in grid.neighbors(cell) {
                if !grid.is_walkable(next) || busy.contains(&next) {
                    continue;
                }
                let tentative = g_cost.saturating_add(1);
                if tentative >= g_scores.get(&next).copied().unwrap_or(i32::MAX) {
                    continue;
                }
                came_from.insert(next, cell);
                g_scores.insert(next, tentative);
                open.push(Reverse((
                    tentative.saturating_add(grid.heuristic(next)),
                    tentative,
                    next,
                )));
            }
        }

        Vec::new()
    }
}

fn reconstruct(start: Cell, goal: Cell, came_from: &HashMap<Cell, Cell>) -> Vec<Cell> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(prev) = came_from.get(&current).copied() {
        if prev == start {
            path.reverse();
            return path;
        }
        path.push(prev);
        current = prev;
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planned(grid: &mut Grid, start: Cell, goal: Cell, busy: &[Cell]) -> Vec<Cell> {
        grid.recompute_heuristic(goal);
        AStar::default().find_path(grid, start, goal, busy)
    }

    #[test]
    fn when_start_equals_goal_then_path_is_empty() {
        let mut grid = Grid::open(5, 5);
        assert!(planned(&mut grid, Cell::new(2, 2), Cell::new(2, 2), &[]).is_empty());
    }

    #[test]
    fn when_grid_is_open_then_path_is_shortest_and_excludes_start() {
        let mut grid = Grid::open(5, 5);
        let path = planned(&mut grid, Cell::new(0, 0), Cell::new(3, 0), &[]);
        assert_eq!(path, vec![Cell::new(1, 0), Cell::new(2, 0), Cell::new(3, 0)]);
    }

    #[test]
    fn when_wall_blocks_direct_route_then_path_goes_around() {
        let mut grid = Grid::from_rows(&["..#..", "..#..", "....."]).expect("grid");
        let path = planned(&mut grid, Cell::new(0, 0), Cell::new(4, 0), &[]);
        assert_eq!(path.last(), Some(&Cell::new(4, 0)));
        assert!(path.iter().all(|c| grid.is_walkable(*c)));
        assert!(path.contains(&Cell::new(2, 2)));
    }

    #[test]
    fn when_cells_are_busy_then_path_avoids_them_but_goal_stays_reachable() {
        let mut grid = Grid::open(3, 3);
        let busy = [Cell::new(1, 0), Cell::new(2, 0)];
        let path = planned(&mut grid, Cell::new(0, 0), Cell::new(2, 0), &busy);
        assert_eq!(path.last(), Some(&Cell::new(2, 0)));
        assert!(!path.contains(&Cell::new(1, 0)));
    }

    #[test]
    fn when_goal_is_walled_off_then_path_is_empty() {
        let mut grid = Grid::from_rows(&["..#.", "..#.", "..#."]).expect("grid");
        assert!(planned(&mut grid, Cell::new(0, 0), Cell::new(3, 1), &[]).is_empty());
    }

    #[test]
    fn when_goal_is_not_walkable_then_path_is_empty() {
        let mut grid = Grid::from_rows(&["..#"]).expect("grid");
        assert!(planned(&mut grid, Cell::new(0, 0), Cell::new(2, 0), &[]).is_empty());
    }
}
