use crate::domain::errors::MoveError;
use crate::domain::map::{Cell, GameMap, Position};
use crate::domain::pathfinding::Pathfinder;
use crate::domain::state::Character;

/// Clamps requested velocity to at most `step` pixels per axis.
pub fn clamp_velocity(x_speed: i32, y_speed: i32, step: i32) -> (i32, i32) {
    (x_speed.clamp(-step, step), y_speed.clamp(-step, step))
}

fn step_toward(from: i32, to: i32, step: i32) -> i32 {
    (to - from).clamp(-step, step)
}

/// Plans this tick's velocity toward `destination`.
///
/// Re-plans from scratch every call and takes only the first step of the path. Reaching the
/// destination cell yields an empty path and zero velocity.
pub fn plan_step(
    body: &mut Character,
    map: &mut GameMap,
    destination: Position,
    busy: &[Cell],
    pathfinder: &dyn Pathfinder,
    step: i32,
) -> Result<(), MoveError> {
    if !map.contains(destination) {
        return Err(MoveError::OutOfBounds {
            x: destination.x,
            y: destination.y,
        });
    }

    let start = map.cell_of(body.pos);
    let goal = map.cell_of(destination);
    map.grid.recompute_heuristic(goal);

    let path = pathfinder.find_path(&map.grid, start, goal, busy);
    let Some(next) = path.first() else {
        body.stop();
        return Ok(());
    };

    let target = map.center_of(*next);
    body.x_speed = step_toward(body.pos.x, target.x, step);
    body.y_speed = step_toward(body.pos.y, target.y, step);
    Ok(())
}

/// Applies one position update and zeroes velocity.
///
/// The result is clamped to the map; a step into an unwalkable cell is dropped.
/// Returns whether the character moved.
pub fn commit(body: &mut Character, map: &GameMap) -> bool {
    if !body.has_velocity() {
        return false;
    }
    let next = map.clamp(Position::new(
        body.pos.x + body.x_speed,
        body.pos.y + body.y_speed,
    ));
    body.stop();

    if next == body.pos || !map.grid.is_walkable(map.cell_of(next)) {
        return false;
    }
    body.pos = next;
    true
}
