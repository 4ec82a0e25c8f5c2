/// Enemy patrol AI.
///
/// Enemies walk back and forth along a ledge. Each tick an enemy looks one
/// tile ahead of its leading edge:
///   - a wall at body height, or
///   - open air under its feet, or
///   - the level having ended
/// puts it into `Waiting`. When the wait runs out it turns around and walks
/// again. Nothing else changes its direction.

use crate::config::PatrolConfig;

use super::entity::{Enemy, Patrol, ACTOR_W};
use super::grid::{tile_col, tile_row, TileGrid};
use super::tile::TileCollision;

/// Would a walking enemy run into a wall or off a ledge?
pub fn blocked_ahead(enemy: &Enemy, grid: &TileGrid) -> bool {
    let dir = enemy.facing.sign() as i32;
    let lead_x = enemy.position.x + (ACTOR_W / 2.0) * dir as f32;
    let ahead = tile_col(lead_x);
    let feet = tile_row(enemy.position.y);

    grid.collision_at(ahead, feet - 1) == TileCollision::Impassable
        || grid.collision_at(ahead, feet) == TileCollision::Passable
}

/// Advance one enemy by `dt` seconds. Returns true if it turned around.
///
/// `level_ended` is true once the player died or reached the exit; enemies
/// then stop walking and never turn.
pub fn tick_enemy(enemy: &mut Enemy, grid: &TileGrid, level_ended: bool, dt: f32, cfg: &PatrolConfig) -> bool {
    match enemy.patrol {
        Patrol::Waiting(remaining) => {
            let left = (remaining - dt).max(0.0);
            if left > 0.0 {
                enemy.patrol = Patrol::Waiting(left);
                return false;
            }
            enemy.patrol = Patrol::Walking;
            if level_ended {
                return false;
            }
            enemy.facing = enemy.facing.flipped();
            true
        }
        Patrol::Walking => {
            if level_ended || blocked_ahead(enemy, grid) {
                enemy.patrol = Patrol::Waiting(cfg.wait_secs);
            } else {
                enemy.position.x += enemy.facing.sign() * cfg.speed * dt;
            }
            false
        }
    }
}
