/// Player physics: integration, jump curve, and tile collision resolution.
///
/// ## Collision model
///
/// The player's bounds are tested against every tile they overlap. Each
/// colliding tile pushes the player out along the shallow axis:
///   - Impassable tiles block from every side.
///   - Platform tiles only resolve vertically, and only when the player's
///     bottom on the previous tick was at or above the tile's top.
///   - Ties between the axes resolve vertically.
///
/// Bounds are recomputed after every push, so later tiles in the scan
/// see the corrected position.

use crate::config::PhysicsConfig;

use super::entity::Player;
use super::geometry::{TILE_H, TILE_W};
use super::grid::TileGrid;
use super::tile::TileCollision;

/// Jump override for the current ascent time.
///
/// Returns `None` once the ascent is over (or not started), leaving
/// gravity in control.
pub fn jump_velocity(jump_time: f32, cfg: &PhysicsConfig) -> Option<f32> {
    if jump_time > 0.0 && jump_time <= cfg.max_jump_time {
        let t = jump_time / cfg.max_jump_time;
        Some(cfg.jump_launch_velocity * (1.0 - t.powf(cfg.jump_control_power)))
    } else {
        None
    }
}

/// Apply jump input to the vertical velocity.
///
/// Returns the new vertical velocity and whether a jump began this tick.
pub fn do_jump(player: &mut Player, jump_held: bool, velocity_y: f32, dt: f32, cfg: &PhysicsConfig) -> (f32, bool) {
    let mut vy = velocity_y;
    let mut started = false;

    if jump_held {
        if (!player.was_jumping && player.on_ground) || player.jump_time > 0.0 {
            started = player.jump_time == 0.0;
            player.jump_time += dt;
        }

        match jump_velocity(player.jump_time, cfg) {
            Some(v) => vy = v,
            None => player.jump_time = 0.0,
        }
    } else {
        player.jump_time = 0.0;
    }

    player.was_jumping = jump_held;
    player.is_jumping = player.jump_time > 0.0;
    (vy, started)
}

/// Advance the player by one tick. Returns true if a jump started.
///
/// Does nothing for a dead player or one standing in the exit.
pub fn apply_physics(player: &mut Player, grid: &TileGrid, jump_held: bool, dt: f32, cfg: &PhysicsConfig) -> bool {
    if !player.alive || player.reached_exit {
        return false;
    }

    let previous = player.position;

    player.velocity.x += player.direction * cfg.move_acceleration * dt;
    player.velocity.y = (player.velocity.y + cfg.gravity * dt)
        .clamp(-cfg.max_fall_speed, cfg.max_fall_speed);

    let (vy, started) = do_jump(player, jump_held, player.velocity.y, dt, cfg);
    player.velocity.y = vy;

    let drag = if player.on_ground { cfg.ground_drag } else { cfg.air_drag };
    player.velocity.x = (player.velocity.x * drag).clamp(-cfg.max_move_speed, cfg.max_move_speed);

    player.position.x = (player.position.x + player.velocity.x * dt).round();
    player.position.y = (player.position.y + player.velocity.y * dt).round();

    resolve_tile_collisions(player, grid);

    // Collision absorbed the motion on this axis.
    if player.position.x == previous.x {
        player.velocity.x = 0.0;
    }
    if player.position.y == previous.y {
        player.velocity.y = 0.0;
    }

    started
}

/// Push the player out of every solid tile it overlaps and update `on_ground`.
pub fn resolve_tile_collisions(player: &mut Player, grid: &TileGrid) {
    let mut bounds = player.bounds();
    let left = (bounds.left / TILE_W).floor() as i32;
    let right = (bounds.right() / TILE_W).ceil() as i32 - 1;
    let top = (bounds.top / TILE_H).floor() as i32;
    let bottom = (bounds.bottom() / TILE_H).ceil() as i32 - 1;

    player.on_ground = false;

    for y in top..=bottom {
        for x in left..=right {
            let collision = grid.collision_at(x, y);
            if collision == TileCollision::Passable {
                continue;
            }

            let tile = TileGrid::tile_bounds(x, y);
            let depth = bounds.intersection_depth(&tile);
            if depth.x == 0.0 || depth.y == 0.0 {
                continue;
            }

            let vertical = depth.y.abs() <= depth.x.abs() || collision == TileCollision::Platform;
            if vertical {
                let from_above = player.previous_bottom <= tile.top;
                if from_above {
                    player.on_ground = true;
                }
                if collision == TileCollision::Impassable || from_above {
                    player.position.y += depth.y;
                    bounds = player.bounds();
                }
            } else if collision == TileCollision::Impassable {
                player.position.x += depth.x;
                bounds = player.bounds();
            }
        }
    }

    player.previous_bottom = bounds.bottom();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::Vec2;
    use crate::domain::tile::Tile;

    const DT: f32 = 0.017;

    fn grid_from(rows: &[&str]) -> TileGrid {
        let h = rows.len();
        let w = rows[0].len();
        let mut g = TileGrid::new(w, h);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let collision = match ch {
                    '#' => TileCollision::Impassable,
                    '-' => TileCollision::Platform,
                    _ => TileCollision::Passable,
                };
                g.set(x, y, Tile::new(collision, None));
            }
        }
        g
    }

    fn player_at(x: f32, y: f32) -> Player {
        Player::new(Vec2::new(x, y))
    }

    /// No impassable tile overlaps the player's bounds.
    fn assert_clear(p: &Player, g: &TileGrid) {
        let b = p.bounds();
        for ty in 0..g.height() as i32 {
            for tx in 0..g.width() as i32 {
                if g.collision_at(tx, ty) == TileCollision::Impassable {
                    assert!(
                        !b.intersects(&TileGrid::tile_bounds(tx, ty)),
                        "player {:?} penetrates tile ({tx},{ty})", b,
                    );
                }
            }
        }
    }

    // ── Jump curve ──

    #[test]
    fn jump_velocity_none_outside_ascent() {
        let cfg = PhysicsConfig::default();
        assert_eq!(jump_velocity(0.0, &cfg), None);
        assert_eq!(jump_velocity(cfg.max_jump_time + 0.001, &cfg), None);
    }

    #[test]
    fn jump_override_weakens_monotonically() {
        let cfg = PhysicsConfig::default();
        let mut last = f32::INFINITY;
        let mut t = DT;
        while t <= cfg.max_jump_time {
            let v = jump_velocity(t, &cfg).unwrap();
            assert!(v < 0.0);
            assert!(v.abs() < last, "override grew at t={t}");
            last = v.abs();
            t += DT;
        }
    }

    #[test]
    fn jump_reaches_zero_at_cap() {
        let cfg = PhysicsConfig::default();
        let v = jump_velocity(cfg.max_jump_time, &cfg).unwrap();
        assert!(v.abs() < 1e-3);
    }

    #[test]
    fn jump_needs_ground_to_start() {
        let cfg = PhysicsConfig::default();
        let mut p = player_at(64.0, 64.0);
        p.on_ground = false;
        let (vy, started) = do_jump(&mut p, true, 10.0, DT, &cfg);
        assert!(!started);
        assert_eq!(vy, 10.0);
        assert_eq!(p.jump_time, 0.0);
    }

    #[test]
    fn holding_jump_does_not_rejump_after_apex() {
        let cfg = PhysicsConfig::default();
        let mut p = player_at(64.0, 64.0);
        p.on_ground = true;
        let (_, started) = do_jump(&mut p, true, 0.0, DT, &cfg);
        assert!(started);
        // Ride past the apex while still holding
        for _ in 0..30 {
            do_jump(&mut p, true, 0.0, DT, &cfg);
        }
        assert_eq!(p.jump_time, 0.0);
        p.on_ground = true;
        let (_, again) = do_jump(&mut p, true, 0.0, DT, &cfg);
        assert!(!again);
    }

    #[test]
    fn releasing_jump_cancels_ascent() {
        let cfg = PhysicsConfig::default();
        let mut p = player_at(64.0, 64.0);
        p.on_ground = true;
        do_jump(&mut p, true, 0.0, DT, &cfg);
        let (vy, _) = do_jump(&mut p, false, 42.0, DT, &cfg);
        assert_eq!(vy, 42.0);
        assert_eq!(p.jump_time, 0.0);
    }

    // ── Collision ──

    #[test]
    fn player_lands_on_floor() {
        let g = grid_from(&[
            "......",
            "......",
            "......",
            "......",
            "......",
            "######",
        ]);
        let cfg = PhysicsConfig::default();
        let mut p = player_at(96.0, 100.0);
        for _ in 0..60 {
            apply_physics(&mut p, &g, false, DT, &cfg);
            assert_clear(&p, &g);
        }
        assert!(p.on_ground);
        assert_eq!(p.position.y, 160.0);
        assert_eq!(p.velocity.y, 0.0);
    }

    #[test]
    fn wall_blocks_walking() {
        let g = grid_from(&[
            "......",
            ".....#",
            ".....#",
            ".....#",
            ".....#",
            "######",
        ]);
        let cfg = PhysicsConfig::default();
        let mut p = player_at(64.0, 160.0);
        p.direction = 1.0;
        for _ in 0..60 {
            apply_physics(&mut p, &g, false, DT, &cfg);
            assert_clear(&p, &g);
        }
        assert_eq!(p.bounds().right(), 160.0);
        assert_eq!(p.velocity.x, 0.0);
    }

    #[test]
    fn ceiling_stops_ascent() {
        let g = grid_from(&[
            "######",
            "......",
            "......",
            "......",
            "......",
            "######",
        ]);
        let cfg = PhysicsConfig::default();
        let mut p = player_at(96.0, 160.0);
        p.on_ground = true;
        for _ in 0..20 {
            apply_physics(&mut p, &g, true, DT, &cfg);
            assert_clear(&p, &g);
        }
        assert!(p.bounds().top >= 32.0);
    }

    #[test]
    fn platform_lands_from_above() {
        let g = grid_from(&[
            "......",
            "......",
            "......",
            "......",
            "------",
            "......",
        ]);
        let cfg = PhysicsConfig::default();
        let mut p = player_at(96.0, 100.0);
        for _ in 0..60 {
            apply_physics(&mut p, &g, false, DT, &cfg);
        }
        assert!(p.on_ground);
        assert_eq!(p.position.y, 128.0);
    }

    #[test]
    fn platform_passes_upward_motion() {
        let g = grid_from(&[
            "......",
            "......",
            "......",
            "------",
            "......",
            "......",
            "......",
        ]);
        // Head already inside the platform row, feet below it
        let mut p = player_at(96.0, 200.0);
        p.previous_bottom = 210.0;
        p.position.y = 200.0;
        resolve_tile_collisions(&mut p, &g);
        assert_eq!(p.position.y, 200.0);
        assert!(!p.on_ground);
    }

    #[test]
    fn platform_never_blocks_sideways() {
        let g = grid_from(&[
            "......",
            "......",
            "......",
            "...-..",
            "......",
            "######",
        ]);
        let cfg = PhysicsConfig::default();
        let mut p = player_at(32.0, 160.0);
        p.direction = 1.0;
        let start_x = p.position.x;
        for _ in 0..20 {
            apply_physics(&mut p, &g, false, DT, &cfg);
        }
        assert!(p.position.x > start_x + 64.0);
    }

    #[test]
    fn outside_side_edges_are_walls() {
        let g = grid_from(&[
            "....",
            "....",
            "....",
            "....",
            "####",
        ]);
        let cfg = PhysicsConfig::default();
        let mut p = player_at(40.0, 128.0);
        p.previous_bottom = 128.0;
        p.direction = -1.0;
        for _ in 0..30 {
            apply_physics(&mut p, &g, false, DT, &cfg);
        }
        assert_eq!(p.bounds().left, 0.0);
    }

    #[test]
    fn random_drops_never_penetrate() {
        let g = grid_from(&[
            "..........",
            "..........",
            "..........",
            "..........",
            "..--..#...",
            "......#...",
            "##########",
        ]);
        let cfg = PhysicsConfig::default();
        let mut seed: u32 = 7;
        for _ in 0..40 {
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            let x = 40.0 + (seed >> 16) as f32 % 240.0;
            let mut p = player_at(x.round(), 96.0);
            p.direction = if seed & 1 == 0 { 1.0 } else { -1.0 };
            for i in 0..90 {
                let jump = i % 25 < 10;
                apply_physics(&mut p, &g, jump, DT, &cfg);
                assert_clear(&p, &g);
            }
        }
    }

    #[test]
    fn dead_player_is_frozen() {
        let g = grid_from(&["....", "####"]);
        let cfg = PhysicsConfig::default();
        let mut p = player_at(64.0, 0.0);
        p.alive = false;
        apply_physics(&mut p, &g, false, DT, &cfg);
        assert_eq!(p.position, Vec2::new(64.0, 0.0));
    }
}
