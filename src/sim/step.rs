/// The step function: advances the world by one tick.
///
/// Processing order:
///   1. Input actions (skin change, fire)
///   2. Player physics
///   3. Bullets (enemy hits, then flight and tile checks)
///   4. Level clock, in real time, until the exit is reached
///   5. Level body, only while the player is alive and time remains:
///        - exit reached: drain leftover time into score
///        - otherwise: gems, fall death, enemies, exit check
///   6. Timer clamp
///   7. Checkpoints
///
/// Once the player is dead the world is frozen apart from the clock. When
/// the timer hits zero everything stops until `continue_game` respawns,
/// retries, or advances.

use crate::domain::ai;
use crate::domain::entity::{Bullet, BulletKind, Facing, FrameInput, SKIN_COUNT};
use crate::domain::geometry::TILE_W;
use crate::domain::grid::{tile_col, tile_row, TileGrid};
use crate::domain::physics;
use crate::domain::tile::TileCollision;
use super::event::GameEvent;
use super::level::{self, LevelSource};
use super::world::{Phase, Status, WorldState};

/// Bullets allowed in flight at once.
pub const MAX_BULLETS: usize = 2;
/// How far a bullet may get from the player before it is spent.
pub const BULLET_RANGE: f32 = 512.0;
/// Bullet range is measured from at least this x, so shots fired near the
/// left edge of the level still cross the first screen.
const RANGE_MIN_ANCHOR_X: f32 = 480.0;
/// Leftover seconds drained into score per second of real time.
const EXIT_DRAIN_RATE: f32 = 200.0;

const GEM_BOUNCE_HEIGHT: f32 = 0.18;
const GEM_BOUNCE_RATE: f32 = 3.0;
const GEM_BOUNCE_SPREAD: f32 = 0.75;

const MESSAGE_TICKS: u32 = 80;

/// What the continue key does in the current state.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ContinueAction {
    Respawn,
    NextLevel,
    RetryLevel,
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

/// Advance the level by one tick.
///
/// `dt` is the fixed physics step. `elapsed` is the real time since the
/// previous tick and drives the level clock, which keeps running while the
/// player is dead and stops once the exit is reached or time is up.
pub fn step(world: &mut WorldState, input: FrameInput, dt: f32, elapsed: f32) -> Vec<GameEvent> {
    if world.phase != Phase::Playing || world.paused { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;

    if world.message_timer > 0 {
        world.message_timer -= 1;
        if world.message_timer == 0 { world.message.clear(); }
    }

    let time_was_up = world.time_is_up();

    if input.change_skin { change_skin(world, &mut events); }
    if input.fire {
        if let Some(ev) = try_fire(world) { events.push(ev); }
    }

    resolve_player(world, input, dt, &mut events);
    resolve_bullets(world, &mut events);

    if !world.reached_exit && !world.time_is_up() {
        world.clock += elapsed;
        world.time_remaining = world.timing.time_limit_secs - world.clock;
    }

    if !world.player.alive || world.time_is_up() {
        // frozen
    } else if world.reached_exit {
        drain_time_bonus(world, dt);
    } else {
        resolve_gems(world, &mut events);
        resolve_fall(world, &mut events);
        resolve_enemies(world, dt, &mut events);
        resolve_exit(world, &mut events);
    }

    if world.time_remaining < 0.0 { world.time_remaining = 0.0; }

    resolve_checkpoints(world, &mut events);

    if !time_was_up && world.time_is_up() {
        let won = world.reached_exit;
        tracing::info!(won, score = world.score, "time up");
        events.push(GameEvent::TimeUp { won });
    }

    events
}

/// Fire a bullet if the player may shoot.
///
/// Returns `BulletFired`, `FireRejected` when the bullet limit is reached,
/// or `None` when firing is not possible at all.
pub fn try_fire(world: &mut WorldState) -> Option<GameEvent> {
    let p = &world.player;
    if !p.alive || world.reached_exit || world.time_is_up() { return None; }
    if world.bullets.len() >= MAX_BULLETS {
        return Some(GameEvent::FireRejected);
    }
    let bullet = Bullet::fired_from(p.position, p.facing, BulletKind::for_skin(p.skin));
    world.bullets.push(bullet);
    Some(GameEvent::BulletFired)
}

/// Cycle to the next player skin.
pub fn change_skin(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let skin = (world.player.skin + 1) % SKIN_COUNT;
    world.player.skin = skin;
    events.push(GameEvent::SkinChanged { skin });
}

pub fn continue_action(world: &WorldState) -> Option<ContinueAction> {
    match world.status() {
        Status::Running => None,
        Status::Died => Some(ContinueAction::Respawn),
        Status::Won => Some(ContinueAction::NextLevel),
        Status::Lost => Some(ContinueAction::RetryLevel),
    }
}

/// Apply the continue key. Returns what happened, if anything.
pub fn continue_game(world: &mut WorldState, source: &LevelSource) -> Option<ContinueAction> {
    let action = continue_action(world)?;
    match action {
        ContinueAction::Respawn => level::start_new_life(world),
        ContinueAction::NextLevel => {
            let next = world.current_level + 1;
            level::load_level_or_fallback(world, source, next);
        }
        ContinueAction::RetryLevel => {
            let idx = world.current_level;
            level::load_level_or_fallback(world, source, idx);
        }
    }
    // The continue key is the jump key; the same press must not launch a jump.
    world.player.was_jumping = true;
    Some(action)
}

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

fn resolve_player(world: &mut WorldState, input: FrameInput, dt: f32, events: &mut Vec<GameEvent>) {
    let p = &mut world.player;
    p.direction = input.movement.map_or(0.0, Facing::sign);
    if p.alive {
        if let Some(f) = input.movement { p.facing = f; }
    }
    if physics::apply_physics(p, &world.grid, input.jump, dt, &world.physics) {
        events.push(GameEvent::JumpStarted);
    }
}

fn kill_player(world: &mut WorldState, by_enemy: bool, events: &mut Vec<GameEvent>) {
    world.player.alive = false;
    world.hero_died = true;
    tracing::debug!(by_enemy, x = world.player.position.x, "player killed");
    events.push(GameEvent::PlayerKilled { by_enemy });
}

// ══════════════════════════════════════════════════════════════
// Bullets
// ══════════════════════════════════════════════════════════════

fn resolve_bullets(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let anchor_x = world.player.position.x.max(RANGE_MIN_ANCHOR_X);
    let mut i = 0;
    while i < world.bullets.len() {
        if world.player.alive {
            let b = world.bullets[i].bounds();
            if let Some(hit) = world.enemies.iter().position(|e| e.bounds().intersects(&b)) {
                world.enemies.remove(hit);
                world.bullets.remove(i);
                events.push(GameEvent::EnemyShot);
                continue;
            }
        }

        let bullet = &mut world.bullets[i];
        bullet.position.x += bullet.facing.sign() * bullet.kind.speed();
        if bullet_spent(bullet, anchor_x, &world.grid) {
            world.bullets.remove(i);
            continue;
        }
        i += 1;
    }
}

/// Out of range, or the tile at the leading edge is not open.
fn bullet_spent(bullet: &Bullet, anchor_x: f32, grid: &TileGrid) -> bool {
    if (bullet.position.x - anchor_x).abs() > BULLET_RANGE { return true; }

    let b = bullet.bounds();
    let col = match bullet.facing {
        Facing::Right => (b.right() / TILE_W).ceil() as i32 - 1,
        Facing::Left => tile_col(b.left),
    };
    let row = tile_row(bullet.position.y);
    grid.collision_at(col, row) != TileCollision::Passable
}

// ══════════════════════════════════════════════════════════════
// Level body
// ══════════════════════════════════════════════════════════════

fn drain_time_bonus(world: &mut WorldState, dt: f32) {
    let per_tick = (EXIT_DRAIN_RATE * dt).floor().max(1.0);
    let seconds = per_tick.min(world.time_remaining.ceil());
    world.time_remaining -= seconds;
    world.score += seconds as u32 * world.timing.points_per_second;
}

fn resolve_gems(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let clock = world.clock;
    for gem in &mut world.gems {
        let t = clock * GEM_BOUNCE_RATE - gem.base.x * GEM_BOUNCE_SPREAD;
        gem.position.y = gem.base.y + t.sin() * GEM_BOUNCE_HEIGHT * TILE_W;
    }

    let player = world.player.bounds();
    let mut i = 0;
    while i < world.gems.len() {
        if world.gems[i].bounds().intersects(&player) {
            let gem = world.gems.remove(i);
            world.score += gem.value;
            events.push(GameEvent::GemCollected { value: gem.value });
        } else {
            i += 1;
        }
    }
}

fn resolve_fall(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.player.alive && world.player.bounds().top >= world.grid.pixel_height() {
        kill_player(world, false, events);
    }
}

fn resolve_enemies(world: &mut WorldState, dt: f32, events: &mut Vec<GameEvent>) {
    if world.player.alive {
        let player = world.player.bounds();
        if world.enemies.iter().any(|e| e.bounds().intersects(&player)) {
            kill_player(world, true, events);
        }
    }

    let ended = world.level_ended();
    for enemy in &mut world.enemies {
        ai::tick_enemy(enemy, &world.grid, ended, dt, &world.patrol);
    }
}

fn resolve_exit(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let p = &world.player;
    if p.alive && p.on_ground && p.bounds().contains_point(world.exit) {
        world.player.reached_exit = true;
        world.reached_exit = true;
        tracing::info!(level = world.current_level + 1, time_left = world.time_remaining, "exit reached");
        events.push(GameEvent::ExitReached);
    }
}

fn resolve_checkpoints(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    while let Some(&col) = world.checkpoints.get(world.next_checkpoint) {
        if world.player.position.x < col as f32 * TILE_W { break; }
        world.next_checkpoint += 1;
        let skin = (world.player.skin + 1).min(SKIN_COUNT - 1);
        world.player.skin = skin;
        world.set_message("Checkpoint!", MESSAGE_TICKS);
        events.push(GameEvent::CheckpointReached { skin });
    }
}
