/// WorldState: the complete snapshot of a running game.
///
/// ## Level lifecycle
///
/// `load_level` builds a fresh tile grid and entity set from level text and
/// installs it here in one go. Score carries across levels; the clock,
/// exit flag, and death flag reset on every load.
///
/// ## Camera / Viewport
///
/// World coordinates are pixels; the renderer draws one terminal cell per
/// `CELL_PX_W` x `CELL_PX_H` pixels. The camera works in those cells:
///   - `camera` is the viewport into the world (top-left cell + size)
///   - Camera follows the player with a dead-zone approach
///   - Maps smaller than the viewport are centered

use crate::config::{GameConfig, PatrolConfig, PhysicsConfig, TimingConfig};
use crate::domain::entity::{Bullet, Enemy, Gem, Player};
use crate::domain::geometry::{Vec2, TILE_H, TILE_W};
use crate::domain::grid::TileGrid;

/// Pixels per terminal column. Two columns per tile.
pub const CELL_PX_W: f32 = TILE_W / 2.0;
/// Pixels per terminal row. One row per tile.
pub const CELL_PX_H: f32 = TILE_H;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Title,
    Playing,
}

/// Overlay decision for the current level.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Status {
    Running,
    Died,
    Won,
    Lost,
}

/// Camera: a viewport into the world, in terminal cells.
#[derive(Clone, Debug)]
pub struct Camera {
    /// Cell X of the top-left visible cell (can be negative for centering)
    pub x: i32,
    /// Cell Y of the top-left visible cell
    pub y: i32,
    pub view_w: usize,
    pub view_h: usize,
}

impl Camera {
    pub fn new() -> Self {
        Camera { x: 0, y: 0, view_w: 0, view_h: 0 }
    }

    /// Scroll so `target` stays inside the middle of the viewport.
    pub fn follow(&mut self, target: Vec2, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        let (tx, ty) = to_cells(target);
        self.x = follow_axis(self.x, tx, self.view_w, world_w);
        self.y = follow_axis(self.y, ty, self.view_h, world_h);
    }

    /// Snap camera directly to center on a position (no dead zone).
    /// Used on level load and respawn.
    pub fn center_on(&mut self, target: Vec2, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        let (tx, ty) = to_cells(target);
        self.x = center_axis(tx, self.view_w, world_w);
        self.y = center_axis(ty, self.view_h, world_h);
    }

    /// Convert a world cell to a viewport cell, if visible.
    pub fn world_to_view(&self, wx: i32, wy: i32) -> Option<(usize, usize)> {
        let vx = wx - self.x;
        let vy = wy - self.y;
        if vx >= 0 && vx < self.view_w as i32 && vy >= 0 && vy < self.view_h as i32 {
            Some((vx as usize, vy as usize))
        } else {
            None
        }
    }
}

fn to_cells(p: Vec2) -> (i32, i32) {
    ((p.x / CELL_PX_W).floor() as i32, (p.y / CELL_PX_H).floor() as i32)
}

fn follow_axis(current: i32, target: i32, view: usize, world: usize) -> i32 {
    if world <= view {
        return -((view as i32 - world as i32) / 2);
    }
    // Dead zone: 30% margin on each side.
    let margin = (view as i32 * 3) / 10;
    let low = current + margin;
    let high = current + view as i32 - margin - 1;
    let mut pos = current;
    if target < low {
        pos = target - margin;
    } else if target > high {
        pos = target - view as i32 + margin + 1;
    }
    pos.max(0).min(world as i32 - view as i32)
}

fn center_axis(target: i32, view: usize, world: usize) -> i32 {
    if world <= view {
        return -((view as i32 - world as i32) / 2);
    }
    (target - view as i32 / 2).max(0).min(world as i32 - view as i32)
}

pub struct WorldState {
    // ── Level ──
    pub grid: TileGrid,
    pub start: Vec2,
    /// Centre of the exit tile.
    pub exit: Vec2,
    /// Checkpoint columns, ascending.
    pub checkpoints: Vec<usize>,
    pub next_checkpoint: usize,

    // ── Entities ──
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub gems: Vec<Gem>,
    pub bullets: Vec<Bullet>,

    // ── Scoring / timer ──
    pub score: u32,
    pub time_remaining: f32,
    /// Seconds of play in this level.
    pub clock: f32,
    pub reached_exit: bool,
    pub hero_died: bool,

    // ── Rules ──
    pub physics: PhysicsConfig,
    pub patrol: PatrolConfig,
    pub timing: TimingConfig,

    // ── Meta ──
    pub phase: Phase,
    pub current_level: usize,
    pub total_levels: usize,
    pub level_name: String,
    pub tick: u64,

    // ── UI ──
    pub message: String,
    pub message_timer: u32,
    pub paused: bool,
    pub camera: Camera,
}

impl WorldState {
    pub fn new(config: &GameConfig) -> Self {
        WorldState {
            grid: TileGrid::default(),
            start: Vec2::ZERO,
            exit: Vec2::ZERO,
            checkpoints: vec![],
            next_checkpoint: 0,
            player: Player::new(Vec2::ZERO),
            enemies: vec![],
            gems: vec![],
            bullets: vec![],
            score: 0,
            time_remaining: config.timing.time_limit_secs,
            clock: 0.0,
            reached_exit: false,
            hero_died: false,
            physics: config.physics.clone(),
            patrol: config.patrol.clone(),
            timing: config.timing.clone(),
            phase: Phase::Title,
            current_level: 0,
            total_levels: 0,
            level_name: String::new(),
            tick: 0,
            message: String::new(),
            message_timer: 0,
            paused: false,
            camera: Camera::new(),
        }
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }

    /// Enemies stop patrolling once the player died or made it out.
    pub fn level_ended(&self) -> bool {
        self.hero_died || self.reached_exit
    }

    pub fn time_is_up(&self) -> bool {
        self.time_remaining <= 0.0
    }

    /// HUD timer turns red below the warning threshold while still racing.
    pub fn time_warning(&self) -> bool {
        !self.reached_exit && self.time_remaining < self.timing.warning_secs
    }

    pub fn status(&self) -> Status {
        if self.time_is_up() {
            if self.reached_exit { Status::Won } else { Status::Lost }
        } else if !self.player.alive {
            Status::Died
        } else {
            Status::Running
        }
    }

    /// World size in terminal cells.
    pub fn size_in_cells(&self) -> (usize, usize) {
        let cols_per_tile = (TILE_W / CELL_PX_W) as usize;
        let rows_per_tile = (TILE_H / CELL_PX_H) as usize;
        (self.grid.width() * cols_per_tile, self.grid.height() * rows_per_tile)
    }

    pub fn follow_player(&mut self) {
        let (w, h) = self.size_in_cells();
        let target = self.player.bounds().center();
        self.camera.follow(target, w, h);
    }

    pub fn center_camera(&mut self) {
        let (w, h) = self.size_in_cells();
        let target = self.player.bounds().center();
        self.camera.center_on(target, w, h);
    }
}
