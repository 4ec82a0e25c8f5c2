/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The world is drawn at one terminal column per `CELL_PX_W` pixels and one
/// row per `CELL_PX_H` pixels, so a tile is two columns wide and actors are
/// small four-by-three sprites.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::{BulletKind, Facing, Player};
use crate::domain::geometry::Rect;
use crate::domain::tile::TileVisual;
use crate::sim::world::{Camera, Phase, Status, WorldState, CELL_PX_H, CELL_PX_W};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for every "empty" cell, so terminals that
    /// paint inter-row gaps with the last Clear colour show no seams.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel used to invalidate the back buffer.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = if bg == Color::Reset { Self::BASE_BG } else { bg };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Keep the background already in the buffer, replace char and fg.
    fn overlay(&mut self, x: usize, y: usize, ch: char, fg: Color) {
        let bg = self.get(x, y).bg;
        self.set(x, y, Cell::new(ch, fg, bg));
    }

    /// Write a string at (x, y), clipped at the right edge.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }

    /// Centre `s` on row `y` within `width` columns.
    fn put_centered(&mut self, width: usize, y: usize, s: &str, fg: Color, bg: Color) {
        let x = width.saturating_sub(s.chars().count()) / 2;
        self.put_str(x, y, s, fg, bg);
    }

    #[cfg(test)]
    fn row_text(&self, y: usize) -> String {
        (0..self.width).map(|x| self.get(x, y).ch).collect()
    }
}

// ── Layout ──

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
/// Rows below the map: gap, message bar, help line.
const FOOTER_ROWS: usize = 3;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const TITLE_FG: Color = Color::Rgb { r: 255, g: 200, b: 50 };
const GOOD_FG: Color = Color::Rgb { r: 80, g: 255, b: 80 };
const WARN_FG: Color = Color::Rgb { r: 255, g: 60, b: 60 };
const DIM_FG: Color = Color::DarkGrey;

const SKY_BG: Color = Color::Rgb { r: 30, g: 40, b: 70 };
const GRASS: Color = Color::Rgb { r: 90, g: 190, b: 70 };
const DIRT: Color = Color::Rgb { r: 110, g: 70, b: 40 };
const DIRT_DARK: Color = Color::Rgb { r: 80, g: 50, b: 30 };
const STONE: Color = Color::Rgb { r: 140, g: 140, b: 150 };
const STONE_DARK: Color = Color::Rgb { r: 70, g: 70, b: 80 };
const WOOD: Color = Color::Rgb { r: 200, g: 150, b: 80 };
const GEM_FG: Color = Color::Rgb { r: 120, g: 230, b: 255 };

const SKIN_COLORS: [Color; 3] = [
    Color::Rgb { r: 255, g: 255, b: 255 },
    Color::Rgb { r: 255, g: 180, b: 60 },
    Color::Rgb { r: 120, g: 255, b: 160 },
];

const HELP_LINE: &str = " ←→/AD Move  ↑/W/Space Jump  F/J Fire  B Skin  F1 Pause  Esc Title";

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    /// Frames drawn; drives blinking.
    frame: u64,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            frame: 0,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw as usize, th as usize);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Size both buffers and force a full repaint.
    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render(&mut self, world: &mut WorldState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.update_viewport(world);
        self.compose(world);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        self.frame = self.frame.wrapping_add(1);
        Ok(())
    }

    /// Fit the camera to the terminal and the level, then track the player.
    fn update_viewport(&self, world: &mut WorldState) {
        let (world_w, world_h) = world.size_in_cells();
        let max_h = self.term_h.saturating_sub(MAP_ROW + FOOTER_ROWS).max(1);
        let view_w = self.term_w.min(world_w.max(1));
        let view_h = max_h.min(world_h.max(1));

        let resized = world.camera.view_w != view_w || world.camera.view_h != view_h;
        world.camera.view_w = view_w;
        world.camera.view_h = view_h;
        if resized {
            world.center_camera();
        } else {
            world.follow_player();
        }
    }

    fn compose(&mut self, world: &WorldState) {
        self.front.clear();
        match world.phase {
            Phase::Title => self.compose_title(world),
            Phase::Playing => {
                self.compose_game(world);
                match world.status() {
                    Status::Running => {}
                    status => self.compose_status_overlay(world, status),
                }
                if world.paused {
                    self.compose_pause_overlay(world);
                }
            }
        }
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        // Explicit base colours; ResetColor would fall back to the terminal default.
        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }

                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: game view ──

    fn compose_game(&mut self, w: &WorldState) {
        self.compose_hud(w);
        self.compose_map(w);

        for gem in &w.gems {
            let c = gem.position;
            self.put_glyph(&w.camera, c.x, c.y, '◆', GEM_FG);
        }
        for enemy in &w.enemies {
            let sprite = enemy_sprite(enemy.kind, enemy.facing);
            self.put_sprite(&w.camera, enemy.bounds(), &sprite, WARN_FG);
        }
        for bullet in &w.bullets {
            let c = bullet.bounds().center();
            let ch = match bullet.kind {
                BulletKind::Pellet => '•',
                BulletKind::Bolt => '═',
            };
            self.put_glyph(&w.camera, c.x, c.y, ch, TITLE_FG);
        }
        let color = SKIN_COLORS[(w.player.skin as usize).min(SKIN_COLORS.len() - 1)];
        self.put_sprite(&w.camera, w.player.bounds(), &player_sprite(&w.player), color);

        let cam = &w.camera;
        let msg_row = MAP_ROW + cam.view_h + 1;
        if !w.message.is_empty() && msg_row < self.front.height {
            self.front.fill_row(msg_row, MSG_BG);
            self.front.put_str(0, msg_row, &format!(" ◈ {} ", w.message), Color::Black, MSG_BG);
        }
        let help_row = MAP_ROW + cam.view_h + 2;
        if help_row < self.front.height {
            self.front.put_str(0, help_row, HELP_LINE, DIM_FG, Color::Reset);
        }
    }

    fn compose_hud(&mut self, w: &WorldState) {
        self.front.fill_row(HUD_ROW, HUD_BG);

        let time_fg = if w.time_warning() { WARN_FG } else { Color::Yellow };
        let time = format!(" TIME: {} ", format_time(w.time_remaining));
        let score = format!(" SCORE: {} ", w.score);
        let level = format!(" {}/{} {} ", w.current_level + 1, w.total_levels.max(1), w.level_name);

        self.front.put_str(0, HUD_ROW, &time, time_fg, HUD_BG);
        let x = time.chars().count();
        self.front.put_str(x, HUD_ROW, &score, Color::White, HUD_BG);
        let x = x + score.chars().count();
        self.front.put_str(x, HUD_ROW, &level, GOOD_FG, HUD_BG);
    }

    fn compose_map(&mut self, w: &WorldState) {
        let cam = &w.camera;
        for vy in 0..cam.view_h {
            let row = MAP_ROW + vy;
            if row >= self.front.height { break; }
            let wy = cam.y + vy as i32;

            for vx in 0..cam.view_w {
                if vx >= self.front.width { break; }
                let wx = cam.x + vx as i32;
                let cell = if wx < 0 || wy < 0 {
                    Cell::BLANK
                } else {
                    let tx = wx as usize / 2;
                    let half = wx as usize % 2;
                    match w.grid.get(tx, wy as usize) {
                        Some(tile) => tile_cell(tile.visual, half),
                        None => Cell::BLANK,
                    }
                };
                self.front.set(vx, row, cell);
            }
        }
    }

    /// Terminal position of a pixel, if it is inside the viewport.
    fn view_pos(cam: &Camera, px: f32, py: f32) -> Option<(usize, usize)> {
        let cx = (px / CELL_PX_W).floor() as i32;
        let cy = (py / CELL_PX_H).floor() as i32;
        cam.world_to_view(cx, cy).map(|(x, y)| (x, y + MAP_ROW))
    }

    fn put_glyph(&mut self, cam: &Camera, px: f32, py: f32, ch: char, fg: Color) {
        if let Some((x, y)) = Self::view_pos(cam, px, py) {
            self.front.overlay(x, y, ch, fg);
        }
    }

    /// Draw `rows` so they cover `bounds`. Spaces are transparent.
    fn put_sprite(&mut self, cam: &Camera, bounds: Rect, rows: &[String], fg: Color) {
        let left = (bounds.left / CELL_PX_W).round() as i32;
        let top = (bounds.top / CELL_PX_H).round() as i32;
        for (dy, line) in rows.iter().enumerate() {
            for (dx, ch) in line.chars().enumerate() {
                if ch == ' ' { continue; }
                if let Some((x, y)) = cam.world_to_view(left + dx as i32, top + dy as i32) {
                    self.front.overlay(x, y + MAP_ROW, ch, fg);
                }
            }
        }
    }

    // ── Overlays ──

    fn compose_status_overlay(&mut self, w: &WorldState, status: Status) {
        let (title, fg) = match status {
            Status::Died => ("YOU DIED", WARN_FG),
            Status::Won => ("YOU WIN!", GOOD_FG),
            Status::Lost => ("TIME'S UP", WARN_FG),
            Status::Running => return,
        };
        let prompt = match status {
            Status::Died => "Jump to try again",
            Status::Won => "Jump for the next level",
            _ => "Jump to retry the level",
        };
        let bg = Color::Rgb { r: 30, g: 30, b: 30 };
        let width = w.camera.view_w.min(self.front.width);
        let mid = MAP_ROW + w.camera.view_h / 2;
        let top = mid.saturating_sub(2);

        let box_w = 30.min(width);
        let box_x = width.saturating_sub(box_w) / 2;
        for y in top..top + 5 {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Cell::new(' ', Color::White, bg));
            }
        }
        self.front.put_centered(width, top + 1, title, fg, bg);
        let score = format!("Score {}", w.score);
        self.front.put_centered(width, top + 2, &score, Color::White, bg);
        if (self.frame / 20) % 2 == 0 {
            self.front.put_centered(width, top + 3, prompt, DIM_FG, bg);
        }
    }

    fn compose_pause_overlay(&mut self, w: &WorldState) {
        let bg = Color::Rgb { r: 40, g: 40, b: 40 };
        let width = w.camera.view_w.min(self.front.width);
        let box_w = 28.min(width);
        let box_h = 7.min(w.camera.view_h.max(1));
        let box_x = width.saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + w.camera.view_h.saturating_sub(box_h) / 2;

        for y in box_y..box_y + box_h {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Cell::new(' ', Color::White, bg));
            }
        }
        let blink = (self.frame / 16) % 2 == 0;
        let label = if blink { "▶  PAUSED  ◀" } else { "   PAUSED   " };
        self.front.put_centered(width, box_y + 1, label, TITLE_FG, bg);
        self.front.put_centered(width, box_y + 3, "F1   Resume", Color::Rgb { r: 100, g: 200, b: 255 }, bg);
        self.front.put_centered(width, box_y + 4, "Esc  Title ", Color::Rgb { r: 100, g: 200, b: 255 }, bg);
    }

    // ── Title ──

    fn compose_title(&mut self, w: &WorldState) {
        let title = [
            r"   ___                 ___                          ",
            r"  / __| ___  _ __     | _ \ _  _  _ _   _ _   ___  _ _ ",
            r" | (_ |/ -_)| '  \    |   /| || || ' \ | ' \ / -_)| '_|",
            r"  \___|\___||_|_|_|   |_|_\ \_,_||_||_||_||_|\___||_|  ",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_str(2, 2 + i, line, TITLE_FG, Color::Reset);
        }

        let base = 8;
        let levels = format!("{} levels", w.total_levels);
        self.front.put_str(8, base, &levels, DIM_FG, Color::Reset);
        if (self.frame / 20) % 2 == 0 {
            self.front.put_str(8, base + 2, "ENTER   Start", GOOD_FG, Color::Reset);
        }
        self.front.put_str(8, base + 3, "Q/ESC   Quit", Color::White, Color::Reset);

        let help = [
            "Controls",
            "  ←→ / A D         Move",
            "  ↑ / W / Space    Jump, continue",
            "  F / J            Fire (two shots at a time)",
            "  B                Change skin",
            "  F1               Pause",
            "",
            "Grab the gems, dodge or shoot the enemies and",
            "reach the exit before the clock runs out.",
        ];
        for (i, line) in help.iter().enumerate() {
            let fg = if i == 0 { TITLE_FG } else { Color::White };
            self.front.put_str(8, base + 5 + i, line, fg, Color::Reset);
        }

        if w.score > 0 {
            let last = format!("Last score: {}", w.score);
            self.front.put_str(8, base + 5 + help.len() + 1, &last, GOOD_FG, Color::Reset);
        }
    }
}

/// `m:ss`, rounding partial seconds up so the clock reads 0:00 only at zero.
fn format_time(secs: f32) -> String {
    let total = secs.max(0.0).ceil() as u32;
    format!("{}:{:02}", total / 60, total % 60)
}

fn tile_cell(visual: Option<TileVisual>, half: usize) -> Cell {
    let pick = |pair: [char; 2]| pair[half.min(1)];
    match visual {
        None => Cell::new(' ', Color::White, SKY_BG),
        Some(TileVisual::Exit) => Cell::new(pick(['▐', '▌']), GOOD_FG, SKY_BG),
        Some(TileVisual::Checkpoint) => Cell::new(pick(['|', '>']), TITLE_FG, SKY_BG),
        Some(TileVisual::Platform) => Cell::new('═', WOOD, SKY_BG),
        Some(TileVisual::PlatformBlock) => Cell::new('▀', WOOD, DIRT_DARK),
        Some(TileVisual::BlockA) => Cell::new('▓', STONE, STONE_DARK),
        Some(TileVisual::BlockB) => Cell::new('▒', STONE, STONE_DARK),
        Some(TileVisual::GroundTopLeft) => Cell::new(pick(['▗', '▄']), GRASS, DIRT),
        Some(TileVisual::GroundTop) => Cell::new('▀', GRASS, DIRT),
        Some(TileVisual::GroundTopRight) => Cell::new(pick(['▄', '▖']), GRASS, DIRT),
        Some(TileVisual::GroundLeft) => Cell::new(pick(['▐', '░']), DIRT_DARK, DIRT),
        Some(TileVisual::GroundFill) => Cell::new('░', DIRT_DARK, DIRT),
        Some(TileVisual::GroundRight) => Cell::new(pick(['░', '▌']), DIRT_DARK, DIRT),
    }
}

fn player_sprite(p: &Player) -> Vec<String> {
    let head = if !p.alive {
        " xx "
    } else {
        match p.facing {
            Facing::Left => " <o ",
            Facing::Right => " o> ",
        }
    };
    let legs = if !p.on_ground { " /\\ " } else { " || " };
    vec![head.to_string(), "/##\\".to_string(), legs.to_string()]
}

fn enemy_sprite(kind: char, facing: Facing) -> Vec<String> {
    let eyes = match facing {
        Facing::Left => "<..",
        Facing::Right => "..>",
    };
    vec![format!(" {eyes}"), format!("[{kind}{kind}]"), " ^^ ".to_string()]
}
