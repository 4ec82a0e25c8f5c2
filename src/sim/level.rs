/// Level loader.
///
/// ## Sources (priority order):
///   1. `levels/` directory (individual `.txt` files, ordered by number)
///   2. Built-in embedded levels
///   3. A hardcoded fallback level when a level fails to load
///
/// ## Level text format:
///   Optional first line: `; Level Name`
///   Lines: map rows, one character per 32x32 tile. Short rows are padded
///   with empty tiles. A single line longer than `FLAT_WIDTH` is the flat
///   format: one long string cut into rows of `FLAT_WIDTH` tiles.
///   Tabs and carriage returns are ignored.
///
/// ## Tile legend:
///   '.' ' ' = Empty              'X' = Exit
///   'G'     = Gem                '1' = Player start
///   '-'     = Platform           '~' = Platform block
///   '#' ':' = Blocks             '>' = Checkpoint
///   '/' '|' 'p' = Ground top (left, middle, right)
///   'u' 'i' 'o' = Ground fill (left, middle, right)
///   'A' 'B' 'C' 'D' 'E' 'F' 'L' 'H' = Enemy spawns

use std::path::{Path, PathBuf};

use crate::config::GameConfig;
use crate::domain::entity::{Enemy, Gem, Player};
use crate::domain::geometry::Vec2;
use crate::domain::grid::TileGrid;
use crate::domain::tile::{Tile, TileVisual};
use super::error::LevelError;
use super::world::{Phase, WorldState};

/// Row width of the single-line level format.
pub const FLAT_WIDTH: usize = 150;

const NAME_TICKS: u32 = 120;

/// Parsed level text: a name and a rectangular character grid.
#[derive(Clone, Debug)]
pub struct LevelDef {
    pub name: String,
    pub rows: Vec<Vec<char>>,
}

/// A validated level, ready to install into the world.
#[derive(Clone, Debug)]
pub struct LevelLayout {
    pub grid: TileGrid,
    pub start: Vec2,
    pub exit: Vec2,
    pub enemies: Vec<Enemy>,
    pub gems: Vec<Gem>,
    pub checkpoints: Vec<usize>,
}

/// Where level text comes from.
#[derive(Clone, Debug)]
pub enum LevelSource {
    Directory(Vec<PathBuf>),
    Embedded,
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

impl LevelSource {
    /// Use the configured levels directory if it holds any `.txt` files,
    /// otherwise the embedded levels.
    pub fn scan(config: &GameConfig) -> Self {
        let files = level_files(&config.levels_dir);
        if files.is_empty() {
            tracing::info!(dir = %config.levels_dir.display(), "no level files found, using built-in levels");
            LevelSource::Embedded
        } else {
            tracing::info!(dir = %config.levels_dir.display(), count = files.len(), "found level files");
            LevelSource::Directory(files)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            LevelSource::Directory(files) => files.len(),
            LevelSource::Embedded => EMBEDDED_LEVELS.len(),
        }
    }

    /// Raw text of level `idx`.
    pub fn text(&self, idx: usize) -> Result<String, LevelError> {
        match self {
            LevelSource::Directory(files) => {
                if files.is_empty() {
                    return Err(LevelError::NoLevels);
                }
                let path = &files[idx % files.len()];
                std::fs::read_to_string(path).map_err(|source| LevelError::Io {
                    path: path.clone(),
                    source,
                })
            }
            LevelSource::Embedded => {
                let (name, rows) = EMBEDDED_LEVELS[idx % EMBEDDED_LEVELS.len()];
                Ok(make_embedded(name, rows))
            }
        }
    }
}

/// Load level `idx` (wrapping) into the world. Preserves score.
///
/// On error the world is left exactly as it was.
pub fn load_level(world: &mut WorldState, source: &LevelSource, idx: usize) -> Result<(), LevelError> {
    let count = source.len().max(1);
    let idx = idx % count;
    let text = source.text(idx)?;
    load_text(world, &text, &format!("Level {}", idx + 1))?;
    world.current_level = idx;
    world.total_levels = count;
    tracing::info!(level = idx + 1, name = %world.level_name, "level loaded");
    Ok(())
}

/// Parse, validate and install a level from raw text.
pub fn load_text(world: &mut WorldState, text: &str, default_name: &str) -> Result<(), LevelError> {
    let def = parse_level(text, default_name)?;
    let layout = build_layout(&def)?;
    install(world, &def.name, layout);
    Ok(())
}

/// Load level `idx`, falling back to the built-in minimal level on error.
pub fn load_level_or_fallback(world: &mut WorldState, source: &LevelSource, idx: usize) {
    if let Err(e) = load_level(world, source, idx) {
        tracing::error!(level = idx + 1, "level load failed, using fallback: {e}");
        load_fallback(world);
        world.current_level = idx % source.len().max(1);
        world.total_levels = source.len().max(1);
    }
}

/// Install the hardcoded fallback level.
pub fn load_fallback(world: &mut WorldState) {
    let text = make_embedded("Fallback", FALLBACK_LEVEL);
    if let Err(e) = load_text(world, &text, "Fallback") {
        tracing::error!("fallback level is invalid: {e}");
    }
}

/// Respawn the player at the level start. Keeps the clock, score, gems, and enemies.
pub fn start_new_life(world: &mut WorldState) {
    world.player.reset(world.start);
    world.hero_died = false;
    world.bullets.clear();
    world.center_camera();
}

// ══════════════════════════════════════════════════════════════
// Parsing
// ══════════════════════════════════════════════════════════════

/// Turn level text into a rectangular character grid.
pub fn parse_level(text: &str, default_name: &str) -> Result<LevelDef, LevelError> {
    let cleaned: String = text.chars().filter(|&c| c != '\r' && c != '\t').collect();

    let mut name = String::new();
    let mut rows: Vec<String> = vec![];
    for line in cleaned.lines() {
        let before_map = rows.iter().all(|r| r.trim().is_empty());
        if before_map && name.is_empty() && line.starts_with(';') {
            name = line[1..].trim().to_string();
        } else {
            rows.push(line.to_string());
        }
    }

    while rows.first().map_or(false, |r| r.trim().is_empty()) {
        rows.remove(0);
    }
    while rows.last().map_or(false, |r| r.trim().is_empty()) {
        rows.pop();
    }

    if rows.is_empty() {
        return Err(LevelError::Empty);
    }

    if rows.len() == 1 && rows[0].chars().count() > FLAT_WIDTH {
        let flat: Vec<char> = rows[0].chars().collect();
        if flat.len() % FLAT_WIDTH != 0 {
            return Err(LevelError::FlatLength { len: flat.len(), width: FLAT_WIDTH });
        }
        rows = flat.chunks(FLAT_WIDTH).map(|c| c.iter().collect()).collect();
    }

    let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    let grid = rows
        .iter()
        .map(|r| {
            let mut row: Vec<char> = r.chars().map(|c| if c == ' ' { '.' } else { c }).collect();
            row.resize(width, '.');
            row
        })
        .collect();

    if name.is_empty() {
        name = default_name.to_string();
    }

    Ok(LevelDef { name, rows: grid })
}

/// Build tiles and entities from a parsed level, validating start and exit.
pub fn build_layout(def: &LevelDef) -> Result<LevelLayout, LevelError> {
    let height = def.rows.len();
    let width = def.rows.first().map_or(0, |r| r.len());
    if width == 0 {
        return Err(LevelError::Empty);
    }

    let mut grid = TileGrid::new(width, height);
    let mut start = None;
    let mut exit = None;
    let mut enemies = vec![];
    let mut gems = vec![];
    let mut checkpoints = vec![];

    for (y, row) in def.rows.iter().enumerate() {
        for (x, &ch) in row.iter().enumerate() {
            let tile_rect = TileGrid::tile_bounds(x as i32, y as i32);
            let tile = match ch {
                '.' => Tile::EMPTY,
                'X' => {
                    if exit.is_some() {
                        return Err(LevelError::DuplicateExit { x, y });
                    }
                    exit = Some(tile_rect.center());
                    Tile::decoration(TileVisual::Exit)
                }
                '1' => {
                    if start.is_some() {
                        return Err(LevelError::DuplicateStart { x, y });
                    }
                    start = Some(tile_rect.bottom_center());
                    Tile::EMPTY
                }
                'G' => {
                    gems.push(Gem::at_tile(x, y));
                    Tile::EMPTY
                }
                'A' | 'B' | 'C' | 'D' | 'E' | 'F' | 'L' | 'H' => {
                    enemies.push(Enemy::new(tile_rect.bottom_center(), ch));
                    Tile::EMPTY
                }
                '>' => {
                    checkpoints.push(x);
                    Tile::decoration(TileVisual::Checkpoint)
                }
                '-' => Tile::platform(TileVisual::Platform),
                '~' => Tile::platform(TileVisual::PlatformBlock),
                '#' => Tile::solid(TileVisual::BlockA),
                ':' => Tile::solid(TileVisual::BlockB),
                '/' => Tile::solid(TileVisual::GroundTopLeft),
                '|' => Tile::solid(TileVisual::GroundTop),
                'p' => Tile::solid(TileVisual::GroundTopRight),
                'u' => Tile::solid(TileVisual::GroundLeft),
                'i' => Tile::solid(TileVisual::GroundFill),
                'o' => Tile::solid(TileVisual::GroundRight),
                _ => return Err(LevelError::UnknownTile { ch, x, y }),
            };
            grid.set(x, y, tile);
        }
    }

    let start = start.ok_or(LevelError::MissingStart)?;
    let exit = exit.ok_or(LevelError::MissingExit)?;
    checkpoints.sort_unstable();
    checkpoints.dedup();

    Ok(LevelLayout { grid, start, exit, enemies, gems, checkpoints })
}

/// Replace the current level with `layout`. Score is kept.
fn install(world: &mut WorldState, name: &str, layout: LevelLayout) {
    world.grid = layout.grid;
    world.start = layout.start;
    world.exit = layout.exit;
    world.enemies = layout.enemies;
    world.gems = layout.gems;
    world.checkpoints = layout.checkpoints;
    world.next_checkpoint = 0;
    world.bullets.clear();

    world.player = Player::new(layout.start);
    world.time_remaining = world.timing.time_limit_secs;
    world.clock = 0.0;
    world.reached_exit = false;
    world.hero_died = false;
    world.tick = 0;

    world.level_name = name.to_string();
    world.phase = Phase::Playing;
    world.paused = false;
    world.set_message(name, NAME_TICKS);
    world.center_camera();
}

// ══════════════════════════════════════════════════════════════
// Directory loading (individual .txt files)
// ══════════════════════════════════════════════════════════════

/// `.txt` files in `dir`: numeric names first in numeric order, then the rest by name.
fn level_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return vec![],
    };

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().map_or(false, |e| e == "txt"))
        .collect();

    files.sort_by_key(|p| {
        let stem = p.file_stem().unwrap_or_default().to_string_lossy().to_string();
        (stem.parse::<u32>().map_or(u32::MAX, |n| n), stem)
    });
    files
}

// ══════════════════════════════════════════════════════════════
// Embedded levels
// ══════════════════════════════════════════════════════════════

fn make_embedded(name: &str, map: &[&str]) -> String {
    let mut text = format!("; {name}\n");
    for row in map {
        text.push_str(row);
        text.push('\n');
    }
    text
}

/// Minimal level used when a level cannot be loaded.
const FALLBACK_LEVEL: &[&str] = &[
    "....................",
    "....................",
    "....................",
    "....................",
    "....................",
    "....................",
    "....................",
    ".........GGG........",
    ".........###........",
    "....................",
    "....GGG.......GGG...",
    "....###...--..###...",
    "....................",
    ".1................X.",
    "####################",
];

/// Built-in levels used when no `levels/` directory is present.
const EMBEDDED_LEVELS: &[(&str, &[&str])] = &[
    ("Meadow Run", &[
        "................................................",
        "................................................",
        "................................................",
        "................................................",
        "................................................",
        "................................................",
        "................................................",
        "................................................",
        "............................GGG.................",
        "............................####......GG........",
        "................GG....................B.........",
        "..............------................~~~~~~......",
        ".....GGG........................................",
        ".1........>...............A...................X.",
        "/|||||||||||||p..../|||||||||||||||||||||||||||p",
    ]),
    ("Stone Steps", &[
        "................................................",
        "................................................",
        "................................................",
        "................................................",
        "................................................",
        "................................................",
        "................................................",
        "..................................GG............",
        ".................................----...........",
        "........................................GGG.....",
        "........................................####....",
        ".........................D.>G...................",
        ".........::...GG......../||||p..................",
        ".1.......::.........C...uiiiio..............X...",
        "/||||||||||||||||||||||||||||||||||||||||||||||p",
    ]),
    ("Twin Ledges", &[
        "................................................",
        "................................................",
        "................................................",
        "................................................",
        "................................................",
        "................................................",
        "................................................",
        "....................................GGGG........",
        "......................GGG.............H.........",
        "........................L.............####......",
        "......................~~~~~~....................",
        "............--..................GG..............",
        "............GG..................--..............",
        ".1....>.............E...................F.....X.",
        "/|||||||||p...../|||||||||||||p...../||||||||||p",
    ]),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::TileCollision;

    fn world() -> WorldState {
        WorldState::new(&GameConfig::default())
    }

    #[test]
    fn parses_name_and_pads_rows() {
        let def = parse_level("; Tiny\r\n..\n.1..X\n###\n", "Level 1").unwrap();
        assert_eq!(def.name, "Tiny");
        assert_eq!(def.rows.len(), 3);
        assert!(def.rows.iter().all(|r| r.len() == 5));
        assert_eq!(def.rows[2], vec!['#', '#', '#', '.', '.']);
    }

    #[test]
    fn default_name_when_missing() {
        let def = parse_level(".1X\n###", "Level 4").unwrap();
        assert_eq!(def.name, "Level 4");
    }

    #[test]
    fn tabs_and_spaces() {
        let def = parse_level("\t 1 X\n###", "L").unwrap();
        assert_eq!(def.rows[0], vec!['.', '1', '.', 'X']);
    }

    #[test]
    fn flat_format_splits_rows() {
        let mut flat = String::new();
        flat.push('1');
        flat.push_str(&".".repeat(FLAT_WIDTH - 2));
        flat.push('X');
        flat.push_str(&"#".repeat(FLAT_WIDTH));
        let def = parse_level(&flat, "Flat").unwrap();
        assert_eq!(def.rows.len(), 2);
        assert_eq!(def.rows[0].len(), FLAT_WIDTH);
        assert_eq!(def.rows[1][0], '#');
    }

    #[test]
    fn flat_format_rejects_ragged_length() {
        let flat = ".".repeat(FLAT_WIDTH + 7);
        assert!(matches!(
            parse_level(&flat, "Flat"),
            Err(LevelError::FlatLength { len, width: FLAT_WIDTH }) if len == FLAT_WIDTH + 7
        ));
    }

    #[test]
    fn empty_text_is_an_error() {
        assert!(matches!(parse_level("\n\n; only a name\n", "L"), Err(LevelError::Empty)));
    }

    #[test]
    fn builds_tiles_and_entities() {
        let def = parse_level("G..A.\n1-~>X\n/|p##", "L").unwrap();
        let layout = build_layout(&def).unwrap();
        assert_eq!(layout.start, Vec2::new(16.0, 64.0));
        assert_eq!(layout.exit, Vec2::new(144.0, 48.0));
        assert_eq!(layout.gems.len(), 1);
        assert_eq!(layout.enemies.len(), 1);
        assert_eq!(layout.enemies[0].position, Vec2::new(112.0, 32.0));
        assert_eq!(layout.enemies[0].kind, 'A');
        assert_eq!(layout.checkpoints, vec![3]);
        assert_eq!(layout.grid.collision_at(1, 1), TileCollision::Platform);
        assert_eq!(layout.grid.collision_at(2, 1), TileCollision::Platform);
        assert_eq!(layout.grid.collision_at(4, 1), TileCollision::Passable);
        assert_eq!(layout.grid.collision_at(0, 2), TileCollision::Impassable);
    }

    #[test]
    fn start_and_exit_are_required_once() {
        let check = |text: &str| build_layout(&parse_level(text, "L").unwrap());
        assert!(matches!(check("..X\n###"), Err(LevelError::MissingStart)));
        assert!(matches!(check("1..\n###"), Err(LevelError::MissingExit)));
        assert!(matches!(check("1.1X\n####"), Err(LevelError::DuplicateStart { x: 2, y: 0 })));
        assert!(matches!(check("1XX.\n####"), Err(LevelError::DuplicateExit { x: 2, y: 0 })));
        assert!(matches!(check("1?X\n###"), Err(LevelError::UnknownTile { ch: '?', x: 1, y: 0 })));
    }

    #[test]
    fn embedded_levels_are_valid() {
        let src = LevelSource::Embedded;
        for i in 0..src.len() {
            let text = src.text(i).unwrap();
            let def = parse_level(&text, "L").unwrap();
            build_layout(&def).unwrap_or_else(|e| panic!("level {}: {e}", i + 1));
        }
    }

    #[test]
    fn fallback_is_valid() {
        let mut w = world();
        load_fallback(&mut w);
        assert_eq!(w.level_name, "Fallback");
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.grid.width(), 20);
        assert_eq!(w.grid.height(), 15);
    }

    #[test]
    fn load_keeps_score_and_resets_level_state() {
        let mut w = world();
        w.score = 450;
        w.reached_exit = true;
        w.hero_died = true;
        w.time_remaining = 3.0;
        w.player.skin = 2;
        load_level(&mut w, &LevelSource::Embedded, 1).unwrap();
        assert_eq!(w.score, 450);
        assert!(!w.reached_exit);
        assert!(!w.hero_died);
        assert_eq!(w.time_remaining, w.timing.time_limit_secs);
        assert_eq!(w.player.skin, 0);
        assert_eq!(w.player.position, w.start);
        assert_eq!(w.current_level, 1);
        assert_eq!(w.level_name, "Stone Steps");
    }

    #[test]
    fn level_index_wraps() {
        let mut w = world();
        let src = LevelSource::Embedded;
        load_level(&mut w, &src, src.len() + 2).unwrap();
        assert_eq!(w.current_level, 2);
    }

    #[test]
    fn failed_load_leaves_world_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("1.txt");
        let bad = dir.path().join("2.txt");
        std::fs::write(&good, "; Good\n.1..X\n#####\n").unwrap();
        std::fs::write(&bad, "; Bad\n.1...\n#####\n").unwrap();
        let src = LevelSource::Directory(vec![good, bad]);

        let mut w = world();
        load_level(&mut w, &src, 0).unwrap();
        assert_eq!(w.level_name, "Good");
        assert!(matches!(load_level(&mut w, &src, 1), Err(LevelError::MissingExit)));
        assert_eq!(w.level_name, "Good");
        assert_eq!(w.current_level, 0);

        load_level_or_fallback(&mut w, &src, 1);
        assert_eq!(w.level_name, "Fallback");
        assert_eq!(w.current_level, 1);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("7.txt");
        let src = LevelSource::Directory(vec![path.clone()]);
        match src.text(0) {
            Err(LevelError::Io { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn empty_directory_source_falls_back() {
        let src = LevelSource::Directory(vec![]);
        assert!(matches!(src.text(3), Err(LevelError::NoLevels)));

        let mut w = world();
        load_level_or_fallback(&mut w, &src, 2);
        assert_eq!(w.level_name, "Fallback");
        assert_eq!(w.current_level, 0);
        assert_eq!(w.total_levels, 1);
    }

    #[test]
    fn directory_scan_orders_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["10.txt", "2.txt", "1.txt", "bonus.txt", "notes.md"] {
            std::fs::write(dir.path().join(name), "1X\n##").unwrap();
        }
        let files = level_files(dir.path());
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["1.txt", "2.txt", "10.txt", "bonus.txt"]);
    }

    #[test]
    fn scan_falls_back_to_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = GameConfig::default();
        cfg.levels_dir = dir.path().join("missing");
        assert!(matches!(LevelSource::scan(&cfg), LevelSource::Embedded));
        cfg.levels_dir = dir.path().to_path_buf();
        std::fs::write(dir.path().join("1.txt"), "1X\n##").unwrap();
        assert!(matches!(LevelSource::scan(&cfg), LevelSource::Directory(ref f) if f.len() == 1));
    }

    #[test]
    fn respawn_keeps_progress() {
        let mut w = world();
        load_level(&mut w, &LevelSource::Embedded, 0).unwrap();
        w.score = 90;
        w.gems.pop();
        let gems = w.gems.len();
        w.player.alive = false;
        w.hero_died = true;
        w.player.position.x += 300.0;
        start_new_life(&mut w);
        assert!(w.player.alive);
        assert!(!w.hero_died);
        assert_eq!(w.player.position, w.start);
        assert_eq!(w.gems.len(), gems);
        assert_eq!(w.score, 90);
    }
}
