/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to the canonical ruleset if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub physics: PhysicsConfig,
    pub patrol: PatrolConfig,
    pub timing: TimingConfig,
    pub gamepad: GamepadConfig,
    pub levels_dir: PathBuf,
    pub log_file: PathBuf,
}

/// Player movement tuning, in pixels and seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsConfig {
    pub move_acceleration: f32,
    pub max_move_speed: f32,
    pub ground_drag: f32,
    pub air_drag: f32,
    pub max_jump_time: f32,
    pub jump_launch_velocity: f32,
    pub gravity: f32,
    pub max_fall_speed: f32,
    pub jump_control_power: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PatrolConfig {
    pub speed: f32,       // px per second
    pub wait_secs: f32,   // pause at a wall or ledge
}

#[derive(Clone, Debug, PartialEq)]
pub struct TimingConfig {
    pub tick_rate_ms: u64,
    pub time_limit_secs: f32,
    pub warning_secs: f32,
    pub points_per_second: u32,
}

impl TimingConfig {
    /// Fixed simulation step in seconds.
    pub fn dt(&self) -> f32 {
        self.tick_rate_ms as f32 / 1000.0
    }
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub jump: Vec<String>,
    pub fire: Vec<String>,
    pub skin: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    physics: TomlPhysics,
    #[serde(default)]
    patrol: TomlPatrol,
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlPhysics {
    #[serde(default = "default_move_accel")]
    move_acceleration: f32,
    #[serde(default = "default_max_move_speed")]
    max_move_speed: f32,
    #[serde(default = "default_drag")]
    ground_drag: f32,
    #[serde(default = "default_drag")]
    air_drag: f32,
    #[serde(default = "default_max_jump_time")]
    max_jump_time: f32,
    #[serde(default = "default_jump_launch")]
    jump_launch_velocity: f32,
    #[serde(default = "default_gravity")]
    gravity: f32,
    #[serde(default = "default_max_fall")]
    max_fall_speed: f32,
    #[serde(default = "default_jump_power")]
    jump_control_power: f32,
}

#[derive(Deserialize, Debug)]
struct TomlPatrol {
    #[serde(default = "default_patrol_speed")]
    speed: f32,
    #[serde(default = "default_patrol_wait")]
    wait_secs: f32,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_time_limit")]
    time_limit_secs: f32,
    #[serde(default = "default_warning")]
    warning_secs: f32,
    #[serde(default = "default_points_per_second")]
    points_per_second: u32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_jump_btn")]
    jump: Vec<String>,
    #[serde(default = "default_fire_btn")]
    fire: Vec<String>,
    #[serde(default = "default_skin_btn")]
    skin: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default = "default_log_file")]
    log_file: String,
}

// ── Defaults ──

fn default_move_accel() -> f32 { 13000.0 }
fn default_max_move_speed() -> f32 { 1750.0 }
fn default_drag() -> f32 { 0.6 }
fn default_max_jump_time() -> f32 { 0.35 }
fn default_jump_launch() -> f32 { -5000.0 }
fn default_gravity() -> f32 { 1800.0 }
fn default_max_fall() -> f32 { 550.0 }
fn default_jump_power() -> f32 { 0.14 }

fn default_patrol_speed() -> f32 { 54.0 }
fn default_patrol_wait() -> f32 { 0.5 }

fn default_tick_rate() -> u64 { 17 }
fn default_time_limit() -> f32 { 120.0 }
fn default_warning() -> f32 { 30.0 }
fn default_points_per_second() -> u32 { 5 }

fn default_jump_btn() -> Vec<String> { vec!["A".into()] }
fn default_fire_btn() -> Vec<String> { vec!["X".into(), "R1".into()] }
fn default_skin_btn() -> Vec<String> { vec!["Y".into()] }
fn default_confirm() -> Vec<String> { vec!["Start".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }
fn default_levels_dir() -> String { "levels".into() }
fn default_log_file() -> String { "gemrunner.log".into() }

impl Default for TomlPhysics {
    fn default() -> Self {
        TomlPhysics {
            move_acceleration: default_move_accel(),
            max_move_speed: default_max_move_speed(),
            ground_drag: default_drag(),
            air_drag: default_drag(),
            max_jump_time: default_max_jump_time(),
            jump_launch_velocity: default_jump_launch(),
            gravity: default_gravity(),
            max_fall_speed: default_max_fall(),
            jump_control_power: default_jump_power(),
        }
    }
}

impl Default for TomlPatrol {
    fn default() -> Self {
        TomlPatrol { speed: default_patrol_speed(), wait_secs: default_patrol_wait() }
    }
}

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            tick_rate_ms: default_tick_rate(),
            time_limit_secs: default_time_limit(),
            warning_secs: default_warning(),
            points_per_second: default_points_per_second(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            jump: default_jump_btn(),
            fire: default_fire_btn(),
            skin: default_skin_btn(),
            confirm: default_confirm(),
            cancel: default_cancel(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
            log_file: default_log_file(),
        }
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        TomlPhysics::default().into()
    }
}

impl Default for PatrolConfig {
    fn default() -> Self {
        TomlPatrol::default().into()
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        TomlTiming::default().into()
    }
}

impl Default for GamepadConfig {
    fn default() -> Self {
        TomlGamepad::default().into()
    }
}

impl From<TomlGamepad> for GamepadConfig {
    fn from(t: TomlGamepad) -> Self {
        GamepadConfig {
            jump: t.jump,
            fire: t.fire,
            skin: t.skin,
            confirm: t.confirm,
            cancel: t.cancel,
        }
    }
}

impl From<TomlPhysics> for PhysicsConfig {
    fn from(t: TomlPhysics) -> Self {
        PhysicsConfig {
            move_acceleration: t.move_acceleration,
            max_move_speed: t.max_move_speed,
            ground_drag: t.ground_drag,
            air_drag: t.air_drag,
            max_jump_time: t.max_jump_time,
            jump_launch_velocity: t.jump_launch_velocity,
            gravity: t.gravity,
            max_fall_speed: t.max_fall_speed,
            jump_control_power: t.jump_control_power,
        }
    }
}

impl From<TomlPatrol> for PatrolConfig {
    fn from(t: TomlPatrol) -> Self {
        PatrolConfig { speed: t.speed, wait_secs: t.wait_secs }
    }
}

impl From<TomlTiming> for TimingConfig {
    fn from(t: TomlTiming) -> Self {
        TimingConfig {
            tick_rate_ms: t.tick_rate_ms.max(1),
            time_limit_secs: t.time_limit_secs,
            warning_secs: t.warning_secs,
            points_per_second: t.points_per_second,
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) `~/.local/share/gemrunner`.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let Some((path, text)) = find_config(&search_dirs) else {
            return Self::resolve(TomlConfig::default(), &search_dirs);
        };
        match Self::from_toml_str(&text, &search_dirs) {
            Ok(cfg) => {
                tracing::info!(path = %path.display(), "loaded config");
                cfg
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "config.toml parse error, using defaults: {e}");
                Self::resolve(TomlConfig::default(), &search_dirs)
            }
        }
    }

    /// Build a config from TOML text. Relative paths resolve against the
    /// first of `search_dirs` that contains them.
    pub fn from_toml_str(text: &str, search_dirs: &[PathBuf]) -> Result<Self, toml::de::Error> {
        let toml_cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(Self::resolve(toml_cfg, search_dirs))
    }

    fn resolve(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let levels_dir_str = &toml_cfg.general.levels_dir;
        let levels_dir = if PathBuf::from(levels_dir_str).is_absolute() {
            PathBuf::from(levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(levels_dir_str))
        };

        GameConfig {
            physics: toml_cfg.physics.into(),
            patrol: toml_cfg.patrol.into(),
            timing: toml_cfg.timing.into(),
            gamepad: toml_cfg.gamepad.into(),
            levels_dir,
            log_file: PathBuf::from(toml_cfg.general.log_file),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::resolve(TomlConfig::default(), &[])
    }
}

/// Candidate directories to search: exe dir + CWD + data home (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        // Resolve symlinks so data is found next to the real binary.
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/gemrunner");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// First readable config.toml in the candidate directories.
fn find_config(search_dirs: &[PathBuf]) -> Option<(PathBuf, String)> {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => return Some((path, text)),
            Err(e) => tracing::warn!("could not read {}: {e}", path.display()),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_canonical_ruleset() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = GameConfig::from_toml_str("", &[dir.path().to_path_buf()]).unwrap();
        assert_eq!(cfg.physics, PhysicsConfig::default());
        assert_eq!(cfg.physics.gravity, 1800.0);
        assert_eq!(cfg.patrol.wait_secs, 0.5);
        assert_eq!(cfg.timing.tick_rate_ms, 17);
        assert_eq!(cfg.timing.time_limit_secs, 120.0);
        assert_eq!(cfg.gamepad.jump, vec!["A".to_string()]);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let text = "[physics]\ngravity = 900.0\n\n[timing]\ntime_limit_secs = 60.0\n";
        let cfg = GameConfig::from_toml_str(text, &[dir.path().to_path_buf()]).unwrap();
        assert_eq!(cfg.physics.gravity, 900.0);
        assert_eq!(cfg.physics.max_fall_speed, 550.0);
        assert_eq!(cfg.timing.time_limit_secs, 60.0);
        assert_eq!(cfg.timing.warning_secs, 30.0);
    }

    #[test]
    fn zero_tick_rate_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = GameConfig::from_toml_str("[timing]\ntick_rate_ms = 0\n", &[dir.path().to_path_buf()]).unwrap();
        assert_eq!(cfg.timing.tick_rate_ms, 1);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(GameConfig::from_toml_str("[physics\ngravity = ", &[dir.path().to_path_buf()]).is_err());
    }

    #[test]
    fn relative_levels_dir_resolves_against_base() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("stages")).unwrap();
        let cfg = GameConfig::from_toml_str("[general]\nlevels_dir = \"stages\"\n", &[dir.path().to_path_buf()]).unwrap();
        assert_eq!(cfg.levels_dir, dir.path().join("stages"));
    }

    #[test]
    fn config_file_found_in_search_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[patrol]\nspeed = 80.0\n").unwrap();
        let dirs = [dir.path().to_path_buf()];
        let (path, text) = find_config(&dirs).unwrap();
        assert_eq!(path, dir.path().join("config.toml"));
        let cfg = GameConfig::from_toml_str(&text, &dirs).unwrap();
        assert_eq!(cfg.patrol.speed, 80.0);
        assert_eq!(cfg.patrol.wait_secs, 0.5);
    }
}
