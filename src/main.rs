/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::io;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossterm::event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags};
use crossterm::{execute, terminal};
use tracing_subscriber::EnvFilter;

use config::GameConfig;
use sim::event::GameEvent;
use sim::level::{self, LevelSource};
use sim::step;
use sim::world::{Phase, WorldState};
use ui::gamepad::GamepadState;
use ui::input::{self, InputState, KEYS_BACK, KEYS_PAUSE, KEYS_QUIT, KEYS_START};
use ui::renderer::Renderer;
use ui::sound::{SoundEngine, Sfx};

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    // Config problems go to stderr: the log file is named by the config itself.
    let early = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(tracing::Level::WARN)
        .with_target(false)
        .compact()
        .finish();
    let config = tracing::subscriber::with_default(early, GameConfig::load);
    init_logging(&config);
    tracing::info!(levels_dir = %config.levels_dir.display(), "starting");

    let source = LevelSource::scan(&config);
    let mut world = WorldState::new(&config);
    world.total_levels = source.len();

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }
    let enhanced = enable_key_release_events();

    let sound = SoundEngine::new();

    let result = game_loop(&mut world, &mut renderer, sound.as_ref(), &config, &source, enhanced);

    if enhanced {
        let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
    }
    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        tracing::error!("game loop failed: {e}");
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Gem Runner!");
    println!("Final Score: {}", world.score);
}

/// Log to a file: the terminal is in raw mode while the game runs.
fn init_logging(config: &GameConfig) {
    let file = match File::create(&config.log_file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Logging disabled, cannot create {}: {e}", config.log_file.display());
            return;
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .compact()
        .init();
}

/// Ask the terminal for key release events so held keys end promptly.
fn enable_key_release_events() -> bool {
    let supported = terminal::supports_keyboard_enhancement().unwrap_or(false);
    supported
        && execute!(
            io::stdout(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )
        .is_ok()
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
    source: &LevelSource,
    enhanced: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    kb.honor_release = enhanced;
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    tracing::info!(gamepad = gp.connected, keyboard_release = enhanced, "input ready");
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.timing.tick_rate_ms);
    let dt = config.timing.dt();

    // Edge-triggered actions seen between ticks, so a quick tap is not lost.
    let mut pending_fire = false;
    let mut pending_skin = false;

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(world, sound, &kb, &gp, source) {
            break;
        }

        if world.phase == Phase::Playing && !world.paused {
            if input::continue_pressed(&kb, &gp) {
                if let Some(action) = step::continue_game(world, source) {
                    tracing::info!(?action, level = world.current_level + 1, "continue");
                    if action != step::ContinueAction::Respawn {
                        play(sound, Sfx::LevelStart);
                    }
                }
            }
            let now = input::frame_input(&kb, &gp);
            pending_fire |= now.fire;
            pending_skin |= now.change_skin;
        }

        let since_tick = last_tick.elapsed();
        if since_tick >= tick_rate {
            last_tick = Instant::now();
            if world.phase == Phase::Playing && !world.paused {
                let mut frame_input = input::frame_input(&kb, &gp);
                frame_input.fire = std::mem::take(&mut pending_fire);
                frame_input.change_skin = std::mem::take(&mut pending_skin);
                // Physics runs on the fixed step; the level clock on wall time.
                let elapsed = since_tick.as_secs_f32();
                let events = step::step(world, frame_input, dt, elapsed);
                process_sound_events(sound, &events);
            }
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn play(sound: Option<&SoundEngine>, sfx: Sfx) {
    if let Some(s) = sound {
        s.play(sfx);
    }
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    for event in events {
        if let Some(sfx) = Sfx::for_event(event) {
            play(sound, sfx);
        }
    }
}

/// Back to the title screen. Score of the finished run stays visible there.
fn return_to_title(world: &mut WorldState) {
    world.paused = false;
    world.phase = Phase::Title;
    world.message.clear();
    world.message_timer = 0;
    tracing::info!(score = world.score, "returned to title");
}

/// Start a new run from the first level.
fn start_new_game(world: &mut WorldState, sound: Option<&SoundEngine>, source: &LevelSource) {
    world.score = 0;
    level::load_level_or_fallback(world, source, 0);
    play(sound, Sfx::LevelStart);
}

/// Title and pause keys. Returns true when the game should quit.
fn handle_meta(
    world: &mut WorldState,
    sound: Option<&SoundEngine>,
    kb: &InputState,
    gp: &GamepadState,
    source: &LevelSource,
) -> bool {
    let back = kb.any_pressed(KEYS_BACK) || gp.cancel_pressed();

    match world.phase {
        Phase::Title => {
            if kb.any_pressed(KEYS_QUIT) || back {
                return true;
            }
            if kb.any_pressed(KEYS_START) || gp.confirm_pressed() {
                start_new_game(world, sound, source);
            }
        }
        Phase::Playing => {
            if kb.any_pressed(KEYS_PAUSE) || gp.confirm_pressed() {
                world.paused = !world.paused;
                tracing::debug!(paused = world.paused, "pause toggled");
                return false;
            }
            if back {
                return_to_title(world);
            }
        }
    }
    false
}
