/// Gamepad input tracker using gilrs.
///
/// Button mapping is loaded from config.toml via `load_button_config()`.
/// Default mapping:
///   D-pad / Left Stick    →  Move left / right (up also jumps)
///   A                     →  Jump / Continue
///   X / R1                →  Fire
///   Y                     →  Change skin
///   Start                 →  Confirm / Pause
///   Select                →  Back to title

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

const BUTTON_COUNT: usize = 10;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,
    R1,
    L2,
    R2,
    Start,
    Select,
}

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" => Some(Btn::L1),
            "R1" | "RB" => Some(Btn::R1),
            "L2" | "LT" => Some(Btn::L2),
            "R2" | "RT" => Some(Btn::R2),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South => Some(Btn::A),
            Button::East  => Some(Btn::B),
            Button::West  => Some(Btn::X),
            Button::North => Some(Btn::Y),
            Button::LeftTrigger   => Some(Btn::L1),
            Button::RightTrigger  => Some(Btn::R1),
            Button::LeftTrigger2  => Some(Btn::L2),
            Button::RightTrigger2 => Some(Btn::R2),
            Button::Start  => Some(Btn::Start),
            Button::Select => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Per-button state: held (continuous) and just_pressed (edge).
#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
}

impl BtnState {
    fn set(&mut self, held: bool) {
        if held && !self.held { self.just_pressed = true; }
        self.held = held;
    }
}

/// Directions the game cares about. Down has no use in a platformer.
#[derive(Clone, Copy, Debug)]
enum Dir {
    Up = 0,
    Left = 1,
    Right = 2,
}

/// Action-to-button mapping (loaded from config).
struct ActionMap {
    jump: Vec<Btn>,
    fire: Vec<Btn>,
    skin: Vec<Btn>,
    confirm: Vec<Btn>,
    cancel: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            jump:    vec![Btn::A],
            fire:    vec![Btn::X, Btn::R1],
            skin:    vec![Btn::Y],
            confirm: vec![Btn::Start],
            cancel:  vec![Btn::Select],
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    buttons: [BtnState; BUTTON_COUNT],
    dpad: [BtnState; 3],
    stick: [BtnState; 3],
    stick_x: f32,
    stick_y: f32,

    action_map: ActionMap,

    pub connected: bool,
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = match Gilrs::new() {
            Ok(g) => {
                let has_pad = g.gamepads().next().is_some();
                (Some(g), has_pad)
            }
            Err(e) => {
                tracing::warn!("gamepad support unavailable: {e}");
                (None, false)
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [BtnState::default(); BUTTON_COUNT],
            dpad: [BtnState::default(); 3],
            stick: [BtnState::default(); 3],
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::default(),
            connected,
        }
    }

    /// Load button mapping from config. Lists with no valid names keep the default.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        fn apply(target: &mut Vec<Btn>, names: &[String]) {
            let parsed: Vec<Btn> = names.iter().filter_map(|s| Btn::from_name(s)).collect();
            if parsed.is_empty() {
                tracing::warn!(?names, "no valid gamepad buttons in mapping, keeping default");
            } else {
                *target = parsed;
            }
        }
        let map = &mut self.action_map;
        apply(&mut map.jump, &cfg.jump);
        apply(&mut map.fire, &cfg.fire);
        apply(&mut map.skin, &cfg.skin);
        apply(&mut map.confirm, &cfg.confirm);
        apply(&mut map.cancel, &cfg.cancel);
    }

    pub fn update(&mut self) {
        self.clear_just_pressed();

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, true);
                }
                EventType::ButtonReleased(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, false);
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    match axis {
                        Axis::LeftStickX => self.stick_x = value,
                        Axis::LeftStickY => self.stick_y = value,
                        _ => {}
                    }
                }
                EventType::Connected => {
                    tracing::info!("gamepad connected");
                    self.connected = true;
                }
                EventType::Disconnected => {
                    tracing::info!("gamepad disconnected");
                    self.connected = false;
                    self.release_all();
                }
                _ => {}
            }
        }

        self.stick[Dir::Left as usize].set(self.stick_x < -STICK_DEADZONE);
        self.stick[Dir::Right as usize].set(self.stick_x > STICK_DEADZONE);
        self.stick[Dir::Up as usize].set(self.stick_y > STICK_DEADZONE);
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        let dir = match gilrs_btn {
            Button::DPadUp => Some(Dir::Up),
            Button::DPadLeft => Some(Dir::Left),
            Button::DPadRight => Some(Dir::Right),
            _ => None,
        };
        if let Some(d) = dir {
            self.dpad[d as usize].set(held);
        } else if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            self.buttons[btn as usize].set(held);
        }
    }

    // ── Action queries (config-driven) ──

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[b as usize].just_pressed)
    }

    fn any_held(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[b as usize].held)
    }

    fn dir_held(&self, d: Dir) -> bool {
        self.dpad[d as usize].held || self.stick[d as usize].held
    }

    pub fn jump_held(&self) -> bool {
        self.any_held(&self.action_map.jump) || self.dir_held(Dir::Up)
    }
    pub fn jump_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.jump)
            || self.dpad[Dir::Up as usize].just_pressed
            || self.stick[Dir::Up as usize].just_pressed
    }
    pub fn fire_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.fire)
    }
    pub fn skin_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.skin)
    }
    pub fn confirm_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.confirm)
    }
    pub fn cancel_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.cancel)
    }

    pub fn left_held(&self) -> bool {
        self.dir_held(Dir::Left)
    }
    pub fn right_held(&self) -> bool {
        self.dir_held(Dir::Right)
    }

    // ── Internal ──

    fn clear_just_pressed(&mut self) {
        let all = self.buttons.iter_mut().chain(self.dpad.iter_mut()).chain(self.stick.iter_mut());
        for b in all { b.just_pressed = false; }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        self.buttons = [BtnState::default(); BUTTON_COUNT];
        self.dpad = [BtnState::default(); 3];
        self.stick = [BtnState::default(); 3];
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_names_are_case_insensitive() {
        assert_eq!(Btn::from_name("start"), Some(Btn::Start));
        assert_eq!(Btn::from_name("rb"), Some(Btn::R1));
        assert_eq!(Btn::from_name("South"), Some(Btn::A));
        assert_eq!(Btn::from_name("turbo"), None);
    }

    #[test]
    fn config_overrides_mapping() {
        let mut gp = GamepadState::new();
        let cfg = GamepadConfig {
            jump: vec!["B".into()],
            fire: vec!["nonsense".into()],
            ..GamepadConfig::default()
        };
        gp.load_button_config(&cfg);
        assert_eq!(gp.action_map.jump, vec![Btn::B]);
        assert_eq!(gp.action_map.fire, vec![Btn::X, Btn::R1]);
    }

    #[test]
    fn edge_trigger_fires_once() {
        let mut gp = GamepadState::new();
        gp.buttons[Btn::X as usize].set(true);
        assert!(gp.fire_pressed());
        gp.clear_just_pressed();
        gp.buttons[Btn::X as usize].set(true);
        assert!(!gp.fire_pressed());
        assert!(gp.buttons[Btn::X as usize].held);
    }

    #[test]
    fn dpad_up_jumps() {
        let mut gp = GamepadState::new();
        gp.dpad[Dir::Up as usize].set(true);
        assert!(gp.jump_held());
        assert!(gp.jump_pressed());
    }
}
