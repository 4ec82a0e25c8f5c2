/// Keyboard state tracker and key bindings.
///
/// Movement and jump are continuous (held), so the tracker remembers which
/// keys are down. Fire, skin change, and continue are edge-triggered and
/// only fire on the initial press.
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::{Facing, FrameInput};
use super::gamepad::GamepadState;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

pub const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
pub const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
pub const KEYS_JUMP: &[KeyCode] = &[
    KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W'), KeyCode::Char(' '),
];
pub const KEYS_FIRE: &[KeyCode] = &[
    KeyCode::Char('f'), KeyCode::Char('F'), KeyCode::Char('j'), KeyCode::Char('J'),
];
pub const KEYS_SKIN: &[KeyCode] = &[KeyCode::Char('b'), KeyCode::Char('B')];
pub const KEYS_PAUSE: &[KeyCode] = &[KeyCode::F(1)];
pub const KEYS_START: &[KeyCode] = &[KeyCode::Enter];
pub const KEYS_BACK: &[KeyCode] = &[KeyCode::Esc];
pub const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from released to held during the last `drain_events()`.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for Ctrl+C detection.
    raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before the simulation tick.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.record(key, Instant::now());
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn record(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release => {
                if self.honor_release {
                    self.last_active.remove(&key.code);
                }
            }
            _ => {
                let was_held = self.is_held(key.code);
                self.last_active.insert(key.code, now);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    /// Is this key currently held down?
    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active.get(&code)
            .map_or(false, |t| t.elapsed() < HOLD_TIMEOUT)
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}

/// Combine keyboard and gamepad into one tick's input.
///
/// Pressing both directions cancels out.
pub fn frame_input(kb: &InputState, gp: &GamepadState) -> FrameInput {
    let left = kb.any_held(KEYS_LEFT) || gp.left_held();
    let right = kb.any_held(KEYS_RIGHT) || gp.right_held();
    let movement = match (left, right) {
        (true, false) => Some(Facing::Left),
        (false, true) => Some(Facing::Right),
        _ => None,
    };

    FrameInput {
        movement,
        jump: kb.any_held(KEYS_JUMP) || gp.jump_held(),
        fire: kb.any_pressed(KEYS_FIRE) || gp.fire_pressed(),
        change_skin: kb.any_pressed(KEYS_SKIN) || gp.skin_pressed(),
    }
}

/// Edge-triggered jump, used as "continue" on the overlay.
pub fn continue_pressed(kb: &InputState, gp: &GamepadState) -> bool {
    kb.any_pressed(KEYS_JUMP) || gp.jump_pressed()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn release(code: KeyCode) -> KeyEvent {
        let mut k = KeyEvent::new(code, KeyModifiers::NONE);
        k.kind = KeyEventKind::Release;
        k
    }

    #[test]
    fn repeat_is_not_a_fresh_press() {
        let mut kb = InputState::new();
        let now = Instant::now();
        kb.record(press(KeyCode::Char('f')), now);
        assert!(kb.was_pressed(KeyCode::Char('f')));
        kb.fresh_presses.clear();
        kb.record(press(KeyCode::Char('f')), now);
        assert!(!kb.was_pressed(KeyCode::Char('f')));
        assert!(kb.is_held(KeyCode::Char('f')));
    }

    #[test]
    fn release_only_counts_when_enabled() {
        let mut kb = InputState::new();
        let now = Instant::now();
        kb.record(press(KeyCode::Left), now);
        kb.record(release(KeyCode::Left), now);
        assert!(kb.is_held(KeyCode::Left));

        kb.honor_release = true;
        kb.record(release(KeyCode::Left), now);
        assert!(!kb.is_held(KeyCode::Left));
    }

    #[test]
    fn opposite_directions_cancel() {
        let mut kb = InputState::new();
        let gp = GamepadState::new();
        let now = Instant::now();
        kb.record(press(KeyCode::Char('a')), now);
        assert_eq!(frame_input(&kb, &gp).movement, Some(Facing::Left));
        kb.record(press(KeyCode::Right), now);
        assert_eq!(frame_input(&kb, &gp).movement, None);
    }

    #[test]
    fn space_jumps_and_continues() {
        let mut kb = InputState::new();
        let gp = GamepadState::new();
        kb.record(press(KeyCode::Char(' ')), Instant::now());
        assert!(frame_input(&kb, &gp).jump);
        assert!(continue_pressed(&kb, &gp));
    }

    #[test]
    fn ctrl_c_detected() {
        let mut kb = InputState::new();
        kb.record(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), Instant::now());
        assert!(kb.ctrl_c_pressed());
    }
}
