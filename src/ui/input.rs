/// Keyboard tracker and the bridge from held levels to `FrameInput`.
///
/// Terminals rarely report key releases, so a key counts as held until
/// `HOLD_TIMEOUT` passes without a Press/Repeat event. Release events are
/// honored only when keyboard enhancement is confirmed.
///
/// Rendering runs faster or slower than the fixed simulation step, so edge
/// signals go through `InputLatch`: a tap seen between two steps is
/// delivered to exactly one step.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use glam::Vec2;

use crate::domain::input::{ButtonState, ButtonTracker, FrameInput};

/// After this duration without a Press/Repeat event, consider the key released.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

// ── Key Constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_JUMP: &[KeyCode] = &[KeyCode::Char(' '), KeyCode::Char('k'), KeyCode::Char('K')];
const KEYS_DASH: &[KeyCode] = &[KeyCode::Char('x'), KeyCode::Char('X'), KeyCode::Char('j'), KeyCode::Char('J')];
const KEYS_ACTION: &[KeyCode] = &[KeyCode::Char('c'), KeyCode::Char('C'), KeyCode::Char('l'), KeyCode::Char('L')];

/// One-shot requests handled outside the simulation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    Quit,
    Reset,
    Pause,
    Freeze,
    SwapDash,
    ToggleHud,
}

impl Command {
    pub fn from_key(code: KeyCode) -> Option<Command> {
        match code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => Some(Command::Quit),
            KeyCode::Char('r') | KeyCode::Char('R') => Some(Command::Reset),
            KeyCode::Char('p') | KeyCode::Char('P') | KeyCode::F(1) => Some(Command::Pause),
            KeyCode::Char('f') | KeyCode::Char('F') => Some(Command::Freeze),
            KeyCode::Char('t') | KeyCode::Char('T') => Some(Command::SwapDash),
            KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::F(2) => Some(Command::ToggleHud),
            _ => None,
        }
    }
}

/// Held levels from one device, before edge detection.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Levels {
    pub axis: Vec2,
    pub jump: bool,
    pub dash: bool,
    pub action: bool,
}

impl Levels {
    /// Combine two devices: axes add (then clamp), buttons OR.
    pub fn merge(self, other: Levels) -> Levels {
        Levels {
            axis: (self.axis + other.axis).clamp(Vec2::NEG_ONE, Vec2::ONE),
            jump: self.jump || other.jump,
            dash: self.dash || other.dash,
            action: self.action || other.action,
        }
    }
}

/// Digital directions to an axis; opposite keys cancel.
pub fn axis_from(left: bool, right: bool, up: bool, down: bool) -> Vec2 {
    let x = right as i32 - left as i32;
    let y = up as i32 - down as i32;
    Vec2::new(x as f32, y as f32)
}

pub struct KeyboardInput {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from "not held" to "held" during the last drain.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for meta-key handling.
    raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events.
    pub honor_release: bool,
}

impl KeyboardInput {
    pub fn new() -> Self {
        KeyboardInput {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events. Call once per rendered frame.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.raw_events.push(key);
                match key.kind {
                    KeyEventKind::Release if self.honor_release => {
                        self.last_active.remove(&key.code);
                    }
                    KeyEventKind::Release => {}
                    _ => {
                        let was_held = self.is_held(key.code);
                        self.last_active.insert(key.code, Instant::now());
                        if !was_held {
                            self.fresh_presses.push(key.code);
                        }
                    }
                }
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active.get(&code).is_some_and(|t| t.elapsed() < HOLD_TIMEOUT)
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// A key pressed and expired within one drain still counts this frame.
    fn active(&self, codes: &[KeyCode]) -> bool {
        self.any_held(codes) || self.any_pressed(codes)
    }

    pub fn levels(&self) -> Levels {
        Levels {
            axis: axis_from(
                self.active(KEYS_LEFT),
                self.active(KEYS_RIGHT),
                self.active(KEYS_UP),
                self.active(KEYS_DOWN),
            ),
            jump: self.active(KEYS_JUMP),
            dash: self.active(KEYS_DASH),
            action: self.active(KEYS_ACTION),
        }
    }

    pub fn commands(&self) -> Vec<Command> {
        self.fresh_presses.iter().filter_map(|c| Command::from_key(*c)).collect()
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}

impl Default for KeyboardInput {
    fn default() -> Self { Self::new() }
}

// ══════════════════════════════════════════════════════════════
// Frame latch
// ══════════════════════════════════════════════════════════════

/// Edge detection for the three buttons plus a pending-edge store that
/// survives frames in which no simulation step runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct InputLatch {
    jump: ButtonTracker,
    dash: ButtonTracker,
    action: ButtonTracker,
    pending: FrameInput,
}

fn latch_button(pending: &mut ButtonState, now: ButtonState) {
    pending.pressed |= now.pressed;
    pending.released |= now.released;
    pending.held = now.held;
}

impl InputLatch {
    /// Record this frame's levels.
    pub fn push(&mut self, levels: Levels) {
        let p = &mut self.pending;
        p.axis = levels.axis;
        latch_button(&mut p.jump, self.jump.update(levels.jump));
        latch_button(&mut p.dash, self.dash.update(levels.dash));
        latch_button(&mut p.action, self.action.update(levels.action));
    }

    /// Input for the next simulation step. Edges are handed out once.
    pub fn take(&mut self) -> FrameInput {
        let out = self.pending;
        for b in [&mut self.pending.jump, &mut self.pending.dash, &mut self.pending.action] {
            b.pressed = false;
            b.released = false;
        }
        out
    }

    /// Forget held levels and pending edges (reset, unpause).
    pub fn clear(&mut self) {
        *self = InputLatch::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jump_only() -> Levels {
        Levels { jump: true, ..Default::default() }
    }

    #[test]
    fn opposite_directions_cancel() {
        assert_eq!(axis_from(true, true, false, false), Vec2::ZERO);
        assert_eq!(axis_from(false, true, false, true), Vec2::new(1.0, -1.0));
    }

    #[test]
    fn merge_clamps_axis_and_ors_buttons() {
        let a = Levels { axis: Vec2::X, jump: true, ..Default::default() };
        let b = Levels { axis: Vec2::new(0.7, -0.5), dash: true, ..Default::default() };
        let m = a.merge(b);
        assert_eq!(m.axis, Vec2::new(1.0, -0.5));
        assert!(m.jump && m.dash && !m.action);
    }

    #[test]
    fn tap_reaches_exactly_one_step() {
        let mut latch = InputLatch::default();
        latch.push(jump_only());
        assert_eq!(latch.take().jump, ButtonState::tap());
        assert_eq!(latch.take().jump, ButtonState::hold());
    }

    #[test]
    fn tap_survives_frames_without_steps() {
        let mut latch = InputLatch::default();
        latch.push(jump_only());
        latch.push(Levels::default());
        let f = latch.take();
        assert!(f.jump.pressed && f.jump.released && !f.jump.held);
        assert_eq!(latch.take().jump, ButtonState::IDLE);
    }

    #[test]
    fn axis_follows_latest_frame() {
        let mut latch = InputLatch::default();
        latch.push(Levels { axis: Vec2::X, ..Default::default() });
        latch.push(Levels { axis: Vec2::NEG_X, ..Default::default() });
        assert_eq!(latch.take().axis, Vec2::NEG_X);
    }

    #[test]
    fn clear_drops_pending_edges() {
        let mut latch = InputLatch::default();
        latch.push(jump_only());
        latch.clear();
        assert_eq!(latch.take(), FrameInput::default());
    }

    #[test]
    fn meta_keys_map_to_commands() {
        assert_eq!(Command::from_key(KeyCode::Esc), Some(Command::Quit));
        assert_eq!(Command::from_key(KeyCode::Char('T')), Some(Command::SwapDash));
        assert_eq!(Command::from_key(KeyCode::Char(' ')), None);
    }
}
