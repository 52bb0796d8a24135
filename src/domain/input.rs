/// Per-step input model consumed by the controllers.
///
/// Buttons carry three edge signals per step:
///   pressed   went down this step
///   held      is down this step
///   released  went up this step
///
/// Sources implement `InputSource`; the keyboard/gamepad layer, scripted
/// test input and the waypoint driver all produce `FrameInput`.

use std::collections::VecDeque;

use glam::Vec2;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ButtonState {
    pub pressed: bool,
    pub held: bool,
    pub released: bool,
}

impl ButtonState {
    pub const IDLE: ButtonState = ButtonState { pressed: false, held: false, released: false };

    /// Edge signals from the previous and current held level.
    pub fn from_levels(was_held: bool, is_held: bool) -> Self {
        ButtonState {
            pressed: is_held && !was_held,
            held: is_held,
            released: was_held && !is_held,
        }
    }

    pub fn tap() -> Self {
        ButtonState { pressed: true, held: true, released: false }
    }

    pub fn hold() -> Self {
        ButtonState { pressed: false, held: true, released: false }
    }
}

/// Turns a stream of held levels into edge signals.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ButtonTracker {
    was_held: bool,
}

impl ButtonTracker {
    pub fn update(&mut self, is_held: bool) -> ButtonState {
        let state = ButtonState::from_levels(self.was_held, is_held);
        self.was_held = is_held;
        state
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct FrameInput {
    /// Movement axis, each component in [-1, 1] for characters.
    pub axis: Vec2,
    pub jump: ButtonState,
    pub dash: ButtonState,
    pub action: ButtonState,
}

impl FrameInput {
    pub fn with_axis(axis: Vec2) -> Self {
        FrameInput { axis, ..Default::default() }
    }

    pub fn clamped(mut self) -> Self {
        self.axis = self.axis.clamp(Vec2::NEG_ONE, Vec2::ONE);
        self
    }
}

pub trait InputSource {
    /// Input for the coming step. `position` is the body's current center.
    fn poll(&mut self, position: Vec2, dt: f32) -> FrameInput;
}

/// Replays a fixed list of frames, then idles.
#[derive(Clone, Debug, Default)]
pub struct ScriptedInput {
    frames: VecDeque<FrameInput>,
}

impl ScriptedInput {
    pub fn new(frames: impl IntoIterator<Item = FrameInput>) -> Self {
        ScriptedInput { frames: frames.into_iter().collect() }
    }

    pub fn push(&mut self, frame: FrameInput) {
        self.frames.push_back(frame);
    }

    pub fn remaining(&self) -> usize { self.frames.len() }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self, _position: Vec2, _dt: f32) -> FrameInput {
        self.frames.pop_front().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_reports_edges_once() {
        let mut t = ButtonTracker::default();
        assert_eq!(t.update(true), ButtonState::tap());
        assert_eq!(t.update(true), ButtonState::hold());
        let up = t.update(false);
        assert!(up.released && !up.held && !up.pressed);
        assert_eq!(t.update(false), ButtonState::IDLE);
    }

    #[test]
    fn clamped_limits_axis() {
        let f = FrameInput::with_axis(Vec2::new(3.0, -2.0)).clamped();
        assert_eq!(f.axis, Vec2::new(1.0, -1.0));
    }

    #[test]
    fn scripted_input_idles_when_exhausted() {
        let mut s = ScriptedInput::new([FrameInput::with_axis(Vec2::X)]);
        assert_eq!(s.poll(Vec2::ZERO, 0.1).axis, Vec2::X);
        assert_eq!(s.poll(Vec2::ZERO, 0.1), FrameInput::default());
        assert_eq!(s.remaining(), 0);
    }
}
