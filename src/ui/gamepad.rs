/// Gamepad input tracker using gilrs.
///
/// Button mapping is loaded from config.toml via `load_button_config()`.
/// Default mapping:
///   D-pad / Left Stick    →  Movement (stick is analog past the deadzone)
///   A                     →  Jump
///   X / R1                →  Dash
///   Y                     →  Action
///   L1                    →  Freeze
///   B                     →  Swap dash module
///   Start                 →  Reset
///   Select                →  Quit

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};
use glam::Vec2;

use crate::config::GamepadConfig;
use super::input::{axis_from, Command, Levels};

const STICK_DEADZONE: f32 = 0.25;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,      // LeftTrigger
    R1,      // RightTrigger
    L2,      // LeftTrigger2
    R2,      // RightTrigger2
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
            "L1" | "LB" | "LEFTTRIGGER"  => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "L2" | "LT" | "LEFTTRIGGER2"  => Some(Btn::L2),
            "R2" | "RT" | "RIGHTTRIGGER2" => Some(Btn::R2),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South     => Some(Btn::A),
            Button::East      => Some(Btn::B),
            Button::West      => Some(Btn::X),
            Button::North     => Some(Btn::Y),
            Button::LeftTrigger  => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::LeftTrigger2  => Some(Btn::L2),
            Button::RightTrigger2 => Some(Btn::R2),
            Button::Start     => Some(Btn::Start),
            Button::Select    => Some(Btn::Select),
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

/// Action-to-button mapping (loaded from config).
#[derive(Clone, Debug, PartialEq)]
struct ActionMap {
    jump: Vec<Btn>,
    dash: Vec<Btn>,
    action: Vec<Btn>,
    freeze: Vec<Btn>,
    swap_dash: Vec<Btn>,
    reset: Vec<Btn>,
    quit: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            jump:      vec![Btn::A],
            dash:      vec![Btn::X, Btn::R1],
            action:    vec![Btn::Y],
            freeze:    vec![Btn::L1],
            swap_dash: vec![Btn::B],
            reset:     vec![Btn::Start],
            quit:      vec![Btn::Select],
        }
    }
}

impl ActionMap {
    /// Entries that name no known button keep their default.
    fn from_config(cfg: &GamepadConfig) -> Self {
        fn parse_into(slot: &mut Vec<Btn>, names: &[String]) {
            let parsed: Vec<Btn> = names.iter().filter_map(|s| Btn::from_name(s)).collect();
            if !parsed.is_empty() { *slot = parsed; }
        }
        let mut map = ActionMap::default();
        parse_into(&mut map.jump, &cfg.jump);
        parse_into(&mut map.dash, &cfg.dash);
        parse_into(&mut map.action, &cfg.action);
        parse_into(&mut map.freeze, &cfg.freeze);
        parse_into(&mut map.swap_dash, &cfg.swap_dash);
        parse_into(&mut map.reset, &cfg.reset);
        parse_into(&mut map.quit, &cfg.quit);
        map
    }
}

/// Stick value with the deadzone removed and the rest rescaled to [0, 1].
fn shape_stick(v: f32) -> f32 {
    let mag = v.abs();
    if mag <= STICK_DEADZONE {
        0.0
    } else {
        v.signum() * ((mag - STICK_DEADZONE) / (1.0 - STICK_DEADZONE)).min(1.0)
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    // All tracked buttons (indexed by Btn)
    buttons: [BtnState; 10],

    dpad_up: bool,
    dpad_down: bool,
    dpad_left: bool,
    dpad_right: bool,

    stick_x: f32,
    stick_y: f32,

    action_map: ActionMap,

    pub connected: bool,
}

fn btn_index(btn: Btn) -> usize {
    btn as usize
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
                tracing::warn!(error = %e, "gamepad support unavailable");
                (None, false)
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [BtnState::default(); 10],
            dpad_up: false,
            dpad_down: false,
            dpad_left: false,
            dpad_right: false,
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::default(),
            connected,
        }
    }

    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        self.action_map = ActionMap::from_config(cfg);
    }

    pub fn update(&mut self) {
        for b in &mut self.buttons { b.just_pressed = false; }

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
                    self.connected = true;
                    tracing::info!(id = ?event.id, "gamepad connected");
                }
                EventType::Disconnected => {
                    self.connected = false;
                    self.release_all();
                    tracing::info!(id = ?event.id, "gamepad disconnected");
                }
                _ => {}
            }
        }
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        // D-pad handled separately (not in Btn enum)
        match gilrs_btn {
            Button::DPadUp    => { self.dpad_up = held; return; }
            Button::DPadDown  => { self.dpad_down = held; return; }
            Button::DPadLeft  => { self.dpad_left = held; return; }
            Button::DPadRight => { self.dpad_right = held; return; }
            _ => {}
        }

        if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            let state = &mut self.buttons[btn_index(btn)];
            if held && !state.held { state.just_pressed = true; }
            state.held = held;
        }
    }

    // ── Action queries (config-driven) ──

    fn any_held(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[btn_index(b)].held)
    }

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[btn_index(b)].just_pressed)
    }

    /// D-pad wins over the stick when both are in use.
    pub fn axis(&self) -> Vec2 {
        let dpad = axis_from(self.dpad_left, self.dpad_right, self.dpad_up, self.dpad_down);
        if dpad != Vec2::ZERO {
            dpad
        } else {
            Vec2::new(shape_stick(self.stick_x), shape_stick(self.stick_y))
        }
    }

    pub fn levels(&self) -> Levels {
        let map = &self.action_map;
        Levels {
            axis: self.axis(),
            jump: self.any_held(&map.jump) || self.any_just_pressed(&map.jump),
            dash: self.any_held(&map.dash) || self.any_just_pressed(&map.dash),
            action: self.any_held(&map.action) || self.any_just_pressed(&map.action),
        }
    }

    pub fn commands(&self) -> Vec<Command> {
        let map = &self.action_map;
        [
            (&map.quit, Command::Quit),
            (&map.reset, Command::Reset),
            (&map.freeze, Command::Freeze),
            (&map.swap_dash, Command::SwapDash),
        ]
        .into_iter()
        .filter(|(btns, _)| self.any_just_pressed(btns))
        .map(|(_, cmd)| cmd)
        .collect()
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        for b in &mut self.buttons { *b = BtnState::default(); }
        self.dpad_up = false;
        self.dpad_down = false;
        self.dpad_left = false;
        self.dpad_right = false;
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }
}

impl Default for GamepadState {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_pad() -> GamepadState {
        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: None,
            buttons: [BtnState::default(); 10],
            dpad_up: false,
            dpad_down: false,
            dpad_left: false,
            dpad_right: false,
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::default(),
            connected: false,
        }
    }

    #[test]
    fn button_names_are_case_insensitive() {
        assert_eq!(Btn::from_name("south"), Some(Btn::A));
        assert_eq!(Btn::from_name("Rb"), Some(Btn::R1));
        assert_eq!(Btn::from_name("turbo"), None);
    }

    #[test]
    fn unknown_names_keep_defaults() {
        let cfg = GamepadConfig { jump: vec!["nope".into()], dash: vec!["B".into()], ..Default::default() };
        let map = ActionMap::from_config(&cfg);
        assert_eq!(map.jump, vec![Btn::A]);
        assert_eq!(map.dash, vec![Btn::B]);
    }

    #[test]
    fn stick_deadzone_and_rescale() {
        assert_eq!(shape_stick(0.2), 0.0);
        assert!((shape_stick(1.0) - 1.0).abs() < 1e-6);
        assert!((shape_stick(-0.625) + 0.5).abs() < 1e-6);
    }

    #[test]
    fn dpad_overrides_stick() {
        let mut pad = idle_pad();
        pad.stick_x = 1.0;
        assert!((pad.axis().x - 1.0).abs() < 1e-6);
        pad.dpad_left = true;
        assert_eq!(pad.axis(), Vec2::NEG_X);
    }

    #[test]
    fn mapped_buttons_drive_levels_and_commands() {
        let mut pad = idle_pad();
        pad.buttons[btn_index(Btn::R1)] = BtnState { held: true, just_pressed: false };
        pad.buttons[btn_index(Btn::Start)] = BtnState { held: true, just_pressed: true };
        let levels = pad.levels();
        assert!(levels.dash && !levels.jump);
        assert_eq!(pad.commands(), vec![Command::Reset]);
    }
}
