/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Missing file or missing keys fall back to defaults; a file that fails
/// to parse or validate is reported and replaced by defaults.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::controller::{ControllerSettings, LadderSettings, MovementSettings};
use crate::domain::jump::JumpSettings;
use crate::domain::module::{ActionModule, BasicDashModule, DashModule, LeapActionModule, TeleportDashModule};
use crate::domain::motor::MotorSettings;
use crate::domain::wall::WallSettings;

const CONFIG_FILE: &str = "config.toml";
const DATA_DIR_NAME: &str = "platformer-motor";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ── Public Config Struct ──

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub sim: SimConfig,
    pub motor: MotorSettings,
    pub movement: MovementSettings,
    pub ladder: LadderSettings,
    pub jump: JumpSettings,
    pub wall: WallSettings,
    pub dash: DashConfig,
    pub action: ActionConfig,
    pub gamepad: GamepadConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// ASCII level to load; the built-in level when unset.
    pub level_file: Option<PathBuf>,
    pub log_file: PathBuf,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub tick_rate_hz: u32,
    /// Upper bound on fixed steps run for one rendered frame.
    pub max_catch_up_steps: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashKind {
    #[default]
    Basic,
    Teleport,
    None,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    pub kind: DashKind,
    pub basic: BasicDashModule,
    pub teleport: TeleportDashModule,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    #[default]
    Leap,
    None,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    pub kind: ActionKind,
    pub leap: LeapActionModule,
}

/// Button names per logical action (see `ui::gamepad::Btn::from_name`).
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GamepadConfig {
    pub jump: Vec<String>,
    pub dash: Vec<String>,
    pub action: Vec<String>,
    pub freeze: Vec<String>,
    pub swap_dash: Vec<String>,
    pub reset: Vec<String>,
    pub quit: Vec<String>,
}

// ── Defaults ──

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig { level_file: None, log_file: PathBuf::from("platformer-motor.log") }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig { tick_rate_hz: 60, max_catch_up_steps: 5 }
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for GamepadConfig {
    fn default() -> Self {
        GamepadConfig {
            jump: names(&["A"]),
            dash: names(&["X", "R1"]),
            action: names(&["Y"]),
            freeze: names(&["L1"]),
            swap_dash: names(&["B"]),
            reset: names(&["Start"]),
            quit: names(&["Select"]),
        }
    }
}

// ── Derived values ──

impl AppConfig {
    pub fn time_step(&self) -> f32 {
        1.0 / self.sim.tick_rate_hz.max(1) as f32
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            movement: self.movement,
            ladder: self.ladder,
            jump: self.jump,
            wall: self.wall,
        }
    }

    pub fn dash_module(&self) -> Option<Rc<dyn DashModule>> {
        match self.dash.kind {
            DashKind::Basic => Some(Rc::new(self.dash.basic)),
            DashKind::Teleport => Some(Rc::new(self.dash.teleport)),
            DashKind::None => None,
        }
    }

    /// The dash module the playground swaps to when toggled.
    pub fn alternate_dash_module(&self) -> Option<Rc<dyn DashModule>> {
        match self.dash.kind {
            DashKind::Teleport => Some(Rc::new(self.dash.basic)),
            DashKind::Basic | DashKind::None => Some(Rc::new(self.dash.teleport)),
        }
    }

    pub fn action_module(&self) -> Option<Rc<dyn ActionModule>> {
        match self.action.kind {
            ActionKind::Leap => Some(Rc::new(self.action.leap)),
            ActionKind::None => None,
        }
    }

    /// Resolve the configured level file against the search directories.
    pub fn level_path(&self) -> Option<PathBuf> {
        let file = self.general.level_file.as_ref()?;
        if file.is_absolute() {
            return Some(file.clone());
        }
        let found = candidate_dirs().iter().map(|d| d.join(file)).find(|p| p.is_file());
        Some(found.unwrap_or_else(|| file.clone()))
    }
}

// ── Loading ──

impl AppConfig {
    /// Load `config.toml` from the first candidate directory holding one.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) XDG data home, (4) system data directory.
    pub fn load() -> Self {
        for dir in candidate_dirs() {
            let path = dir.join(CONFIG_FILE);
            if !path.exists() { continue; }
            match Self::load_from(&path) {
                Ok(cfg) => {
                    info!(path = %path.display(), "loaded config");
                    return cfg;
                }
                Err(e) => {
                    warn!("{e}; using default settings");
                    return AppConfig::default();
                }
            }
        }
        AppConfig::default()
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: AppConfig = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        fn positive(key: &'static str, v: f32) -> Result<(), ConfigError> {
            if v > 0.0 && v.is_finite() { return Ok(()); }
            Err(ConfigError::Invalid { key, reason: format!("{v} must be > 0") })
        }

        positive("jump.time_to_apex", self.jump.time_to_apex)?;
        positive("jump.max_height", self.jump.max_height)?;
        if self.jump.min_height < 0.0 || self.jump.min_height > self.jump.max_height {
            return Err(ConfigError::Invalid {
                key: "jump.min_height",
                reason: format!("{} must lie in [0, max_height]", self.jump.min_height),
            });
        }
        if self.sim.tick_rate_hz == 0 {
            return Err(ConfigError::Invalid { key: "sim.tick_rate_hz", reason: "must be > 0".into() });
        }
        for (key, t) in [
            ("dash.basic.dash_time", self.dash.basic.dash_time),
            ("dash.teleport.dash_time", self.dash.teleport.dash_time),
        ] {
            if t < 0.0 {
                return Err(ConfigError::Invalid { key, reason: format!("{t} must be >= 0") });
            }
        }
        Ok(())
    }
}

/// Candidate directories to search: exe dir + CWD + data paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
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
        let xdg = PathBuf::from(&home).join(".local/share").join(DATA_DIR_NAME);
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    let sys = PathBuf::from("/usr/share").join(DATA_DIR_NAME);
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = AppConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.sim.tick_rate_hz, 60);
        assert!((cfg.time_step() - 1.0 / 60.0).abs() < 1e-7);
        assert_eq!(cfg.jump, JumpSettings::default());
        assert_eq!(cfg.dash.kind, DashKind::Basic);
        assert!(cfg.general.level_file.is_none());
        assert_eq!(cfg.gamepad.jump, vec!["A".to_string()]);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [jump]
            max_height = 2.0
            air_jumps_allowed = 2

            [wall]
            can_grab_ledge = true
            leap_force = [20.0, 18.0]

            [action.leap]
            displacement = [4.0, 0.5]
            "#,
        )
        .unwrap();
        assert!((cfg.jump.max_height - 2.0).abs() < 1e-6);
        assert_eq!(cfg.jump.air_jumps_allowed, 2);
        assert!((cfg.jump.time_to_apex - 0.4).abs() < 1e-6);
        assert!(cfg.wall.can_grab_ledge);
        assert_eq!(cfg.wall.leap_force, Vec2::new(20.0, 18.0));
        assert_eq!(cfg.action.leap.displacement, Vec2::new(4.0, 0.5));
        assert!((cfg.movement.speed - 8.0).abs() < 1e-6);
    }

    #[test]
    fn module_kinds_select_modules() {
        let cfg = AppConfig::from_toml_str("[dash]\nkind = \"none\"\n[action]\nkind = \"none\"").unwrap();
        assert!(cfg.dash_module().is_none());
        assert!(cfg.action_module().is_none());
        assert!(cfg.alternate_dash_module().is_some());

        let cfg = AppConfig::from_toml_str("[dash]\nkind = \"teleport\"").unwrap();
        let dash = cfg.dash_module().unwrap();
        assert!(!dash.uses_collision());
        assert!((dash.dash_time() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn rejects_invalid_values() {
        let err = AppConfig::from_toml_str("[jump]\ntime_to_apex = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "jump.time_to_apex", .. }));

        let err = AppConfig::from_toml_str("[sim]\ntick_rate_hz = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "sim.tick_rate_hz", .. }));

        let err = AppConfig::from_toml_str("[dash.basic]\ndash_time = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn reports_parse_errors() {
        let err = AppConfig::from_toml_str("[jump\nmax_height = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        let err = AppConfig::from_toml_str("[dash]\nkind = \"rocket\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn controller_settings_mirror_sections() {
        let cfg = AppConfig::from_toml_str("[ladder]\nspeed = 6.0\n[movement]\nspeed = 5.0").unwrap();
        let s = cfg.controller_settings();
        assert!((s.ladder.speed - 6.0).abs() < 1e-6);
        assert!((s.movement.speed - 5.0).abs() < 1e-6);
        assert_eq!(s.wall, WallSettings::default());
    }
}
