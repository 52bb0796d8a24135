/// Entry point and playground loop.

use std::collections::VecDeque;
use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use platformer_motor::config::{AppConfig, DashKind};
use platformer_motor::domain::events::ControllerEvent;
use platformer_motor::domain::state::MotorState;
use platformer_motor::sim::event::SceneEvent;
use platformer_motor::sim::level::{builtin_level, load_level_file, LevelDef};
use platformer_motor::sim::step::{self, FixedTimestep};
use platformer_motor::sim::world::{CharacterTemplate, Scene};
use platformer_motor::ui::gamepad::GamepadState;
use platformer_motor::ui::input::{Command, InputLatch, KeyboardInput};
use platformer_motor::ui::renderer::{HudInfo, Renderer};
use platformer_motor::ui::sound::{cue_for, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);
const MESSAGE_TIME: Duration = Duration::from_secs(2);
const RECENT_EVENTS: usize = 6;

fn main() {
    let config = AppConfig::load();

    if let Err(e) = init_logging(&config) {
        eprintln!("Logging disabled: {e}");
    }
    info!(tick_rate = config.sim.tick_rate_hz, dash = dash_label(config.dash.kind), "config ready");

    let level = match load_level(&config) {
        Ok(level) => level,
        Err(e) => {
            error!(error = %e, "no playable level");
            eprintln!("Level error: {e}");
            return;
        }
    };

    let mut session = Session::new(level, &config);
    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();

    let result = run_loop(&mut session, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        error!(error = %e, "playground stopped");
        eprintln!("Error: {e}");
    }

    info!(ticks = session.scene.tick, "bye");
}

/// Logs go to a file; stdout belongs to the renderer.
/// `RUST_LOG` overrides the default `info` level.
fn init_logging(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::create(&config.general.log_file)?;
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(filter)
        .init();
    Ok(())
}

/// The configured level file, falling back to the built-in level when it
/// is missing or broken.
fn load_level(config: &AppConfig) -> Result<LevelDef, Box<dyn std::error::Error>> {
    if let Some(path) = config.level_path() {
        match load_level_file(&path) {
            Ok(level) => {
                info!(path = %path.display(), level = %level.name, "level loaded");
                return Ok(level);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "level file rejected, using built-in level"),
        }
    }
    Ok(builtin_level()?)
}

// ══════════════════════════════════════════════════════════════
// Session: everything the loop owns besides the terminal
// ══════════════════════════════════════════════════════════════

struct Session {
    level: LevelDef,
    scene: Scene,
    timestep: FixedTimestep,
    latch: InputLatch,
    dash_kind: DashKind,
    paused: bool,
    hud: HudInfo,
    recent: VecDeque<String>,
    message_until: Option<Instant>,
    /// The camera should jump to the player on the next frame.
    recenter: bool,
}

impl Session {
    fn new(level: LevelDef, config: &AppConfig) -> Self {
        let scene = Scene::from_level(&level, CharacterTemplate::from_config(config));
        Session {
            level,
            scene,
            timestep: FixedTimestep::new(config.time_step(), config.sim.max_catch_up_steps),
            latch: InputLatch::default(),
            dash_kind: config.dash.kind,
            paused: false,
            hud: HudInfo { show_hud: true, dash_name: dash_label(config.dash.kind).into(), ..Default::default() },
            recent: VecDeque::with_capacity(RECENT_EVENTS),
            message_until: None,
            recenter: true,
        }
    }

    fn set_message(&mut self, text: impl Into<String>) {
        self.hud.message = text.into();
        self.message_until = Some(Instant::now() + MESSAGE_TIME);
    }

    fn tick_message(&mut self) {
        if self.message_until.is_some_and(|t| Instant::now() >= t) {
            self.hud.message.clear();
            self.message_until = None;
        }
    }

    /// Returns true when the loop should stop.
    fn handle_command(&mut self, cmd: Command, config: &AppConfig) -> bool {
        match cmd {
            Command::Quit => return true,
            Command::Pause => {
                self.paused = !self.paused;
                self.timestep.reset();
                self.latch.clear();
                info!(paused = self.paused, "pause toggled");
            }
            Command::Reset => {
                let template = self.scene.template().clone();
                self.scene = Scene::from_level(&self.level, template);
                self.timestep.reset();
                self.latch.clear();
                self.recent.clear();
                self.hud.recent.clear();
                self.recenter = true;
                self.set_message("Level reset");
            }
            Command::Freeze => {
                if let Some(p) = self.scene.player_mut() {
                    let freeze = p.state() != MotorState::Frozen;
                    p.set_frozen(freeze);
                    self.set_message(if freeze { "Frozen" } else { "Unfrozen" });
                }
            }
            Command::SwapDash => {
                let (module, kind) = if self.dash_kind == config.dash.kind {
                    (config.alternate_dash_module(), alternate_kind(config.dash.kind))
                } else {
                    (config.dash_module(), config.dash.kind)
                };
                self.scene.set_dash_module(module);
                self.dash_kind = kind;
                self.hud.dash_name = dash_label(kind).into();
                self.set_message(format!("Dash module: {}", dash_label(kind)));
                info!(dash = dash_label(kind), "dash module swapped");
            }
            Command::ToggleHud => self.hud.show_hud = !self.hud.show_hud,
        }
        false
    }

    fn absorb(&mut self, events: &[SceneEvent], sound: Option<&SoundEngine>) {
        for event in events {
            if let (Some(sfx), Some(cue)) = (sound, cue_for(event)) {
                sfx.play(cue);
            }
            if let SceneEvent::Respawned { body: 0 } = event {
                self.recenter = true;
                self.set_message("Fell out, respawned");
            }
            if let Some(text) = describe(event) {
                if self.recent.len() == RECENT_EVENTS {
                    self.recent.pop_front();
                }
                self.recent.push_back(text);
            }
        }
        self.hud.recent = self.recent.iter().cloned().collect();
    }
}

fn run_loop(
    session: &mut Session,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = KeyboardInput::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let dt = session.timestep.step();
    let mut last_frame = Instant::now();

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        let commands = kb.commands().into_iter().chain(gp.commands());
        let mut quit = false;
        for cmd in commands {
            quit |= session.handle_command(cmd, config);
        }
        if quit {
            break;
        }

        session.latch.push(kb.levels().merge(gp.levels()));

        let now = Instant::now();
        let elapsed = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;

        if !session.paused {
            let steps = session.timestep.advance(elapsed);
            for _ in 0..steps {
                let input = session.latch.take();
                let events = step::step(&mut session.scene, &[input], dt);
                session.absorb(&events, sound);
            }
        }

        session.tick_message();
        session.hud.paused = session.paused;
        if std::mem::take(&mut session.recenter) {
            renderer.recenter();
        }
        renderer.render(&session.scene, &session.hud)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn dash_label(kind: DashKind) -> &'static str {
    match kind {
        DashKind::Basic => "basic",
        DashKind::Teleport => "teleport",
        DashKind::None => "none",
    }
}

fn alternate_kind(kind: DashKind) -> DashKind {
    match kind {
        DashKind::Teleport => DashKind::Basic,
        DashKind::Basic | DashKind::None => DashKind::Teleport,
    }
}

/// Short text for the HUD event log; per-step progress is left out.
fn describe(event: &SceneEvent) -> Option<String> {
    let text = match *event {
        SceneEvent::Character { body: 0, event } => match event {
            ControllerEvent::StateChanged { to, .. } => format!("→{}", to.name()),
            ControllerEvent::NormalJump => "jump".into(),
            ControllerEvent::AirJump => "air jump".into(),
            ControllerEvent::WallJump(v) => format!("wall jump ({:+.0},{:+.0})", v.x, v.y),
            ControllerEvent::LadderJump => "ladder jump".into(),
            ControllerEvent::LedgeJump => "ledge jump".into(),
            ControllerEvent::Landed => "landed".into(),
            ControllerEvent::DashStart(_) => "dash".into(),
            ControllerEvent::ActionStart(_) => "action".into(),
            ControllerEvent::LedgeGrabStart(_) => "grab".into(),
            _ => return None,
        },
        SceneEvent::LadderEntered { body: 0, ladder } => format!("ladder {ladder} in"),
        SceneEvent::LadderExited { body: 0, ladder } => format!("ladder {ladder} out"),
        SceneEvent::Respawned { body: 0 } => "respawn".into(),
        _ => return None,
    };
    Some(text)
}
