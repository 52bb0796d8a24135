/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// One world unit is `CELL_W` terminal columns by one row. Cells are
/// shaded by sampling the scene at their center, so ramps and bodies that
/// sit between grid lines still draw sensibly.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use glam::Vec2;

use crate::domain::collider::Shape;
use crate::domain::query::LayerMask;
use crate::domain::state::{Facing, MotorState};
use crate::sim::world::Scene;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells. Using the
    /// same RGB for `Clear` and every cell hides inter-row gaps on VTE.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }
}

// ── Camera ──

/// Terminal columns per world unit.
const CELL_W: usize = 2;

/// Vertical offsets
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
/// Rows below the map: message line and key help.
const FOOTER_ROWS: usize = 2;

/// Viewport into the level, in world units. `origin` is the bottom-left.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Camera {
    pub origin: Vec2,
    pub view_w: usize,
    pub view_h: usize,
}

impl Camera {
    /// Keep `target` inside the middle third of the view, clamped to the level.
    pub fn follow(&mut self, target: Vec2, level_w: usize, level_h: usize) {
        let view = Vec2::new(self.view_w as f32, self.view_h as f32);
        let margin = view / 3.0;
        let lo = self.origin + margin;
        let hi = self.origin + view - margin;
        let shift = Vec2::new(
            excess(target.x, lo.x, hi.x),
            excess(target.y, lo.y, hi.y),
        );
        self.origin += shift;
        self.clamp(level_w, level_h);
    }

    pub fn center_on(&mut self, target: Vec2, level_w: usize, level_h: usize) {
        self.origin = target - Vec2::new(self.view_w as f32, self.view_h as f32) * 0.5;
        self.clamp(level_w, level_h);
    }

    /// Levels smaller than the view are pinned to the origin.
    fn clamp(&mut self, level_w: usize, level_h: usize) {
        let max_x = (level_w as f32 - self.view_w as f32).max(0.0);
        let max_y = (level_h as f32 - self.view_h as f32).max(0.0);
        self.origin.x = self.origin.x.clamp(0.0, max_x).round();
        self.origin.y = self.origin.y.clamp(0.0, max_y).round();
    }

    /// World-space center of map cell (col, row); row 0 is the top.
    fn cell_center(&self, col: usize, row: usize) -> Vec2 {
        Vec2::new(
            self.origin.x + col as f32 + 0.5,
            self.origin.y + (self.view_h - 1 - row) as f32 + 0.5,
        )
    }

    /// Map cell holding world point `p`, if visible.
    pub fn cell_of(&self, p: Vec2) -> Option<(usize, usize)> {
        let local = p - self.origin;
        if local.x < 0.0 || local.y < 0.0 { return None; }
        let col = local.x.floor() as usize;
        let from_bottom = local.y.floor() as usize;
        if col >= self.view_w || from_bottom >= self.view_h { return None; }
        Some((col, self.view_h - 1 - from_bottom))
    }
}

/// How far `v` lies outside `[lo, hi]`, signed.
fn excess(v: f32, lo: f32, hi: f32) -> f32 {
    if v < lo { v - lo } else if v > hi { v - hi } else { 0.0 }
}

// ── HUD input ──

/// Session state the scene does not know about.
#[derive(Clone, Debug, Default)]
pub struct HudInfo {
    pub paused: bool,
    pub show_hud: bool,
    pub dash_name: String,
    pub message: String,
    /// Recent player events, newest last.
    pub recent: Vec<String>,
}

// ── Palette ──

const SOLID_FG: Color = Color::Rgb { r: 120, g: 110, b: 150 };
const ONE_WAY_FG: Color = Color::Rgb { r: 210, g: 170, b: 90 };
const PLATFORM_FG: Color = Color::Rgb { r: 90, g: 200, b: 220 };
const LADDER_FG: Color = Color::Rgb { r: 170, g: 120, b: 60 };
const RESTRICT_BG: Color = Color::Rgb { r: 40, g: 30, b: 30 };
const HUD_FG: Color = Color::Rgb { r: 200, g: 200, b: 220 };
const DIM_FG: Color = Color::Rgb { r: 110, g: 110, b: 130 };

fn state_color(state: MotorState) -> Color {
    match state {
        MotorState::OnGround => Color::White,
        MotorState::Jumping => Color::Rgb { r: 120, g: 230, b: 120 },
        MotorState::Falling => Color::Rgb { r: 230, g: 200, b: 90 },
        MotorState::WallSliding => Color::Rgb { r: 240, g: 140, b: 60 },
        MotorState::Dashing => Color::Rgb { r: 90, g: 210, b: 255 },
        MotorState::OnLadder => Color::Rgb { r: 220, g: 170, b: 110 },
        MotorState::Frozen => Color::Rgb { r: 140, g: 160, b: 255 },
        MotorState::OnLedge => Color::Rgb { r: 255, g: 110, b: 160 },
        MotorState::CustomAction => Color::Rgb { r: 200, g: 120, b: 255 },
    }
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    camera: Camera,
    /// Level the camera was last placed in; a new level recenters it.
    camera_level: Option<String>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            camera: Camera::default(),
            camera_level: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Force the camera to recenter on the next frame (after respawn/reset).
    pub fn recenter(&mut self) {
        self.camera_level = None;
    }

    pub fn render(&mut self, scene: &Scene, hud: &HudInfo) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        fit_camera(&mut self.camera, self.term_w, self.term_h, scene);
        if let Some(b) = scene.body_bounds(0) {
            if self.camera_level.as_deref() == Some(scene.name.as_str()) {
                self.camera.follow(b.center, scene.width, scene.height);
            } else {
                self.camera.center_on(b.center, scene.width, scene.height);
                self.camera_level = Some(scene.name.clone());
            }
        }

        self.front.clear();
        compose(&mut self.front, &self.camera, scene, hud);

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;

        // Explicit base colors; ResetColor would fall back to the terminal default.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            let mut need_move = true;
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
            }
        }

        self.writer.flush()
    }
}

impl Default for Renderer {
    fn default() -> Self { Self::new() }
}

/// Size the viewport from the terminal, capped to the level.
fn fit_camera(camera: &mut Camera, term_w: usize, term_h: usize, scene: &Scene) {
    let reserved = MAP_ROW + FOOTER_ROWS;
    camera.view_w = (term_w / CELL_W).min(scene.width).max(1);
    camera.view_h = term_h.saturating_sub(reserved).min(scene.height).max(1);
}

// ══════════════════════════════════════════════════════════════
// Compose: build front buffer content
// ══════════════════════════════════════════════════════════════

fn compose(buf: &mut FrameBuffer, cam: &Camera, scene: &Scene, hud: &HudInfo) {
    compose_hud(buf, scene, hud);

    for row in 0..cam.view_h {
        for col in 0..cam.view_w {
            let cell = sample_world(scene, cam.cell_center(col, row));
            for k in 0..CELL_W {
                buf.set(col * CELL_W + k, MAP_ROW + row, cell);
            }
        }
    }

    compose_bodies(buf, cam, scene);
    compose_footer(buf, cam, hud);
}

/// What is drawn at a single world point, ignoring character bodies.
fn sample_world(scene: &Scene, p: Vec2) -> Cell {
    let restricted = scene.ladders.iter().any(|l| l.restrict.is_some_and(|r| r.bounds.contains(p)));
    let bg = if restricted { RESTRICT_BG } else { Cell::BASE_BG };

    for (_, c) in scene.colliders.iter() {
        if !c.enabled || c.layer.intersects(LayerMask::CHARACTER) { continue; }
        if !c.bounds.contains(p) { continue; }
        if c.layer.intersects(LayerMask::PLATFORM) {
            return Cell::new(if c.one_way { '▔' } else { '▓' }, PLATFORM_FG, bg);
        }
        match c.shape {
            Shape::Ramp(_) => {
                if c.surface_height(p.x).is_some_and(|top| p.y <= top) {
                    return Cell::new('▒', SOLID_FG, bg);
                }
            }
            Shape::Box if c.one_way => return Cell::new('▀', ONE_WAY_FG, bg),
            Shape::Box => return Cell::new('█', SOLID_FG, bg),
        }
    }

    if scene.ladders.iter().any(|l| l.bounds.contains(p)) {
        return Cell::new('╫', LADDER_FG, bg);
    }
    Cell::new(' ', Color::White, bg)
}

fn compose_bodies(buf: &mut FrameBuffer, cam: &Camera, scene: &Scene) {
    for (body, c) in scene.characters.iter().enumerate() {
        let Some(b) = scene.body_bounds(body) else { continue };
        let Some((col, row)) = cam.cell_of(b.center) else { continue };
        let fg = state_color(c.state());
        let glyphs = match c.facing() {
            Facing::Left => ['◀', '█'],
            Facing::Right => ['█', '▶'],
        };
        let bg = buf.get(col * CELL_W, MAP_ROW + row).bg;
        for (k, ch) in glyphs.into_iter().enumerate() {
            buf.set(col * CELL_W + k, MAP_ROW + row, Cell::new(ch, fg, bg));
        }
    }
}

fn compose_hud(buf: &mut FrameBuffer, scene: &Scene, hud: &HudInfo) {
    let title = format!(" {}  t={} ", scene.name, scene.tick);
    buf.put_str(0, HUD_ROW, &title, HUD_FG, Cell::BASE_BG);

    let Some(p) = scene.player() else { return };
    if !hud.show_hud {
        buf.put_str(title.chars().count(), HUD_ROW, p.state().name(), state_color(p.state()), Cell::BASE_BG);
        return;
    }

    let col = p.collisions();
    let flag = |on: bool, c: char| if on { c } else { '·' };
    let flags: String = [
        flag(col.below, 'B'),
        flag(col.above, 'A'),
        flag(col.left, 'L'),
        flag(col.right, 'R'),
        flag(col.climbing_slope, '/'),
        flag(col.descending_slope, '\\'),
    ]
    .into_iter()
    .collect();

    let v = p.velocity();
    let facing = match p.facing() { Facing::Left => '<', Facing::Right => '>' };
    let line = format!(
        "{:<12} v=({:+6.2},{:+6.2}) {} [{}] air:{} dash:{} ",
        p.state().name(), v.x, v.y, facing, flags, p.air_jump_counter(), hud.dash_name,
    );
    let x = title.chars().count();
    buf.put_str(x, HUD_ROW, &line, HUD_FG, Cell::BASE_BG);
    buf.put_str(x, HUD_ROW, p.state().name(), state_color(p.state()), Cell::BASE_BG);

    let progress = match p.state() {
        MotorState::Dashing => Some(p.dash_progress()),
        MotorState::CustomAction => Some(p.action_progress()),
        _ => None,
    };
    if let Some(t) = progress {
        let filled = (t.clamp(0.0, 1.0) * 10.0).round() as usize;
        let bar: String = (0..10).map(|i| if i < filled { '■' } else { '□' }).collect();
        buf.put_str(x + line.chars().count(), HUD_ROW, &bar, state_color(p.state()), Cell::BASE_BG);
    }

    if !hud.recent.is_empty() {
        let log = hud.recent.join("  ");
        buf.put_str(1, HUD_ROW + 1, &log, DIM_FG, Cell::BASE_BG);
    }
}

fn compose_footer(buf: &mut FrameBuffer, cam: &Camera, hud: &HudInfo) {
    let row = MAP_ROW + cam.view_h;
    let msg = if hud.paused { "PAUSED  [P] Resume" } else { hud.message.as_str() };
    if !msg.is_empty() {
        buf.put_str(1, row, msg, Color::Yellow, Cell::BASE_BG);
    }
    buf.put_str(
        1,
        row + 1,
        "←→↑↓ move  Space jump  X dash  C action  F freeze  T swap dash  H hud  R reset  P pause  Q quit",
        DIM_FG,
        Cell::BASE_BG,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::sim::level::parse_level;
    use crate::sim::world::CharacterTemplate;

    fn scene(text: &str) -> Scene {
        Scene::from_level(&parse_level(text).unwrap(), CharacterTemplate::from_config(&AppConfig::default()))
    }

    fn camera(w: usize, h: usize) -> Camera {
        Camera { origin: Vec2::ZERO, view_w: w, view_h: h }
    }

    #[test]
    fn camera_moves_only_outside_dead_zone() {
        let mut cam = camera(30, 12);
        cam.follow(Vec2::new(15.0, 6.0), 100, 40);
        assert_eq!(cam.origin, Vec2::ZERO);
        cam.follow(Vec2::new(30.0, 6.0), 100, 40);
        assert_eq!(cam.origin.x, 10.0);
    }

    #[test]
    fn camera_clamps_to_level() {
        let mut cam = camera(30, 12);
        cam.center_on(Vec2::new(98.0, -5.0), 100, 40);
        assert_eq!(cam.origin, Vec2::new(70.0, 0.0));
        cam.center_on(Vec2::new(5.0, 5.0), 10, 5);
        assert_eq!(cam.origin, Vec2::ZERO);
    }

    #[test]
    fn cell_mapping_flips_y() {
        let cam = camera(10, 5);
        assert_eq!(cam.cell_of(Vec2::new(0.5, 0.5)), Some((0, 4)));
        assert_eq!(cam.cell_of(Vec2::new(3.2, 4.9)), Some((3, 0)));
        assert_eq!(cam.cell_of(Vec2::new(10.5, 1.0)), None);
        assert_eq!(cam.cell_center(3, 0), Vec2::new(3.5, 4.5));
    }

    #[test]
    fn compose_draws_ground_ladder_and_player() {
        let s = scene("....\n.PH.\n####");
        let cam = camera(s.width, s.height);
        let mut buf = FrameBuffer::new(cam.view_w * CELL_W, MAP_ROW + cam.view_h + FOOTER_ROWS);
        compose(&mut buf, &cam, &s, &HudInfo { show_hud: true, ..Default::default() });

        let ground = MAP_ROW + 2;
        assert_eq!(buf.get(0, ground).ch, '█');
        assert_eq!(buf.get(2 * CELL_W, MAP_ROW + 1).ch, '╫');

        // Player faces right by default.
        assert_eq!(buf.get(CELL_W, MAP_ROW + 1).ch, '█');
        assert_eq!(buf.get(CELL_W + 1, MAP_ROW + 1).ch, '▶');
        assert_eq!(buf.get(CELL_W, MAP_ROW + 1).fg, state_color(MotorState::OnGround));
    }

    #[test]
    fn paused_banner_replaces_message() {
        let s = scene("P.\n##");
        let cam = camera(s.width, s.height);
        let mut buf = FrameBuffer::new(40, MAP_ROW + cam.view_h + FOOTER_ROWS);
        let hud = HudInfo { paused: true, message: "hello".into(), ..Default::default() };
        compose(&mut buf, &cam, &s, &hud);
        let row = MAP_ROW + cam.view_h;
        let text: String = (1..7).map(|x| buf.get(x, row).ch).collect();
        assert_eq!(text, "PAUSED");
    }
}
