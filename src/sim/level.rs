/// ASCII level loader.
///
/// ## Format
///   Line 1 (optional): `# Level Name`
///   Metadata lines start with `!` and may appear anywhere:
///     `!platform x y w h speed cyclic|pingpong [one-way] x1,y1 x2,y2 ...`
///         moving platform; `x y w h` is its box, the points are the
///         positions its center visits
///     `!zone top|middle|bottom x y w h`
///         volume that forces the ladder zone of characters inside it
///     `!restrict x y w h [ignore-top]`
///         restricted area of the nearest ladder
///   Every other line is a map row. Row 0 is the top of the level, one
///   glyph is one world unit, y grows upward.
///
/// ## Legend:
///   '#' = Solid              '=' = One-way platform
///   '/' = Ramp rising right  '\' = Ramp rising left
///   'H' = Ladder             'P' = Player spawn
///   '.' / ' ' = Empty
///
/// Horizontal runs of '#' and '=' become one collider each. Vertical runs
/// of 'H' become one ladder volume; a ladder ending under one-way cells
/// reaches through them and one unit above, so a character standing on
/// top is inside its top zone.

use std::path::Path;

use glam::Vec2;
use thiserror::Error;

use crate::domain::collider::RampRise;
use crate::domain::geometry::Bounds;
use crate::domain::ladder::LadderZone;
use crate::domain::waypoint::PathMode;

/// Character body size in world units.
pub const BODY_SIZE: Vec2 = Vec2::new(0.8, 0.8);

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("could not read level: {0}")]
    Io(#[from] std::io::Error),
    #[error("level has no map rows")]
    Empty,
    #[error("level has no player spawn 'P'")]
    NoSpawn,
    #[error("line {line}: second player spawn")]
    DuplicateSpawn { line: usize },
    #[error("line {line}, column {column}: unknown glyph {glyph:?}")]
    UnknownGlyph { line: usize, column: usize, glyph: char },
    #[error("line {line}: {reason}")]
    BadMetadata { line: usize, reason: String },
    #[error("line {line}: bad number {text:?}")]
    BadNumber { line: usize, text: String },
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct RestrictDef {
    pub bounds: Bounds,
    pub ignore_top: bool,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct LadderDef {
    pub bounds: Bounds,
    pub restrict: Option<RestrictDef>,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ZoneDef {
    pub zone: LadderZone,
    pub bounds: Bounds,
}

#[derive(Clone, PartialEq, Debug)]
pub struct PlatformDef {
    pub bounds: Bounds,
    pub speed: f32,
    pub mode: PathMode,
    pub one_way: bool,
    pub points: Vec<Vec2>,
}

/// Parsed level, in world coordinates.
#[derive(Clone, PartialEq, Debug)]
pub struct LevelDef {
    pub name: String,
    pub width: usize,
    pub height: usize,
    /// Minimum corner of the player's body.
    pub spawn: Vec2,
    pub solids: Vec<Bounds>,
    pub one_ways: Vec<Bounds>,
    pub ramps: Vec<(Bounds, RampRise)>,
    pub ladders: Vec<LadderDef>,
    pub zones: Vec<ZoneDef>,
    pub platforms: Vec<PlatformDef>,
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

pub fn load_level_file(path: &Path) -> Result<LevelDef, LevelError> {
    let text = std::fs::read_to_string(path)?;
    parse_level(&text)
}

pub fn builtin_level() -> Result<LevelDef, LevelError> {
    parse_level(BUILTIN_LEVEL)
}

pub fn parse_level(text: &str) -> Result<LevelDef, LevelError> {
    let mut name = String::new();
    let mut rows: Vec<(usize, &str)> = vec![];
    let mut meta: Vec<(usize, &str)> = vec![];

    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        if line.starts_with('#') && name.is_empty() && rows.is_empty() && is_name_line(line) {
            name = line[1..].trim().to_string();
        } else if let Some(rest) = line.strip_prefix('!') {
            meta.push((line_no, rest));
        } else {
            rows.push((line_no, line));
        }
    }

    while rows.first().is_some_and(|(_, r)| r.trim().is_empty()) {
        rows.remove(0);
    }
    while rows.last().is_some_and(|(_, r)| r.trim().is_empty()) {
        rows.pop();
    }
    if rows.is_empty() {
        return Err(LevelError::Empty);
    }
    if name.is_empty() {
        name = "Untitled".to_string();
    }

    let height = rows.len();
    let width = rows.iter().map(|(_, r)| r.chars().count()).max().unwrap_or(0);
    let grid = Grid::parse(&rows, width)?;

    let mut def = LevelDef {
        name,
        width,
        height,
        spawn: Vec2::ZERO,
        solids: grid.runs(Glyph::Solid),
        one_ways: grid.runs(Glyph::OneWay),
        ramps: grid.ramps(),
        ladders: grid.ladders(),
        zones: vec![],
        platforms: vec![],
    };

    let mut spawn = None;
    for (r, row) in grid.cells.iter().enumerate() {
        for (x, g) in row.iter().enumerate() {
            if *g != Glyph::Spawn { continue; }
            if spawn.is_some() {
                return Err(LevelError::DuplicateSpawn { line: rows[r].0 });
            }
            let cell_min = Vec2::new(x as f32, grid.y_of(r));
            spawn = Some(cell_min + Vec2::new((1.0 - BODY_SIZE.x) * 0.5, 0.0));
        }
    }
    def.spawn = spawn.ok_or(LevelError::NoSpawn)?;

    for (line, text) in meta {
        apply_metadata(&mut def, line, text)?;
    }

    Ok(def)
}

// ══════════════════════════════════════════════════════════════
// Map rows
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Glyph {
    Empty,
    Solid,
    OneWay,
    RampRight,
    RampLeft,
    Ladder,
    Spawn,
}

impl Glyph {
    fn from_char(c: char) -> Option<Glyph> {
        match c {
            '.' | ' ' => Some(Glyph::Empty),
            '#' => Some(Glyph::Solid),
            '=' => Some(Glyph::OneWay),
            '/' => Some(Glyph::RampRight),
            '\\' => Some(Glyph::RampLeft),
            'H' => Some(Glyph::Ladder),
            'P' => Some(Glyph::Spawn),
            _ => None,
        }
    }
}

struct Grid {
    cells: Vec<Vec<Glyph>>,
    height: usize,
}

impl Grid {
    fn parse(rows: &[(usize, &str)], width: usize) -> Result<Grid, LevelError> {
        let mut cells = Vec::with_capacity(rows.len());
        for &(line, row) in rows {
            let mut out = vec![Glyph::Empty; width];
            for (x, c) in row.chars().enumerate() {
                out[x] = Glyph::from_char(c)
                    .ok_or(LevelError::UnknownGlyph { line, column: x + 1, glyph: c })?;
            }
            cells.push(out);
        }
        Ok(Grid { height: cells.len(), cells })
    }

    /// World y of the bottom edge of row `r`.
    fn y_of(&self, r: usize) -> f32 {
        (self.height - 1 - r) as f32
    }

    fn get(&self, x: usize, r: usize) -> Glyph {
        self.cells.get(r).and_then(|row| row.get(x)).copied().unwrap_or(Glyph::Empty)
    }

    fn runs(&self, glyph: Glyph) -> Vec<Bounds> {
        let mut out = vec![];
        for (r, row) in self.cells.iter().enumerate() {
            let y = self.y_of(r);
            let mut x = 0;
            while x < row.len() {
                if row[x] != glyph { x += 1; continue; }
                let start = x;
                while x < row.len() && row[x] == glyph { x += 1; }
                out.push(Bounds::from_min_max(Vec2::new(start as f32, y), Vec2::new(x as f32, y + 1.0)));
            }
        }
        out
    }

    fn ramps(&self) -> Vec<(Bounds, RampRise)> {
        let mut out = vec![];
        for (r, row) in self.cells.iter().enumerate() {
            let y = self.y_of(r);
            for (x, g) in row.iter().enumerate() {
                let rise = match g {
                    Glyph::RampRight => RampRise::Right,
                    Glyph::RampLeft => RampRise::Left,
                    _ => continue,
                };
                let min = Vec2::new(x as f32, y);
                out.push((Bounds::from_min_max(min, min + Vec2::ONE), rise));
            }
        }
        out
    }

    fn ladders(&self) -> Vec<LadderDef> {
        let width = self.cells.first().map_or(0, |r| r.len());
        let mut out = vec![];
        for x in 0..width {
            let mut r = 0;
            while r < self.height {
                if self.get(x, r) != Glyph::Ladder { r += 1; continue; }
                let top = r;
                while r < self.height && self.get(x, r) == Glyph::Ladder { r += 1; }
                let bottom_y = self.y_of(r - 1);

                // Reach through one-way cells capping the ladder.
                let mut top_r = top;
                while top_r > 0 && self.get(x, top_r - 1) == Glyph::OneWay { top_r -= 1; }
                let mut top_y = self.y_of(top_r) + 1.0;
                if top_r != top { top_y += 1.0; }

                out.push(LadderDef {
                    bounds: Bounds::from_min_max(Vec2::new(x as f32, bottom_y), Vec2::new(x as f32 + 1.0, top_y)),
                    restrict: None,
                });
            }
        }
        out
    }
}

/// A name line starts with `#` and contains at least one letter, unlike
/// a row of solid glyphs.
fn is_name_line(line: &str) -> bool {
    line[1..].chars().any(|c| c.is_alphabetic())
}

// ══════════════════════════════════════════════════════════════
// Metadata
// ══════════════════════════════════════════════════════════════

fn apply_metadata(def: &mut LevelDef, line: usize, text: &str) -> Result<(), LevelError> {
    let mut tokens = text.split_whitespace();
    let kind = tokens.next().unwrap_or_default();
    let args: Vec<&str> = tokens.collect();
    let bad = |reason: &str| LevelError::BadMetadata { line, reason: reason.to_string() };

    match kind {
        "platform" => {
            if args.len() < 7 {
                return Err(bad("platform needs x y w h speed mode and at least one point"));
            }
            let bounds = parse_box(line, &args[..4])?;
            let speed = number(line, args[4])?;
            let mode = match args[5] {
                "cyclic" => PathMode::Cyclic,
                "pingpong" | "ping-pong" => PathMode::PingPong,
                other => return Err(bad(&format!("unknown path mode {other:?}"))),
            };
            let mut one_way = false;
            let mut points = vec![];
            for tok in &args[6..] {
                if *tok == "one-way" {
                    one_way = true;
                    continue;
                }
                let (x, y) = tok.split_once(',').ok_or_else(|| bad(&format!("point {tok:?} is not x,y")))?;
                points.push(Vec2::new(number(line, x)?, number(line, y)?));
            }
            if points.is_empty() {
                return Err(bad("platform has no path points"));
            }
            def.platforms.push(PlatformDef { bounds, speed, mode, one_way, points });
        }
        "zone" => {
            if args.len() != 5 {
                return Err(bad("zone needs top|middle|bottom x y w h"));
            }
            let zone = LadderZone::from_name(args[0])
                .ok_or_else(|| bad(&format!("unknown zone {:?}", args[0])))?;
            let bounds = parse_box(line, &args[1..5])?;
            def.zones.push(ZoneDef { zone, bounds });
        }
        "restrict" => {
            if args.len() < 4 || args.len() > 5 {
                return Err(bad("restrict needs x y w h [ignore-top]"));
            }
            let bounds = parse_box(line, &args[..4])?;
            let ignore_top = match args.get(4) {
                None => false,
                Some(&"ignore-top") => true,
                Some(other) => return Err(bad(&format!("unknown flag {other:?}"))),
            };
            let nearest = def
                .ladders
                .iter_mut()
                .min_by(|a, b| {
                    let da = a.bounds.center.distance_squared(bounds.center);
                    let db = b.bounds.center.distance_squared(bounds.center);
                    da.total_cmp(&db)
                })
                .ok_or_else(|| bad("restrict with no ladder in the level"))?;
            nearest.restrict = Some(RestrictDef { bounds, ignore_top });
        }
        other => return Err(bad(&format!("unknown metadata {other:?}"))),
    }
    Ok(())
}

fn number(line: usize, text: &str) -> Result<f32, LevelError> {
    text.trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| LevelError::BadNumber { line, text: text.to_string() })
}

/// `x y w h` with (x, y) the minimum corner.
fn parse_box(line: usize, args: &[&str]) -> Result<Bounds, LevelError> {
    let x = number(line, args[0])?;
    let y = number(line, args[1])?;
    let w = number(line, args[2])?;
    let h = number(line, args[3])?;
    if w <= 0.0 || h <= 0.0 {
        return Err(LevelError::BadMetadata { line, reason: "box size must be positive".into() });
    }
    Ok(Bounds::from_min_max(Vec2::new(x, y), Vec2::new(x + w, y + h)))
}

// ══════════════════════════════════════════════════════════════
// Built-in level
// ══════════════════════════════════════════════════════════════

const BUILTIN_LEVEL: &str = r"# Proving Ground
!platform 19 12 4 0.5 3 pingpong 21,12.25 26,12.25
!restrict 30.4 0 0.2 16 ignore-top
########################################
#......................................#
#......................................#
#..........................=======.....#
#.............................H........#
#.............................H........#
#.............................H........#
#.............................H........#
#...............##..======....H........#
#...............##............H........#
#...............##............H........#
#...............##............H........#
#..======.......##............H........#
#...............##............H........#
#...............##............H........#
#...............##............H........#
#..P...../###\..##............H........#
########################################
";
