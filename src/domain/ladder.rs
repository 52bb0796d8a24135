/// Ladder area state for one character.
///
/// A ladder's bounds split into three zones by height:
///
///   ┌──────────┐
///   │   Top    │  top_height, flush with the ladder's top edge
///   ├──────────┤
///   │  Middle  │  whatever the outer area covers in between
///   ├──────────┤
///   │  Bottom  │  bottom_height, flush with the bottom edge
///   └──────────┘
///
/// Zone lookup checks Bottom, then Top, then the whole area; the first
/// containing zone wins. A restricted sub-area optionally clamps travel
/// while climbing.

use glam::Vec2;

use super::geometry::Bounds;
use super::math::lerp;

/// Fraction of the remaining distance pulled back per step when the
/// restricted area is not snapped.
const RESTRICT_PULL: f32 = 0.25;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum LadderZone {
    Top,
    Middle,
    #[default]
    Bottom,
}

impl LadderZone {
    pub fn from_name(s: &str) -> Option<LadderZone> {
        match s.to_ascii_lowercase().as_str() {
            "top" => Some(LadderZone::Top),
            "middle" => Some(LadderZone::Middle),
            "bottom" => Some(LadderZone::Bottom),
            _ => None,
        }
    }
}

/// Travel limits while on a ladder. An ignored top is open to +∞.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct RestrictedArea {
    pub bounds: Bounds,
    pub min: Vec2,
    pub max: Vec2,
}

impl RestrictedArea {
    pub fn new(bounds: Bounds, ignore_top: bool) -> Self {
        let mut max = bounds.max();
        if ignore_top {
            max.y = f32::INFINITY;
        }
        RestrictedArea { bounds, min: bounds.min(), max }
    }

    /// Zero the velocity components that would move further outside.
    pub fn clamp_velocity(&self, position: Vec2, mut velocity: Vec2) -> Vec2 {
        if position.x > self.max.x && velocity.x > 0.0 { velocity.x = 0.0; }
        if position.x < self.min.x && velocity.x < 0.0 { velocity.x = 0.0; }
        if position.y > self.max.y && velocity.y > 0.0 { velocity.y = 0.0; }
        if position.y < self.min.y && velocity.y < 0.0 { velocity.y = 0.0; }
        velocity
    }

    /// Pull `position` back inside: snapped, or a quarter of the way per step.
    pub fn settle(&self, position: Vec2, snap: bool) -> Vec2 {
        let clamped = position.clamp(self.min, self.max);
        if snap { return clamped; }
        Vec2::new(
            if clamped.x != position.x { lerp(position.x, clamped.x, RESTRICT_PULL) } else { position.x },
            if clamped.y != position.y { lerp(position.y, clamped.y, RESTRICT_PULL) } else { position.y },
        )
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct LadderState {
    in_area: bool,
    area: Bounds,
    top_area: Bounds,
    bottom_area: Bounds,
    zone: LadderZone,
    restricted: Option<RestrictedArea>,
}

impl LadderState {
    pub fn enter(&mut self, area: Bounds, top_height: f32, bottom_height: f32) {
        self.in_area = true;
        self.area = area;
        self.top_area = Bounds::new(
            Vec2::new(area.center.x, area.max().y - top_height * 0.5),
            Vec2::new(area.size().x, top_height),
        );
        self.bottom_area = Bounds::new(
            Vec2::new(area.center.x, area.min().y + bottom_height * 0.5),
            Vec2::new(area.size().x, bottom_height),
        );
    }

    pub fn exit(&mut self) {
        self.in_area = false;
        self.area = Bounds::default();
        self.top_area = Bounds::default();
        self.bottom_area = Bounds::default();
    }

    pub fn is_in_area(&self) -> bool { self.in_area }
    pub fn is_in_top_zone(&self) -> bool { self.in_area && self.zone == LadderZone::Top }
    pub fn zone(&self) -> LadderZone { self.zone }
    pub fn set_zone(&mut self, zone: LadderZone) { self.zone = zone; }

    pub fn area(&self) -> Bounds { self.area }
    pub fn top_area(&self) -> Bounds { self.top_area }
    pub fn bottom_area(&self) -> Bounds { self.bottom_area }

    pub fn set_restricted(&mut self, bounds: Bounds, ignore_top: bool) {
        self.restricted = Some(RestrictedArea::new(bounds, ignore_top));
    }

    pub fn clear_restricted(&mut self) { self.restricted = None; }
    pub fn restricted(&self) -> Option<&RestrictedArea> { self.restricted.as_ref() }

    /// Recompute the zone from the body center. Outside every zone the
    /// previous zone is kept.
    pub fn resolve_zone(&mut self, center: Vec2) {
        if !self.in_area { return; }
        if self.bottom_area.contains(center) {
            self.zone = LadderZone::Bottom;
        } else if self.top_area.contains(center) {
            self.zone = LadderZone::Top;
        } else if self.area.contains(center) {
            self.zone = LadderZone::Middle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder() -> LadderState {
        let mut l = LadderState::default();
        l.enter(Bounds::from_min_max(Vec2::new(0.0, 0.0), Vec2::new(1.0, 6.0)), 1.0, 1.0);
        l
    }

    #[test]
    fn zones_split_by_height() {
        let l = ladder();
        assert_eq!(l.top_area().min().y, 5.0);
        assert_eq!(l.top_area().max().y, 6.0);
        assert_eq!(l.bottom_area().min().y, 0.0);
        assert_eq!(l.bottom_area().max().y, 1.0);
        assert_eq!(l.top_area().size().x, 1.0);
    }

    #[test]
    fn top_beats_middle() {
        let mut l = ladder();
        l.resolve_zone(Vec2::new(0.5, 5.5));
        assert_eq!(l.zone(), LadderZone::Top);
        assert!(l.is_in_top_zone());
        l.resolve_zone(Vec2::new(0.5, 3.0));
        assert_eq!(l.zone(), LadderZone::Middle);
    }

    #[test]
    fn bottom_checked_first_when_zones_overlap() {
        let mut l = LadderState::default();
        // Short ladder: top and bottom zones overlap entirely.
        l.enter(Bounds::from_min_max(Vec2::ZERO, Vec2::new(1.0, 1.0)), 1.0, 1.0);
        l.resolve_zone(Vec2::new(0.5, 0.5));
        assert_eq!(l.zone(), LadderZone::Bottom);
    }

    #[test]
    fn outside_keeps_last_zone_and_exit_resets() {
        let mut l = ladder();
        l.resolve_zone(Vec2::new(0.5, 5.5));
        l.resolve_zone(Vec2::new(9.0, 9.0));
        assert_eq!(l.zone(), LadderZone::Top);
        l.exit();
        assert!(!l.is_in_area());
        assert!(!l.is_in_top_zone());
    }

    #[test]
    fn restricted_area_blocks_outward_motion() {
        let r = RestrictedArea::new(Bounds::from_min_max(Vec2::new(0.0, 0.0), Vec2::new(1.0, 4.0)), false);
        let v = r.clamp_velocity(Vec2::new(1.5, 2.0), Vec2::new(3.0, -1.0));
        assert_eq!(v, Vec2::new(0.0, -1.0));
        let v = r.clamp_velocity(Vec2::new(0.5, 4.5), Vec2::new(0.0, 2.0));
        assert_eq!(v, Vec2::ZERO);
    }

    #[test]
    fn ignored_top_is_open() {
        let r = RestrictedArea::new(Bounds::from_min_max(Vec2::ZERO, Vec2::new(1.0, 4.0)), true);
        assert_eq!(r.clamp_velocity(Vec2::new(0.5, 10.0), Vec2::Y), Vec2::Y);
        assert_eq!(r.settle(Vec2::new(0.5, 10.0), true), Vec2::new(0.5, 10.0));
    }

    #[test]
    fn settle_pulls_back_gradually_unless_snapped() {
        let r = RestrictedArea::new(Bounds::from_min_max(Vec2::ZERO, Vec2::new(1.0, 4.0)), false);
        assert_eq!(r.settle(Vec2::new(2.0, 1.0), true), Vec2::new(1.0, 1.0));
        let p = r.settle(Vec2::new(2.0, 1.0), false);
        assert!((p.x - 1.75).abs() < 1e-6);
        assert_eq!(p.y, 1.0);
    }

    #[test]
    fn zone_names_parse() {
        assert_eq!(LadderZone::from_name("Top"), Some(LadderZone::Top));
        assert_eq!(LadderZone::from_name("side"), None);
    }
}
