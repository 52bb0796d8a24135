/// Per-motor collision state and the surface bitmask used by callbacks.
///
/// Every `move` shifts the current flags into the `prev_*` shadow and then
/// recomputes them from scratch. Enter/exit/stay masks are derived from the
/// shadow pair:
///
///   prev  curr   phase
///   ────  ────   ─────
///   no    yes    Enter
///   yes   no     Exit
///   yes   yes    Stay

use std::ops::{BitOr, BitOrAssign};

use glam::Vec2;

use super::query::ColliderId;

/// Surface bits reported to collision subscribers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct CollisionSurface(pub u8);

impl CollisionSurface {
    pub const NONE: Self = Self(0);
    pub const GROUND: Self = Self(1);
    pub const LEFT: Self = Self(2);
    pub const RIGHT: Self = Self(4);
    pub const CEILING: Self = Self(8);

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub fn is_empty(self) -> bool { self.0 == 0 }
}

impl BitOr for CollisionSurface {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self { Self(self.0 | rhs.0) }
}

impl BitOrAssign for CollisionSurface {
    fn bitor_assign(&mut self, rhs: Self) { self.0 |= rhs.0; }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CollisionPhase {
    Enter,
    Stay,
    Exit,
}

/// One collision callback as delivered to subscribers.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MotorCollision {
    pub phase: CollisionPhase,
    pub surface: CollisionSurface,
}

/// The three callback masks produced by one `move`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct CollisionCallbacks {
    pub enter: CollisionSurface,
    pub stay: CollisionSurface,
    pub exit: CollisionSurface,
}

impl CollisionCallbacks {
    /// Non-empty callbacks in delivery order: enter, exit, stay.
    pub fn events(&self) -> impl Iterator<Item = MotorCollision> + '_ {
        [
            (CollisionPhase::Enter, self.enter),
            (CollisionPhase::Exit, self.exit),
            (CollisionPhase::Stay, self.stay),
        ]
        .into_iter()
        .filter(|(_, s)| !s.is_empty())
        .map(|(phase, surface)| MotorCollision { phase, surface })
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct CollisionInfo {
    pub above: bool,
    pub below: bool,
    pub left: bool,
    pub right: bool,
    pub above_normal: Vec2,
    pub below_normal: Vec2,
    pub left_normal: Vec2,
    pub right_normal: Vec2,

    pub prev_above: bool,
    pub prev_below: bool,
    pub prev_left: bool,
    pub prev_right: bool,

    /// Collider under the body, if the last vertical sweep found one.
    pub below_collider: Option<ColliderId>,
    pub below_one_way: bool,

    pub climbing_slope: bool,
    pub descending_slope: bool,
    pub on_slope: bool,
    /// +1 when the slope rises to the right, -1 when it rises to the left.
    pub slope_direction: i32,
    pub slope_angle: f32,

    pub prev_climbing_slope: bool,
    pub prev_descending_slope: bool,
    pub prev_slope_direction: i32,
    pub prev_slope_angle: f32,
}

impl CollisionInfo {
    /// Shift current flags into the shadow fields and clear the rest.
    pub fn reset(&mut self) {
        self.prev_above = self.above;
        self.prev_below = self.below;
        self.prev_left = self.left;
        self.prev_right = self.right;
        self.prev_climbing_slope = self.climbing_slope;
        self.prev_descending_slope = self.descending_slope;
        self.prev_slope_direction = self.slope_direction;
        self.prev_slope_angle = self.slope_angle;

        self.above = false;
        self.below = false;
        self.left = false;
        self.right = false;
        self.above_normal = Vec2::ZERO;
        self.below_normal = Vec2::ZERO;
        self.left_normal = Vec2::ZERO;
        self.right_normal = Vec2::ZERO;
        self.below_collider = None;
        self.below_one_way = false;

        self.climbing_slope = false;
        self.descending_slope = false;
        self.on_slope = false;
        self.slope_direction = 0;
        self.slope_angle = 0.0;
    }

    pub fn set_above(&mut self, normal: Vec2) {
        self.above = true;
        self.above_normal = normal;
    }

    pub fn set_below(&mut self, normal: Vec2) {
        self.below = true;
        self.below_normal = normal;
    }

    pub fn set_left(&mut self, normal: Vec2) {
        self.left = true;
        self.left_normal = normal;
    }

    pub fn set_right(&mut self, normal: Vec2) {
        self.right = true;
        self.right_normal = normal;
    }

    pub fn current_surface(&self) -> CollisionSurface {
        surface_mask(self.below, self.left, self.right, self.above)
    }

    pub fn previous_surface(&self) -> CollisionSurface {
        surface_mask(self.prev_below, self.prev_left, self.prev_right, self.prev_above)
    }

    pub fn callbacks(&self) -> CollisionCallbacks {
        let curr = self.current_surface().0;
        let prev = self.previous_surface().0;
        CollisionCallbacks {
            enter: CollisionSurface(curr & !prev),
            stay: CollisionSurface(curr & prev),
            exit: CollisionSurface(prev & !curr),
        }
    }

    pub fn has_side_contact(&self) -> bool { self.left || self.right }
}

fn surface_mask(ground: bool, left: bool, right: bool, ceiling: bool) -> CollisionSurface {
    let mut s = CollisionSurface::NONE;
    if ground { s |= CollisionSurface::GROUND; }
    if left { s |= CollisionSurface::LEFT; }
    if right { s |= CollisionSurface::RIGHT; }
    if ceiling { s |= CollisionSurface::CEILING; }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_shifts_into_previous() {
        let mut c = CollisionInfo::default();
        c.set_below(Vec2::Y);
        c.set_left(Vec2::X);
        c.slope_angle = 30.0;
        c.reset();
        assert!(c.prev_below && c.prev_left);
        assert!(!c.below && !c.left);
        assert_eq!(c.below_normal, Vec2::ZERO);
        assert_eq!(c.prev_slope_angle, 30.0);
        assert_eq!(c.slope_angle, 0.0);
    }

    #[test]
    fn callbacks_split_edges() {
        let mut c = CollisionInfo::default();
        c.set_below(Vec2::Y);
        c.set_left(Vec2::X);
        c.reset();
        c.set_below(Vec2::Y);
        c.set_above(Vec2::NEG_Y);
        let cb = c.callbacks();
        assert_eq!(cb.enter, CollisionSurface::CEILING);
        assert_eq!(cb.stay, CollisionSurface::GROUND);
        assert_eq!(cb.exit, CollisionSurface::LEFT);
    }

    #[test]
    fn empty_masks_are_not_delivered() {
        let cb = CollisionCallbacks {
            enter: CollisionSurface::GROUND | CollisionSurface::RIGHT,
            ..Default::default()
        };
        let delivered: Vec<_> = cb.events().collect();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].phase, CollisionPhase::Enter);
        assert!(delivered[0].surface.contains(CollisionSurface::RIGHT));
    }
}
