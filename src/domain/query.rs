/// World query surface consumed by the motors.
///
/// The motor never touches collider storage directly: it asks a
/// `CollisionWorld` for ray hits and box overlaps, and moves its own body
/// through `translate`. `ColliderSet` (see `collider.rs`) is the bundled
/// implementation; tests and embedders may supply their own.

use std::ops::{BitAnd, BitOr, BitOrAssign};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geometry::Bounds;

/// Layer bits used to filter queries.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: Self = Self(0);

    /// Static level geometry.
    pub const SOLID: Self = Self(1 << 0);

    /// Pass-from-below geometry (the collider is also tagged one-way).
    pub const ONE_WAY: Self = Self(1 << 1);

    /// Bodies driven by a character motor.
    pub const CHARACTER: Self = Self(1 << 2);

    /// Bodies driven by a platform motor.
    pub const PLATFORM: Self = Self(1 << 3);

    pub const ALL: Self = Self(u32::MAX);

    /// What a character's sweeps collide with.
    pub const CHARACTER_COLLISION: Self =
        Self(Self::SOLID.0 | Self::ONE_WAY.0 | Self::PLATFORM.0);

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }
}

impl BitOr for LayerMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self { Self(self.0 | rhs.0) }
}

impl BitOrAssign for LayerMask {
    fn bitor_assign(&mut self, rhs: Self) { self.0 |= rhs.0; }
}

impl BitAnd for LayerMask {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self { Self(self.0 & rhs.0) }
}

/// Stable handle of a collider inside a world.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ColliderId(pub usize);

/// Nearest hit of a ray query.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct RayHit {
    pub collider: ColliderId,
    pub point: Vec2,
    /// Distance from the ray origin along the (normalised) direction.
    /// Zero when the ray starts inside the collider.
    pub distance: f32,
    pub normal: Vec2,
    pub one_way: bool,
}

pub trait CollisionWorld {
    /// Nearest hit along `direction` within `max_distance`, ignoring
    /// colliders outside `mask` and the `exclude`d one.
    fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        mask: LayerMask,
        exclude: Option<ColliderId>,
    ) -> Option<RayHit>;

    /// Does any collider in `mask` overlap `area` (shared edges excluded)?
    fn overlap_box(&self, area: &Bounds, mask: LayerMask, exclude: Option<ColliderId>) -> bool;

    fn bounds(&self, id: ColliderId) -> Option<Bounds>;

    fn translate(&mut self, id: ColliderId, delta: Vec2);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn character_mask_sees_platforms_but_not_characters() {
        let m = LayerMask::CHARACTER_COLLISION;
        assert!(m.intersects(LayerMask::PLATFORM));
        assert!(m.intersects(LayerMask::ONE_WAY));
        assert!(!m.intersects(LayerMask::CHARACTER));
    }

    #[test]
    fn bit_ops_compose() {
        let mut m = LayerMask::SOLID | LayerMask::CHARACTER;
        assert!(m.contains(LayerMask::SOLID));
        m |= LayerMask::PLATFORM;
        assert_eq!(m & LayerMask::PLATFORM, LayerMask::PLATFORM);
        assert!(!LayerMask::NONE.intersects(LayerMask::ALL));
    }
}
