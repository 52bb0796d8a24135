/// Axis-aligned bounds in world units (y up).
///
/// Stored as center + half extents. Containment and intersection are
/// inclusive on the edges so that a point sitting exactly on a zone border
/// belongs to that zone.

use glam::Vec2;

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Bounds {
    pub center: Vec2,
    pub extents: Vec2,
}

impl Bounds {
    pub fn new(center: Vec2, size: Vec2) -> Self {
        Bounds { center, extents: size.abs() * 0.5 }
    }

    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        let lo = min.min(max);
        let hi = min.max(max);
        Bounds { center: (lo + hi) * 0.5, extents: (hi - lo) * 0.5 }
    }

    pub fn min(&self) -> Vec2 { self.center - self.extents }
    pub fn max(&self) -> Vec2 { self.center + self.extents }
    pub fn size(&self) -> Vec2 { self.extents * 2.0 }

    /// Grow (or shrink, for negative `amount`) the total size on both axes.
    /// Extents never go below zero.
    pub fn expanded(&self, amount: f32) -> Bounds {
        Bounds {
            center: self.center,
            extents: (self.extents + Vec2::splat(amount * 0.5)).max(Vec2::ZERO),
        }
    }

    pub fn translated(&self, delta: Vec2) -> Bounds {
        Bounds { center: self.center + delta, extents: self.extents }
    }

    pub fn contains(&self, p: Vec2) -> bool {
        let (lo, hi) = (self.min(), self.max());
        p.x >= lo.x && p.x <= hi.x && p.y >= lo.y && p.y <= hi.y
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        let (a_lo, a_hi) = (self.min(), self.max());
        let (b_lo, b_hi) = (other.min(), other.max());
        a_lo.x <= b_hi.x && a_hi.x >= b_lo.x && a_lo.y <= b_hi.y && a_hi.y >= b_lo.y
    }

    /// Strict overlap: shared edges do not count.
    pub fn overlaps(&self, other: &Bounds) -> bool {
        let (a_lo, a_hi) = (self.min(), self.max());
        let (b_lo, b_hi) = (other.min(), other.max());
        a_lo.x < b_hi.x && a_hi.x > b_lo.x && a_lo.y < b_hi.y && a_hi.y > b_lo.y
    }

    /// Closest point inside the bounds.
    pub fn clamp_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min(), self.max())
    }

    /// Smallest bounds containing both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds::from_min_max(self.min().min(other.min()), self.max().max(other.max()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_max_roundtrip_normalises_corners() {
        let b = Bounds::from_min_max(Vec2::new(3.0, 4.0), Vec2::new(1.0, 0.0));
        assert_eq!(b.min(), Vec2::new(1.0, 0.0));
        assert_eq!(b.max(), Vec2::new(3.0, 4.0));
        assert_eq!(b.size(), Vec2::new(2.0, 4.0));
    }

    #[test]
    fn expand_negative_shrinks_each_side_by_half() {
        let b = Bounds::new(Vec2::ZERO, Vec2::new(1.0, 2.0)).expanded(-0.2);
        assert!((b.size().x - 0.8).abs() < 1e-6);
        assert!((b.size().y - 1.8).abs() < 1e-6);
    }

    #[test]
    fn expand_never_inverts() {
        let b = Bounds::new(Vec2::ZERO, Vec2::splat(0.01)).expanded(-1.0);
        assert_eq!(b.size(), Vec2::ZERO);
    }

    #[test]
    fn contains_is_edge_inclusive() {
        let b = Bounds::from_min_max(Vec2::ZERO, Vec2::ONE);
        assert!(b.contains(Vec2::new(1.0, 0.5)));
        assert!(!b.contains(Vec2::new(1.01, 0.5)));
    }

    #[test]
    fn touching_boxes_intersect_but_do_not_overlap() {
        let a = Bounds::from_min_max(Vec2::ZERO, Vec2::ONE);
        let b = Bounds::from_min_max(Vec2::new(1.0, 0.0), Vec2::new(2.0, 1.0));
        assert!(a.intersects(&b));
        assert!(!a.overlaps(&b));
    }
}
