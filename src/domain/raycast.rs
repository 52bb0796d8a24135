/// Raycast origin provider.
///
/// Rays start from the body's bounds shrunk by `2 * skin_width`, so that a
/// body resting exactly on a surface never casts from inside it.
///
///   top_left ──────── top_right
///      │   ↑ vertical rays  │
///      │ ← horizontal rays →│
///   bottom_left ───── bottom_right
///
/// Horizontal rays are stacked upward from the bottom corners, vertical rays
/// are spread rightward from the left corners.

use glam::Vec2;

use super::geometry::Bounds;

/// Inward margin subtracted from every ray.
pub const SKIN_WIDTH: f32 = 0.015;

/// Fewer than two rays cannot span an edge.
pub const MIN_RAY_COUNT: usize = 2;

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct RaycastOrigins {
    pub top_left: Vec2,
    pub top_right: Vec2,
    pub bottom_left: Vec2,
    pub bottom_right: Vec2,
}

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct RaySpacing {
    /// Vertical gap between horizontal rays.
    pub horizontal: f32,
    /// Horizontal gap between vertical rays.
    pub vertical: f32,
}

pub fn compute_origins(bounds: &Bounds, skin_width: f32) -> RaycastOrigins {
    let b = bounds.expanded(-2.0 * skin_width);
    let (lo, hi) = (b.min(), b.max());
    RaycastOrigins {
        top_left: Vec2::new(lo.x, hi.y),
        top_right: hi,
        bottom_left: lo,
        bottom_right: Vec2::new(hi.x, lo.y),
    }
}

pub fn compute_spacing(
    bounds: &Bounds,
    skin_width: f32,
    horizontal_rays: usize,
    vertical_rays: usize,
) -> RaySpacing {
    let size = bounds.expanded(-2.0 * skin_width).size();
    let h = horizontal_rays.max(MIN_RAY_COUNT);
    let v = vertical_rays.max(MIN_RAY_COUNT);
    RaySpacing {
        horizontal: size.y / (h - 1) as f32,
        vertical: size.x / (v - 1) as f32,
    }
}

/// Per-body ray layout, refreshed from the body's bounds every move.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Raycaster {
    horizontal_rays: usize,
    vertical_rays: usize,
    skin_width: f32,
    pub origins: RaycastOrigins,
    pub spacing: RaySpacing,
}

impl Raycaster {
    pub fn new(horizontal_rays: usize, vertical_rays: usize) -> Self {
        Raycaster {
            horizontal_rays: horizontal_rays.max(MIN_RAY_COUNT),
            vertical_rays: vertical_rays.max(MIN_RAY_COUNT),
            skin_width: SKIN_WIDTH,
            origins: RaycastOrigins::default(),
            spacing: RaySpacing::default(),
        }
    }

    pub fn horizontal_rays(&self) -> usize { self.horizontal_rays }
    pub fn vertical_rays(&self) -> usize { self.vertical_rays }
    pub fn skin_width(&self) -> f32 { self.skin_width }

    pub fn set_ray_counts(&mut self, horizontal: usize, vertical: usize) {
        self.horizontal_rays = horizontal.max(MIN_RAY_COUNT);
        self.vertical_rays = vertical.max(MIN_RAY_COUNT);
    }

    pub fn update(&mut self, bounds: &Bounds) {
        self.origins = compute_origins(bounds, self.skin_width);
        self.spacing = compute_spacing(bounds, self.skin_width, self.horizontal_rays, self.vertical_rays);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_counts_below_two_are_clamped() {
        for requested in 0..2 {
            let rc = Raycaster::new(requested, requested);
            assert_eq!(rc.horizontal_rays(), 2);
            assert_eq!(rc.vertical_rays(), 2);
        }
        let mut rc = Raycaster::new(5, 7);
        rc.set_ray_counts(1, 0);
        assert_eq!((rc.horizontal_rays(), rc.vertical_rays()), (2, 2));
    }

    #[test]
    fn origins_are_inset_by_skin() {
        let b = Bounds::from_min_max(Vec2::ZERO, Vec2::new(1.0, 2.0));
        let o = compute_origins(&b, SKIN_WIDTH);
        assert!((o.bottom_left.x - SKIN_WIDTH).abs() < 1e-6);
        assert!((o.bottom_left.y - SKIN_WIDTH).abs() < 1e-6);
        assert!((o.top_right.x - (1.0 - SKIN_WIDTH)).abs() < 1e-6);
        assert!((o.top_right.y - (2.0 - SKIN_WIDTH)).abs() < 1e-6);
        assert_eq!(o.top_left.x, o.bottom_left.x);
        assert_eq!(o.bottom_right.y, o.bottom_left.y);
    }

    #[test]
    fn spacing_spans_the_inset_edge() {
        let b = Bounds::from_min_max(Vec2::ZERO, Vec2::new(1.0, 2.0));
        let s = compute_spacing(&b, SKIN_WIDTH, 4, 3);
        let inner = b.expanded(-2.0 * SKIN_WIDTH).size();
        assert!((s.horizontal * 3.0 - inner.y).abs() < 1e-5);
        assert!((s.vertical * 2.0 - inner.x).abs() < 1e-5);
    }

    #[test]
    fn zero_size_bounds_degrade_to_zero_spacing() {
        let b = Bounds::new(Vec2::ONE, Vec2::ZERO);
        let s = compute_spacing(&b, SKIN_WIDTH, 4, 4);
        assert_eq!(s, RaySpacing { horizontal: 0.0, vertical: 0.0 });
    }
}
