/// Collider storage and the bundled `CollisionWorld` implementation.
///
/// Shapes:
///   Box          axis-aligned rectangle filling its bounds
///   Ramp(Right)  right triangle, hypotenuse rising toward +x
///   Ramp(Left)   right triangle, hypotenuse rising toward -x
///
/// Broad phase: uniform grid keyed by integer cell. Every collider is
/// bucketed into each cell its bounds touch; `translate` re-buckets.
/// Rays longer than `LONG_RAY_CELLS` cells skip the grid and scan linearly.
///
/// Narrow phase: slab clipping against the convex polygon (Cyrus-Beck) for
/// rays, separating axes for box overlap. Ties resolve to the lowest id so
/// every query is deterministic.

use std::collections::HashMap;

use glam::Vec2;

use super::geometry::Bounds;
use super::query::{ColliderId, CollisionWorld, LayerMask, RayHit};

const PARALLEL_EPS: f32 = 1e-9;
const LONG_RAY_CELLS: f32 = 64.0;
pub const DEFAULT_CELL_SIZE: f32 = 4.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RampRise {
    Left,
    Right,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Shape {
    Box,
    Ramp(RampRise),
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Collider {
    pub bounds: Bounds,
    pub shape: Shape,
    pub layer: LayerMask,
    pub one_way: bool,
    pub enabled: bool,
}

impl Collider {
    pub fn solid(bounds: Bounds) -> Self {
        Collider { bounds, shape: Shape::Box, layer: LayerMask::SOLID, one_way: false, enabled: true }
    }

    pub fn one_way(bounds: Bounds) -> Self {
        Collider { bounds, shape: Shape::Box, layer: LayerMask::ONE_WAY, one_way: true, enabled: true }
    }

    pub fn ramp(bounds: Bounds, rise: RampRise) -> Self {
        Collider { bounds, shape: Shape::Ramp(rise), layer: LayerMask::SOLID, one_way: false, enabled: true }
    }

    pub fn body(bounds: Bounds, layer: LayerMask) -> Self {
        Collider { bounds, shape: Shape::Box, layer, one_way: false, enabled: true }
    }

    /// Counter-clockwise vertices. For ramps the closing edge
    /// (last vertex back to the first) is the hypotenuse.
    fn vertices(&self) -> ([Vec2; 4], usize) {
        let lo = self.bounds.min();
        let hi = self.bounds.max();
        let bl = lo;
        let br = Vec2::new(hi.x, lo.y);
        let tr = hi;
        let tl = Vec2::new(lo.x, hi.y);
        match self.shape {
            Shape::Box => ([bl, br, tr, tl], 4),
            Shape::Ramp(RampRise::Right) => ([bl, br, tr, tr], 3),
            Shape::Ramp(RampRise::Left) => ([tl, bl, br, br], 3),
        }
    }

    /// Surface point on the top of the shape at `x`, if `x` lies over it.
    pub fn surface_height(&self, x: f32) -> Option<f32> {
        let lo = self.bounds.min();
        let hi = self.bounds.max();
        if x < lo.x || x > hi.x { return None; }
        let w = (hi.x - lo.x).max(f32::EPSILON);
        match self.shape {
            Shape::Box => Some(hi.y),
            Shape::Ramp(RampRise::Right) => Some(lo.y + (x - lo.x) / w * (hi.y - lo.y)),
            Shape::Ramp(RampRise::Left) => Some(lo.y + (hi.x - x) / w * (hi.y - lo.y)),
        }
    }

    fn raycast(&self, origin: Vec2, dir: Vec2, max_distance: f32) -> Option<(f32, Vec2)> {
        let (verts, n) = self.vertices();
        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        let mut enter_normal = -dir;

        for i in 0..n {
            let a = verts[i];
            let b = verts[(i + 1) % n];
            let edge = b - a;
            let normal = Vec2::new(edge.y, -edge.x).normalize_or_zero();
            let denom = normal.dot(dir);
            let dist = normal.dot(origin - a);

            if denom.abs() < PARALLEL_EPS {
                // Parallel: outside (or grazing) this half-plane means a miss.
                if dist >= -1e-6 { return None; }
                continue;
            }
            let t = -dist / denom;
            if denom < 0.0 {
                if t > t_enter {
                    t_enter = t;
                    enter_normal = normal;
                }
            } else if t < t_exit {
                t_exit = t;
            }
            if t_enter > t_exit { return None; }
        }

        if t_exit <= 0.0 || t_enter > max_distance { return None; }
        if t_enter <= 0.0 {
            return Some((0.0, -dir));
        }
        Some((t_enter, enter_normal))
    }

    fn overlaps_box(&self, area: &Bounds) -> bool {
        if !self.bounds.overlaps(area) { return false; }
        match self.shape {
            Shape::Box => true,
            Shape::Ramp(_) => {
                // Bounds overlap already covers the x and y axes; the only
                // remaining separating axis is the hypotenuse normal.
                let (verts, _) = self.vertices();
                let hyp = verts[0] - verts[2];
                let axis = Vec2::new(hyp.y, -hyp.x).normalize_or_zero();
                let tri_max = axis.dot(verts[0]);
                let lo = area.min();
                let hi = area.max();
                let box_min = [lo, Vec2::new(hi.x, lo.y), hi, Vec2::new(lo.x, hi.y)]
                    .iter()
                    .map(|c| axis.dot(*c))
                    .fold(f32::INFINITY, f32::min);
                box_min < tri_max
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
struct Cell(i32, i32);

/// Bucketed collider store.
#[derive(Clone, Debug)]
pub struct ColliderSet {
    colliders: Vec<Collider>,
    cells: HashMap<Cell, Vec<ColliderId>>,
    cell_size: f32,
}

impl Default for ColliderSet {
    fn default() -> Self { ColliderSet::new(DEFAULT_CELL_SIZE) }
}

impl ColliderSet {
    pub fn new(cell_size: f32) -> Self {
        ColliderSet {
            colliders: Vec::new(),
            cells: HashMap::new(),
            cell_size: cell_size.max(0.25),
        }
    }

    pub fn insert(&mut self, collider: Collider) -> ColliderId {
        let id = ColliderId(self.colliders.len());
        self.colliders.push(collider);
        self.bucket(id, &collider.bounds);
        id
    }

    pub fn get(&self, id: ColliderId) -> Option<&Collider> {
        self.colliders.get(id.0)
    }

    pub fn len(&self) -> usize { self.colliders.len() }
    pub fn is_empty(&self) -> bool { self.colliders.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (ColliderId, &Collider)> {
        self.colliders.iter().enumerate().map(|(i, c)| (ColliderId(i), c))
    }

    pub fn set_enabled(&mut self, id: ColliderId, enabled: bool) {
        if let Some(c) = self.colliders.get_mut(id.0) {
            c.enabled = enabled;
        }
    }

    /// Move a collider so its center lands on `center`.
    pub fn set_center(&mut self, id: ColliderId, center: Vec2) {
        if let Some(c) = self.colliders.get(id.0) {
            let delta = center - c.bounds.center;
            self.translate(id, delta);
        }
    }

    // ── Broad phase ──

    fn cell_range(&self, bounds: &Bounds) -> (Cell, Cell) {
        let lo = bounds.min() / self.cell_size;
        let hi = bounds.max() / self.cell_size;
        (
            Cell(lo.x.floor() as i32, lo.y.floor() as i32),
            Cell(hi.x.floor() as i32, hi.y.floor() as i32),
        )
    }

    fn bucket(&mut self, id: ColliderId, bounds: &Bounds) {
        let (lo, hi) = self.cell_range(bounds);
        for cy in lo.1..=hi.1 {
            for cx in lo.0..=hi.0 {
                self.cells.entry(Cell(cx, cy)).or_default().push(id);
            }
        }
    }

    fn unbucket(&mut self, id: ColliderId, bounds: &Bounds) {
        let (lo, hi) = self.cell_range(bounds);
        for cy in lo.1..=hi.1 {
            for cx in lo.0..=hi.0 {
                if let Some(list) = self.cells.get_mut(&Cell(cx, cy)) {
                    list.retain(|&c| c != id);
                    if list.is_empty() {
                        self.cells.remove(&Cell(cx, cy));
                    }
                }
            }
        }
    }

    /// Sorted, deduplicated ids whose cells touch `area`.
    fn candidates(&self, area: &Bounds) -> Vec<ColliderId> {
        let (lo, hi) = self.cell_range(area);
        let mut out = Vec::new();
        for cy in lo.1..=hi.1 {
            for cx in lo.0..=hi.0 {
                if let Some(list) = self.cells.get(&Cell(cx, cy)) {
                    out.extend_from_slice(list);
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    fn filtered(&self, id: ColliderId, mask: LayerMask, exclude: Option<ColliderId>) -> Option<&Collider> {
        if exclude == Some(id) { return None; }
        let c = self.colliders.get(id.0)?;
        (c.enabled && c.layer.intersects(mask)).then_some(c)
    }
}

impl CollisionWorld for ColliderSet {
    fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        mask: LayerMask,
        exclude: Option<ColliderId>,
    ) -> Option<RayHit> {
        let dir = direction.normalize_or_zero();
        if dir == Vec2::ZERO || max_distance < 0.0 { return None; }

        let ids: Vec<ColliderId> = if max_distance > LONG_RAY_CELLS * self.cell_size {
            (0..self.colliders.len()).map(ColliderId).collect()
        } else {
            self.candidates(&Bounds::from_min_max(origin, origin + dir * max_distance))
        };

        let mut best: Option<RayHit> = None;
        for id in ids {
            let Some(c) = self.filtered(id, mask, exclude) else { continue };
            let Some((distance, normal)) = c.raycast(origin, dir, max_distance) else { continue };
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(RayHit {
                    collider: id,
                    point: origin + dir * distance,
                    distance,
                    normal,
                    one_way: c.one_way,
                });
            }
        }
        best
    }

    fn overlap_box(&self, area: &Bounds, mask: LayerMask, exclude: Option<ColliderId>) -> bool {
        self.candidates(area)
            .into_iter()
            .filter_map(|id| self.filtered(id, mask, exclude))
            .any(|c| c.overlaps_box(area))
    }

    fn bounds(&self, id: ColliderId) -> Option<Bounds> {
        self.colliders.get(id.0).map(|c| c.bounds)
    }

    fn translate(&mut self, id: ColliderId, delta: Vec2) {
        let Some(old) = self.colliders.get(id.0).map(|c| c.bounds) else { return };
        if delta == Vec2::ZERO { return; }
        let new = old.translated(delta);
        if self.cell_range(&old) != self.cell_range(&new) {
            self.unbucket(id, &old);
            self.bucket(id, &new);
        }
        if let Some(c) = self.colliders.get_mut(id.0) {
            c.bounds = new;
        }
    }
}
