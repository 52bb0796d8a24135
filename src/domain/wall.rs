/// Wall interaction: settings, wall-jump vectors, ledge detection.

use glam::Vec2;
use serde::Deserialize;

use super::collision::CollisionInfo;
use super::geometry::Bounds;
use super::math::angle_between;
use super::query::{ColliderId, CollisionWorld, LayerMask};

/// Side contacts within this many degrees of horizontal count as walls.
const WALL_ANGLE_TOLERANCE: f32 = 0.01;

#[derive(Clone, Copy, PartialEq, Debug, Deserialize)]
#[serde(default)]
pub struct WallSettings {
    pub can_slide: bool,
    pub stick_time: f32,
    /// Gravity multiplier while sliding down.
    pub slide_speed_loss: f32,
    pub slide_speed_max: f32,
    pub can_climb: bool,
    pub climb_speed: f32,
    pub can_wall_jump: bool,
    pub climb_force: Vec2,
    pub leap_force: Vec2,
    pub can_grab_ledge: bool,
    pub ledge_detection_offset: f32,
}

impl Default for WallSettings {
    fn default() -> Self {
        WallSettings {
            can_slide: true,
            stick_time: 0.15,
            slide_speed_loss: 0.05,
            slide_speed_max: 2.0,
            can_climb: false,
            climb_speed: 2.0,
            can_wall_jump: true,
            climb_force: Vec2::new(12.0, 16.0),
            leap_force: Vec2::new(18.0, 17.0),
            can_grab_ledge: false,
            ledge_detection_offset: 0.1,
        }
    }
}

impl WallSettings {
    /// Launch vector away from a wall on side `wall_dir` (±1).
    ///
    /// Holding away from the wall leaps; anything else climbs.
    pub fn wall_jump_vector(&self, input_x: i32, wall_dir: i32) -> Vec2 {
        let force = if input_x == wall_dir || input_x == 0 {
            self.climb_force
        } else {
            self.leap_force
        };
        Vec2::new(-(wall_dir as f32) * force.x, force.y)
    }
}

/// Side contact with a vertical surface.
pub fn is_against_wall(c: &CollisionInfo) -> bool {
    (c.left && angle_between(c.left_normal, Vec2::X) < WALL_ANGLE_TOLERANCE)
        || (c.right && angle_between(c.right_normal, Vec2::NEG_X) < WALL_ANGLE_TOLERANCE)
}

/// Ledge probe beside the body on side `wall_dir`.
///
/// Casts down from just above and outside the body's top corner. The hit
/// is a ledge only if the small square above it is empty. Returns the
/// ledge point.
#[allow(clippy::too_many_arguments)]
pub fn detect_ledge(
    world: &dyn CollisionWorld,
    body: &Bounds,
    wall_dir: i32,
    offset: f32,
    velocity_y: f32,
    dt: f32,
    mask: LayerMask,
    exclude: Option<ColliderId>,
) -> Option<Vec2> {
    let x = match wall_dir {
        1 => body.max().x + offset,
        -1 => body.min().x - offset,
        _ => return None,
    };
    let origin = Vec2::new(x, body.max().y + offset);
    let distance = (offset * 2.0).max(-velocity_y * dt);

    let hit = world.raycast(origin, Vec2::NEG_Y, distance, mask, exclude)?;
    let clearance = Bounds::new(hit.point + Vec2::Y * offset, Vec2::splat(offset));
    if world.overlap_box(&clearance, mask, exclude) {
        return None;
    }
    Some(hit.point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::motor::tests::world_from;

    #[test]
    fn wall_jump_picks_force_by_input() {
        let w = WallSettings::default();
        assert_eq!(w.wall_jump_vector(1, 1), Vec2::new(-12.0, 16.0));
        assert_eq!(w.wall_jump_vector(0, 1), Vec2::new(-12.0, 16.0));
        assert_eq!(w.wall_jump_vector(0, -1), Vec2::new(12.0, 16.0));
        assert_eq!(w.wall_jump_vector(1, -1), Vec2::new(18.0, 17.0));
    }

    #[test]
    fn only_vertical_side_contacts_are_walls() {
        let mut c = CollisionInfo::default();
        assert!(!is_against_wall(&c));
        c.set_right(Vec2::NEG_X);
        assert!(is_against_wall(&c));
        let mut c = CollisionInfo::default();
        c.set_left(Vec2::new(0.7, 0.7).normalize());
        assert!(!is_against_wall(&c));
    }

    #[test]
    fn ledge_needs_open_space_above() {
        //   col 3 wall top at y = 3
        let world = world_from(&[
            "......",
            "...#..",
            "...#..",
            "...#..",
        ]);
        // Body beside the wall with its top just under the wall top.
        let body = Bounds::from_min_max(Vec2::new(2.2, 2.05), Vec2::new(3.0, 2.95));
        let hit = detect_ledge(&world, &body, 1, 0.1, -2.0, 1.0 / 60.0, LayerMask::ALL, None);
        let p = hit.map(|p| p.y);
        assert!(p.is_some_and(|y| (y - 3.0).abs() < 1e-5), "ledge at {p:?}");

        // Wall continues above the probe: no ledge.
        let tall = world_from(&[
            "...#..",
            "...#..",
            "...#..",
            "...#..",
        ]);
        assert!(detect_ledge(&tall, &body, 1, 0.1, -2.0, 1.0 / 60.0, LayerMask::ALL, None).is_none());
        // Nothing on the left side.
        assert!(detect_ledge(&world, &body, -1, 0.1, -2.0, 1.0 / 60.0, LayerMask::ALL, None).is_none());
    }
}
