/// Kinematic character motor.
///
/// `move_by` resolves one step's displacement against the world:
///
///   1. refresh ray origins from the body's bounds
///   2. shift collision flags into their shadow, clear current
///   3. raw = requested, working = raw + external force
///   4. moving down: try to glue onto a descending slope
///   5. horizontal sweep (slope climb on the lowest ray, walls otherwise)
///   6. vertical sweep when vy ≠ 0 (one-way filtering, slope re-check)
///   7. translate; riders of a moving platform are forced grounded
///   8. enter / exit / stay callbacks (non-empty masks only)
///   9. clear one-shot state (external force, fall-through)
///
/// Displacements are per step (velocity already multiplied by dt).

use glam::Vec2;
use serde::Deserialize;
use tracing::{trace, warn};

use super::collision::{CollisionCallbacks, CollisionInfo, MotorCollision};
use super::events::{EventBus, SubscriptionId};
use super::math::{angle_between, sign, sign_i};
use super::query::{ColliderId, CollisionWorld, LayerMask};
use super::raycast::{Raycaster, SKIN_WIDTH};

/// Anything a moving platform can carry with full collision resolution.
pub trait Motor {
    fn collider(&self) -> ColliderId;

    fn move_by(
        &mut self,
        world: &mut dyn CollisionWorld,
        displacement: Vec2,
        on_moving_motor: bool,
    ) -> CollisionCallbacks;

    /// Accumulate a one-shot force consumed by the next `move_by`.
    fn push(&mut self, force: Vec2, on_moving_motor: bool);
}

#[derive(Clone, Copy, PartialEq, Debug, Deserialize)]
#[serde(default)]
pub struct MotorSettings {
    pub max_climb_angle: f32,
    pub max_descend_angle: f32,
    pub horizontal_rays: usize,
    pub vertical_rays: usize,
    #[serde(skip)]
    pub collision_mask: LayerMask,
}

impl Default for MotorSettings {
    fn default() -> Self {
        MotorSettings {
            max_climb_angle: 80.0,
            max_descend_angle: 80.0,
            horizontal_rays: 4,
            vertical_rays: 4,
            collision_mask: LayerMask::CHARACTER_COLLISION,
        }
    }
}

#[derive(Debug)]
pub struct CharacterMotor {
    collider: ColliderId,
    settings: MotorSettings,
    raycaster: Raycaster,
    collisions: CollisionInfo,

    velocity: Vec2,
    raw_velocity: Vec2,
    external_force: Vec2,

    moving_direction: i32,
    falling_through: bool,
    on_moving_motor: bool,

    listeners: EventBus<MotorCollision>,
}

impl CharacterMotor {
    pub fn new(collider: ColliderId, settings: MotorSettings) -> Self {
        CharacterMotor {
            collider,
            raycaster: Raycaster::new(settings.horizontal_rays, settings.vertical_rays),
            settings,
            collisions: CollisionInfo::default(),
            velocity: Vec2::ZERO,
            raw_velocity: Vec2::ZERO,
            external_force: Vec2::ZERO,
            moving_direction: 1,
            falling_through: false,
            on_moving_motor: false,
            listeners: EventBus::default(),
        }
    }

    // ── Queries ──

    pub fn collisions(&self) -> &CollisionInfo { &self.collisions }
    /// Displacement applied by the last `move_by`.
    pub fn velocity(&self) -> Vec2 { self.velocity }
    /// Displacement requested by the last `move_by`, before forces and sweeps.
    pub fn raw_velocity(&self) -> Vec2 { self.raw_velocity }
    pub fn external_force(&self) -> Vec2 { self.external_force }
    pub fn moving_direction(&self) -> i32 { self.moving_direction }
    pub fn is_on_moving_motor(&self) -> bool { self.on_moving_motor }
    pub fn is_falling_through(&self) -> bool { self.falling_through }
    pub fn settings(&self) -> &MotorSettings { &self.settings }
    pub fn raycaster(&self) -> &Raycaster { &self.raycaster }

    pub fn set_settings(&mut self, settings: MotorSettings) {
        self.raycaster.set_ray_counts(settings.horizontal_rays, settings.vertical_rays);
        self.settings = settings;
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&MotorCollision) + 'static) -> SubscriptionId {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Let the next downward sweep pass through one-way platforms.
    pub fn fall_through(&mut self) {
        self.falling_through = true;
        self.external_force += Vec2::NEG_Y * SKIN_WIDTH;
    }

    /// Ignore one-way platforms on the next move without the downward nudge.
    pub fn pass_through_one_way(&mut self) {
        self.falling_through = true;
    }

    /// Seed `below` from a short downward probe without moving.
    ///
    /// Used at spawn so the first step starts from real ground contact
    /// instead of an all-clear collision state.
    pub fn settle(&mut self, world: &dyn CollisionWorld) -> bool {
        let Some(bounds) = world.bounds(self.collider) else { return false };
        self.raycaster.update(&bounds);
        self.collisions.reset();

        let ray_length = 2.0 * SKIN_WIDTH;
        for i in 0..self.raycaster.vertical_rays() {
            let origin = self.raycaster.origins.bottom_left
                + Vec2::X * (self.raycaster.spacing.vertical * i as f32);
            let Some(hit) = world.raycast(origin, Vec2::NEG_Y, ray_length, self.settings.collision_mask, Some(self.collider))
            else { continue };
            if hit.one_way && hit.distance == 0.0 { continue; }
            self.collisions.set_below(hit.normal);
            self.collisions.below_collider = Some(hit.collider);
            self.collisions.below_one_way = hit.one_way;
            break;
        }
        self.collisions.prev_below = self.collisions.below;
        self.collisions.below
    }

    // ── Sweeps ──

    fn descend_slope(&mut self, world: &dyn CollisionWorld, v: &mut Vec2) {
        let dir_x = sign_i(v.x);
        let origin = if dir_x == -1 {
            self.raycaster.origins.bottom_right
        } else {
            self.raycaster.origins.bottom_left
        };
        let Some(hit) = world.raycast(origin, Vec2::NEG_Y, f32::INFINITY, self.settings.collision_mask, Some(self.collider))
        else { return };

        let angle = angle_between(hit.normal, Vec2::Y);
        if angle == 0.0 || angle > self.settings.max_descend_angle { return; }
        // Slope must fall away in the direction of travel.
        if sign_i(hit.normal.x) != dir_x { return; }

        let rad = angle.to_radians();
        let speed = v.x.abs();
        if hit.distance - SKIN_WIDTH > rad.tan() * speed { return; }

        v.x = rad.cos() * speed * sign(v.x);
        v.y = -(rad.sin() * speed);

        let c = &mut self.collisions;
        c.slope_angle = angle;
        c.slope_direction = -sign_i(v.x);
        c.descending_slope = true;
        c.set_below(hit.normal);
        c.below_collider = Some(hit.collider);
        c.below_one_way = hit.one_way;
    }

    fn climb_slope(&mut self, v: &mut Vec2, angle: f32, normal: Vec2) {
        let rad = angle.to_radians();
        let speed = v.x.abs();
        let climb_y = rad.sin() * speed;
        // Already rising faster than the slope (e.g. jumping): leave it.
        if v.y > climb_y { return; }

        v.x = rad.cos() * speed * sign(v.x);
        v.y = climb_y;

        let c = &mut self.collisions;
        c.slope_angle = angle;
        c.slope_direction = sign_i(v.x);
        c.climbing_slope = true;
        c.set_below(normal);
    }

    fn horizontal_collisions(&mut self, world: &dyn CollisionWorld, v: &mut Vec2) {
        let dir_x = self.moving_direction as f32;
        let mut ray_length = v.x.abs() + SKIN_WIDTH;
        if v.x.abs() < SKIN_WIDTH {
            ray_length = 2.0 * SKIN_WIDTH;
        }

        for i in 0..self.raycaster.horizontal_rays() {
            let base = if dir_x < 0.0 {
                self.raycaster.origins.bottom_left
            } else {
                self.raycaster.origins.bottom_right
            };
            let origin = base + Vec2::Y * (self.raycaster.spacing.horizontal * i as f32);
            let Some(hit) = world.raycast(origin, Vec2::X * dir_x, ray_length, self.settings.collision_mask, Some(self.collider))
            else { continue };

            // Already overlapping: not a wall.
            if hit.distance == 0.0 { continue; }

            let angle = angle_between(hit.normal, Vec2::Y);

            if i == 0 && angle <= self.settings.max_climb_angle {
                if self.collisions.descending_slope {
                    // Descent rewrote vx; climb from the step's own request.
                    self.collisions.descending_slope = false;
                    *v = self.raw_velocity + self.external_force;
                }
                let mut to_slope_start = 0.0;
                if angle != self.collisions.prev_slope_angle {
                    to_slope_start = hit.distance - SKIN_WIDTH;
                    v.x -= to_slope_start * dir_x;
                }
                self.climb_slope(v, angle, hit.normal);
                v.x += to_slope_start * dir_x;
            }

            if !self.collisions.climbing_slope || angle > self.settings.max_climb_angle {
                if hit.one_way { continue; }

                v.x = (hit.distance - SKIN_WIDTH) * dir_x;
                ray_length = hit.distance;

                if self.collisions.climbing_slope {
                    v.y = self.collisions.slope_angle.to_radians().tan() * v.x.abs();
                }

                if dir_x < 0.0 {
                    self.collisions.set_left(hit.normal);
                } else {
                    self.collisions.set_right(hit.normal);
                }
            }
        }
    }

    fn vertical_collisions(&mut self, world: &dyn CollisionWorld, v: &mut Vec2) {
        let dir_y = sign(v.y);
        let mut ray_length = v.y.abs() + SKIN_WIDTH;

        for i in 0..self.raycaster.vertical_rays() {
            let base = if dir_y < 0.0 {
                self.raycaster.origins.bottom_left
            } else {
                self.raycaster.origins.top_left
            };
            let origin = base + Vec2::X * (self.raycaster.spacing.vertical * i as f32 + v.x);
            let Some(hit) = world.raycast(origin, Vec2::Y * dir_y, ray_length, self.settings.collision_mask, Some(self.collider))
            else { continue };

            if hit.one_way && (dir_y > 0.0 || hit.distance == 0.0 || self.falling_through) {
                continue;
            }

            v.y = (hit.distance - SKIN_WIDTH) * dir_y;
            ray_length = hit.distance;

            if self.collisions.climbing_slope {
                let tan = self.collisions.slope_angle.to_radians().tan();
                if tan.abs() > f32::EPSILON {
                    v.x = v.y.abs() / tan * sign(v.x);
                }
            }

            if dir_y < 0.0 {
                self.collisions.set_below(hit.normal);
                self.collisions.below_collider = Some(hit.collider);
                self.collisions.below_one_way = hit.one_way;
            } else {
                self.collisions.set_above(hit.normal);
            }
        }

        if self.collisions.climbing_slope {
            // A different slope may start inside this step's reach.
            let dir_x = sign(v.x);
            let ray_length = v.x.abs() + SKIN_WIDTH;
            let base = if dir_x < 0.0 {
                self.raycaster.origins.bottom_left
            } else {
                self.raycaster.origins.bottom_right
            };
            let origin = base + Vec2::Y * v.y;
            if let Some(hit) = world.raycast(origin, Vec2::X * dir_x, ray_length, self.settings.collision_mask, Some(self.collider)) {
                let angle = angle_between(hit.normal, Vec2::Y);
                if angle != self.collisions.slope_angle {
                    v.x = (hit.distance - SKIN_WIDTH) * dir_x;
                    self.collisions.slope_angle = angle;
                }
            }
        }
    }
}

impl Motor for CharacterMotor {
    fn collider(&self) -> ColliderId { self.collider }

    fn move_by(
        &mut self,
        world: &mut dyn CollisionWorld,
        displacement: Vec2,
        on_moving_motor: bool,
    ) -> CollisionCallbacks {
        let Some(bounds) = world.bounds(self.collider) else {
            warn!(collider = ?self.collider, "motor body is not in the collision world");
            return CollisionCallbacks::default();
        };
        self.raycaster.update(&bounds);
        self.collisions.reset();

        self.raw_velocity = displacement;
        let mut v = displacement + self.external_force;
        if v.x != 0.0 {
            self.moving_direction = sign_i(v.x);
        }

        if v.y < 0.0 {
            self.descend_slope(world, &mut v);
        }
        self.horizontal_collisions(world, &mut v);
        if v.y != 0.0 {
            self.vertical_collisions(world, &mut v);
        }

        world.translate(self.collider, v);
        self.velocity = v;
        self.on_moving_motor = on_moving_motor;

        if on_moving_motor {
            self.collisions.set_below(Vec2::Y);
        }
        let c = &mut self.collisions;
        c.on_slope = c.climbing_slope
            || c.descending_slope
            || (c.below && angle_between(c.below_normal, Vec2::Y) > 0.5);

        let callbacks = self.collisions.callbacks();
        for event in callbacks.events() {
            self.listeners.emit(&event);
        }

        trace!(
            requested = ?displacement,
            resolved = ?v,
            below = self.collisions.below,
            above = self.collisions.above,
            left = self.collisions.left,
            right = self.collisions.right,
            "motor move"
        );

        self.falling_through = false;
        self.external_force = Vec2::ZERO;
        callbacks
    }

    fn push(&mut self, force: Vec2, on_moving_motor: bool) {
        self.external_force += force;
        self.on_moving_motor = on_moving_motor;
    }
}
