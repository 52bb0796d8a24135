/// Moving platform motor and controller.
///
/// Each move sorts nearby riders into two buckets before anything moves:
///
///   before   pushed riders: above a rising platform, or beside a solid
///            platform moving into them
///   after    carried riders: on top of a platform moving down or sideways
///
/// Order of a step: before-bucket riders move, the platform translates,
/// after-bucket riders move. A rider is recorded at most once per step no
/// matter how many rays hit it.

use std::collections::BTreeSet;

use glam::Vec2;
use tracing::{trace, warn};

use super::input::InputSource;
use super::math::sign;
use super::motor::Motor;
use super::query::{ColliderId, CollisionWorld, LayerMask};
use super::raycast::{Raycaster, SKIN_WIDTH};

/// One rider displacement scheduled by a platform.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Passenger {
    pub collider: ColliderId,
    pub velocity: Vec2,
    /// Standing on the platform (forced grounded) rather than shoved.
    pub on_platform: bool,
}

/// Moves riders on behalf of a platform.
pub trait PassengerCarrier {
    fn carry(&mut self, world: &mut dyn CollisionWorld, passenger: &Passenger);
}

/// Riders with a motor resolve collisions; anything else is translated.
impl<M: Motor> PassengerCarrier for [M] {
    fn carry(&mut self, world: &mut dyn CollisionWorld, passenger: &Passenger) {
        match self.iter_mut().find(|m| m.collider() == passenger.collider) {
            Some(motor) => {
                motor.move_by(world, passenger.velocity, passenger.on_platform);
            }
            None => world.translate(passenger.collider, passenger.velocity),
        }
    }
}

/// Carrier for worlds without motor-driven riders.
#[derive(Clone, Copy, Debug, Default)]
pub struct TranslateRiders;

impl PassengerCarrier for TranslateRiders {
    fn carry(&mut self, world: &mut dyn CollisionWorld, passenger: &Passenger) {
        world.translate(passenger.collider, passenger.velocity);
    }
}

#[derive(Debug)]
pub struct PlatformMotor {
    collider: ColliderId,
    raycaster: Raycaster,
    passenger_mask: LayerMask,
    one_way: bool,

    velocity: Vec2,
    raw_velocity: Vec2,
    external_force: Vec2,

    moved: BTreeSet<ColliderId>,
    before: Vec<Passenger>,
    after: Vec<Passenger>,
}

impl PlatformMotor {
    pub fn new(collider: ColliderId, one_way: bool) -> Self {
        PlatformMotor {
            collider,
            raycaster: Raycaster::new(4, 4),
            passenger_mask: LayerMask::CHARACTER,
            one_way,
            velocity: Vec2::ZERO,
            raw_velocity: Vec2::ZERO,
            external_force: Vec2::ZERO,
            moved: BTreeSet::new(),
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    pub fn with_rays(mut self, horizontal: usize, vertical: usize) -> Self {
        self.raycaster.set_ray_counts(horizontal, vertical);
        self
    }

    pub fn with_passenger_mask(mut self, mask: LayerMask) -> Self {
        self.passenger_mask = mask;
        self
    }

    pub fn collider(&self) -> ColliderId { self.collider }
    pub fn is_one_way(&self) -> bool { self.one_way }
    pub fn velocity(&self) -> Vec2 { self.velocity }
    pub fn raw_velocity(&self) -> Vec2 { self.raw_velocity }
    pub fn passengers_before(&self) -> &[Passenger] { &self.before }
    pub fn passengers_after(&self) -> &[Passenger] { &self.after }

    pub fn push(&mut self, force: Vec2) {
        self.external_force += force;
    }

    /// Move the platform by `displacement`, transporting riders.
    pub fn move_by<C: PassengerCarrier + ?Sized>(
        &mut self,
        world: &mut dyn CollisionWorld,
        displacement: Vec2,
        carrier: &mut C,
    ) {
        let Some(bounds) = world.bounds(self.collider) else {
            warn!(collider = ?self.collider, "platform body is not in the collision world");
            return;
        };
        self.raycaster.update(&bounds);
        self.raw_velocity = displacement;
        let v = displacement + self.external_force;
        self.external_force = Vec2::ZERO;

        self.calculate_passengers(world, v);

        for p in &self.before {
            carrier.carry(world, p);
        }
        world.translate(self.collider, v);
        for p in &self.after {
            carrier.carry(world, p);
        }
        self.velocity = v;

        trace!(
            velocity = ?v,
            before = self.before.len(),
            after = self.after.len(),
            "platform move"
        );
    }

    fn record(&mut self, id: ColliderId) -> bool {
        self.moved.insert(id)
    }

    fn calculate_passengers(&mut self, world: &dyn CollisionWorld, v: Vec2) {
        self.moved.clear();
        self.before.clear();
        self.after.clear();

        let dir_x = sign(v.x);
        let dir_y = sign(v.y);
        let origins = self.raycaster.origins;
        let spacing = self.raycaster.spacing;
        let mask = self.passenger_mask;
        let me = Some(self.collider);

        // Vertical movement: riders in the way get pushed first.
        if v.y != 0.0 {
            let ray_length = v.y.abs() + SKIN_WIDTH;
            for i in 0..self.raycaster.vertical_rays() {
                let base = if dir_y < 0.0 { origins.bottom_left } else { origins.top_left };
                let origin = base + Vec2::X * (spacing.vertical * i as f32);
                let Some(hit) = world.raycast(origin, Vec2::Y * dir_y, ray_length, mask, me) else { continue };
                if hit.distance == 0.0 || !self.record(hit.collider) { continue; }
                // Bodies underneath a descending platform are left alone.
                if dir_y > 0.0 {
                    self.before.push(Passenger {
                        collider: hit.collider,
                        velocity: Vec2::new(v.x, v.y - (hit.distance - SKIN_WIDTH) * dir_y),
                        on_platform: true,
                    });
                }
            }
        }

        // Riders on top of a platform moving down or sideways are carried.
        if dir_y < 0.0 || (v.y == 0.0 && v.x != 0.0) {
            let ray_length = 2.0 * SKIN_WIDTH;
            for i in 0..self.raycaster.vertical_rays() {
                let origin = origins.top_left + Vec2::X * (spacing.vertical * i as f32);
                let Some(hit) = world.raycast(origin, Vec2::Y, ray_length, mask, me) else { continue };
                if hit.distance == 0.0 || !self.record(hit.collider) { continue; }
                self.after.push(Passenger { collider: hit.collider, velocity: v, on_platform: true });
            }
        }

        // Horizontal movement of a solid platform shoves bodies aside.
        if !self.one_way && v.x != 0.0 {
            let ray_length = v.x.abs() + SKIN_WIDTH;
            for i in 0..self.raycaster.horizontal_rays() {
                let base = if dir_x < 0.0 { origins.bottom_left } else { origins.bottom_right };
                let origin = base + Vec2::Y * (spacing.horizontal * i as f32);
                let Some(hit) = world.raycast(origin, Vec2::X * dir_x, ray_length, mask, me) else { continue };
                if hit.distance == 0.0 || !self.record(hit.collider) { continue; }
                self.before.push(Passenger {
                    collider: hit.collider,
                    velocity: Vec2::new(v.x - (hit.distance - 2.0 * SKIN_WIDTH) * dir_x, -SKIN_WIDTH),
                    on_platform: false,
                });
            }
        }
    }
}

/// Drives a platform motor from an input source: `velocity = axis * speed`.
pub struct PlatformController {
    motor: PlatformMotor,
    speed: f32,
    input: Option<Box<dyn InputSource>>,
    warned: bool,
}

impl std::fmt::Debug for PlatformController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformController")
            .field("motor", &self.motor)
            .field("speed", &self.speed)
            .field("has_input", &self.input.is_some())
            .finish()
    }
}

impl PlatformController {
    pub fn new(motor: PlatformMotor, speed: f32, input: Option<Box<dyn InputSource>>) -> Self {
        if input.is_none() {
            warn!(collider = ?motor.collider(), "platform has no input source; it will not move");
        }
        PlatformController { motor, speed, input, warned: false }
    }

    pub fn motor(&self) -> &PlatformMotor { &self.motor }
    pub fn motor_mut(&mut self) -> &mut PlatformMotor { &mut self.motor }

    pub fn update<C: PassengerCarrier + ?Sized>(
        &mut self,
        world: &mut dyn CollisionWorld,
        dt: f32,
        carrier: &mut C,
    ) {
        let Some(input) = self.input.as_mut() else {
            if !self.warned {
                warn!(collider = ?self.motor.collider(), "platform skipped: no input source");
                self.warned = true;
            }
            return;
        };
        let position = world.bounds(self.motor.collider()).map(|b| b.center).unwrap_or_default();
        let axis = input.poll(position, dt).axis;
        self.motor.move_by(world, axis * self.speed * dt, carrier);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::collider::{Collider, ColliderSet};
    use crate::domain::geometry::Bounds;
    use crate::domain::motor::{CharacterMotor, MotorSettings};
    use crate::domain::waypoint::{PathMode, WaypointDriver};

    struct Rig {
        world: ColliderSet,
        platform: PlatformMotor,
        riders: Vec<CharacterMotor>,
    }

    fn rig(one_way: bool, rider_min: Vec2, rider_size: Vec2) -> Rig {
        let mut world = ColliderSet::default();
        let mut plat = Collider::body(
            Bounds::from_min_max(Vec2::new(0.0, 2.0), Vec2::new(3.0, 2.5)),
            LayerMask::PLATFORM,
        );
        plat.one_way = one_way;
        let pid = world.insert(plat);
        let rid = world.insert(Collider::body(
            Bounds::from_min_max(rider_min, rider_min + rider_size),
            LayerMask::CHARACTER,
        ));
        Rig {
            world,
            platform: PlatformMotor::new(pid, one_way),
            riders: vec![CharacterMotor::new(rid, MotorSettings::default())],
        }
    }

    fn rider_min(r: &Rig) -> Vec2 {
        r.world.bounds(r.riders[0].collider()).map(|b| b.min()).unwrap_or(Vec2::NAN)
    }

    fn platform_top(r: &Rig) -> f32 {
        r.world.bounds(r.platform.collider()).map(|b| b.max().y).unwrap_or(f32::NAN)
    }

    #[test]
    fn carries_rider_sideways_after_moving() {
        let mut r = rig(false, Vec2::new(1.0, 2.5), Vec2::splat(0.8));
        r.platform.move_by(&mut r.world, Vec2::new(0.2, 0.0), &mut r.riders[..]);
        assert_eq!(r.platform.passengers_after().len(), 1);
        assert!(r.platform.passengers_before().is_empty());
        assert!((rider_min(&r) - Vec2::new(1.2, 2.5)).length() < 1e-5);
        assert!(r.riders[0].collisions().below);
        assert!(r.riders[0].is_on_moving_motor());
    }

    #[test]
    fn pushes_rider_up_before_rising() {
        let mut r = rig(false, Vec2::new(1.0, 2.5), Vec2::splat(0.8));
        r.platform.move_by(&mut r.world, Vec2::new(0.0, 0.3), &mut r.riders[..]);
        assert_eq!(r.platform.passengers_before().len(), 1);
        assert!(r.platform.passengers_before()[0].on_platform);
        assert!((rider_min(&r).y - platform_top(&r)).abs() < 1e-4);
        assert!((platform_top(&r) - 2.8).abs() < 1e-5);
    }

    #[test]
    fn rider_follows_descending_platform() {
        let mut r = rig(false, Vec2::new(1.0, 2.5), Vec2::splat(0.8));
        for _ in 0..5 {
            r.platform.move_by(&mut r.world, Vec2::new(0.0, -0.3), &mut r.riders[..]);
            assert!((rider_min(&r).y - platform_top(&r)).abs() < 1e-4);
            assert!(r.riders[0].collisions().below);
        }
    }

    #[test]
    fn wide_rider_is_moved_once() {
        let mut r = rig(false, Vec2::new(-0.5, 2.5), Vec2::new(4.0, 0.8));
        r.platform.move_by(&mut r.world, Vec2::new(0.25, 0.0), &mut r.riders[..]);
        assert_eq!(r.platform.passengers_after().len(), 1);
        assert!((rider_min(&r).x - -0.25).abs() < 1e-5);
    }

    #[test]
    fn solid_platform_shoves_body_aside() {
        let mut r = rig(false, Vec2::new(3.1, 2.0), Vec2::splat(0.8));
        r.platform.move_by(&mut r.world, Vec2::new(0.5, 0.0), &mut TranslateRiders);
        let pushed = r.platform.passengers_before();
        assert_eq!(pushed.len(), 1);
        assert!(!pushed[0].on_platform);
        let m = rider_min(&r);
        assert!((m.x - 3.515).abs() < 1e-4);
        assert!((m.y - (2.0 - SKIN_WIDTH)).abs() < 1e-5);
    }

    #[test]
    fn one_way_platform_never_shoves() {
        let mut r = rig(true, Vec2::new(3.1, 2.0), Vec2::splat(0.8));
        r.platform.move_by(&mut r.world, Vec2::new(0.5, 0.0), &mut TranslateRiders);
        assert!(r.platform.passengers_before().is_empty());
        assert!((rider_min(&r).x - 3.1).abs() < 1e-6);
    }

    #[test]
    fn controller_follows_waypoints() {
        let mut r = rig(false, Vec2::new(10.0, 10.0), Vec2::splat(0.8));
        let start = r.world.bounds(r.platform.collider()).map(|b| b.center).unwrap_or_default();
        let driver = WaypointDriver::new(vec![start, start + Vec2::new(4.0, 0.0)], PathMode::PingPong, 2.0);
        let pid = r.platform.collider();
        let mut ctl = PlatformController::new(PlatformMotor::new(pid, false), 1.0, Some(Box::new(driver)));
        for _ in 0..10 {
            ctl.update(&mut r.world, 0.1, &mut TranslateRiders);
        }
        let center = r.world.bounds(pid).map(|b| b.center).unwrap_or_default();
        assert!((center - (start + Vec2::new(2.0, 0.0))).length() < 1e-4);
    }

    #[test]
    fn controller_without_input_stays_put() {
        let mut r = rig(false, Vec2::new(10.0, 10.0), Vec2::splat(0.8));
        let pid = r.platform.collider();
        let before = r.world.bounds(pid);
        let mut ctl = PlatformController::new(PlatformMotor::new(pid, false), 1.0, None);
        ctl.update(&mut r.world, 0.1, &mut TranslateRiders);
        assert_eq!(r.world.bounds(pid), before);
    }
}
