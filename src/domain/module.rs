/// Dash and action modules: pluggable time → speed curves.
///
/// A module is a shared, read-only strategy. The controller keeps an
/// `Rc` to it inside a slot that owns the per-episode timers:
///
///   dash     starts one step in (timer = dt), speed is a scalar along x
///   action   starts at zero, velocity is a vector with x mirrored by direction
///
/// Timers clamp to the module's duration; progress = timer / duration.

use std::fmt::Debug;
use std::rc::Rc;

use glam::Vec2;
use serde::Deserialize;

use super::easing::Ease;

// ══════════════════════════════════════════════════════════════
// Contracts
// ══════════════════════════════════════════════════════════════

pub trait DashModule: Debug {
    fn dash_time(&self) -> f32;
    fn uses_collision(&self) -> bool;
    /// Airborne dashes hold altitude (vertical velocity zeroed).
    fn uses_gravity(&self) -> bool;
    fn changes_facing(&self) -> bool;
    fn can_dash_to_sliding_wall(&self) -> bool;
    fn ground_only(&self) -> bool;

    /// Speed over the sub-interval `(prev, curr]` of the dash, in units/s.
    fn speed(&self, prev: f32, curr: f32) -> f32;

    fn progress(&self, timer: f32) -> f32 {
        let t = self.dash_time();
        if t <= 0.0 { 1.0 } else { timer / t }
    }
}

pub trait ActionModule: Debug {
    fn action_time(&self) -> f32;
    fn uses_gravity(&self) -> bool;
    fn can_use_to_sliding_wall(&self) -> bool;
    fn ground_only(&self) -> bool;

    /// Velocity over `(prev, curr]`, facing right.
    fn velocity(&self, prev: f32, curr: f32) -> Vec2;

    fn progress(&self, timer: f32) -> f32 {
        let t = self.action_time();
        if t <= 0.0 { 1.0 } else { timer / t }
    }
}

/// Normalized (prev, curr) pair clamped to [0, 1].
fn normalized(prev: f32, curr: f32, duration: f32) -> (f32, f32) {
    ((prev / duration).min(1.0), (curr / duration).min(1.0))
}

// ══════════════════════════════════════════════════════════════
// Basic dash
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Debug, Deserialize)]
#[serde(default)]
pub struct BasicDashModule {
    pub dash_time: f32,
    pub distance: f32,
    pub ease: Ease,
    pub use_collision: bool,
    pub use_gravity: bool,
    pub change_facing: bool,
    pub can_dash_to_sliding_wall: bool,
    pub ground_only: bool,
}

impl Default for BasicDashModule {
    fn default() -> Self {
        BasicDashModule {
            dash_time: 0.15,
            distance: 3.0,
            ease: Ease::Linear,
            use_collision: true,
            use_gravity: true,
            change_facing: true,
            can_dash_to_sliding_wall: false,
            ground_only: false,
        }
    }
}

impl DashModule for BasicDashModule {
    fn dash_time(&self) -> f32 { self.dash_time }
    fn uses_collision(&self) -> bool { self.use_collision }
    fn uses_gravity(&self) -> bool { self.use_gravity }
    fn changes_facing(&self) -> bool { self.change_facing }
    fn can_dash_to_sliding_wall(&self) -> bool { self.can_dash_to_sliding_wall }
    fn ground_only(&self) -> bool { self.ground_only }

    fn speed(&self, prev: f32, curr: f32) -> f32 {
        if self.dash_time <= 0.0 { return 0.0; }
        let (pt, t) = normalized(prev, curr, self.dash_time);
        let displacement = self.ease.apply(0.0, self.distance, t) - self.ease.apply(0.0, self.distance, pt);
        let elapsed = (t - pt) * self.dash_time;
        if displacement <= 0.0 || elapsed <= 0.0 { return 0.0; }
        displacement / elapsed
    }
}

// ══════════════════════════════════════════════════════════════
// Teleport dash
// ══════════════════════════════════════════════════════════════

/// Covers the whole distance in the single step that crosses the cast time.
#[derive(Clone, Copy, PartialEq, Debug, Deserialize)]
#[serde(default)]
pub struct TeleportDashModule {
    pub dash_time: f32,
    pub distance: f32,
    pub cast_time: f32,
}

impl Default for TeleportDashModule {
    fn default() -> Self {
        TeleportDashModule { dash_time: 0.25, distance: 5.0, cast_time: 0.2 }
    }
}

impl DashModule for TeleportDashModule {
    fn dash_time(&self) -> f32 { self.dash_time }
    fn uses_collision(&self) -> bool { false }
    fn uses_gravity(&self) -> bool { true }
    fn changes_facing(&self) -> bool { true }
    fn can_dash_to_sliding_wall(&self) -> bool { true }
    fn ground_only(&self) -> bool { false }

    fn speed(&self, prev: f32, curr: f32) -> f32 {
        if self.dash_time <= 0.0 { return 0.0; }
        if !(prev < self.cast_time && self.cast_time <= curr) { return 0.0; }
        let (pt, t) = normalized(prev, curr, self.dash_time);
        let elapsed = (t - pt) * self.dash_time;
        if elapsed <= 0.0 { 0.0 } else { self.distance / elapsed }
    }
}

// ══════════════════════════════════════════════════════════════
// Leap action
// ══════════════════════════════════════════════════════════════

/// Eased jump-and-lunge along a fixed displacement.
#[derive(Clone, Copy, PartialEq, Debug, Deserialize)]
#[serde(default)]
pub struct LeapActionModule {
    pub action_time: f32,
    pub displacement: Vec2,
    pub ease: Ease,
    pub use_gravity: bool,
    pub can_use_to_sliding_wall: bool,
    pub ground_only: bool,
}

impl Default for LeapActionModule {
    fn default() -> Self {
        LeapActionModule {
            action_time: 0.3,
            displacement: Vec2::new(3.0, 1.5),
            ease: Ease::QuadOut,
            use_gravity: false,
            can_use_to_sliding_wall: false,
            ground_only: true,
        }
    }
}

impl ActionModule for LeapActionModule {
    fn action_time(&self) -> f32 { self.action_time }
    fn uses_gravity(&self) -> bool { self.use_gravity }
    fn can_use_to_sliding_wall(&self) -> bool { self.can_use_to_sliding_wall }
    fn ground_only(&self) -> bool { self.ground_only }

    fn velocity(&self, prev: f32, curr: f32) -> Vec2 {
        if self.action_time <= 0.0 { return Vec2::ZERO; }
        let (pt, t) = normalized(prev, curr, self.action_time);
        let elapsed = (t - pt) * self.action_time;
        if elapsed <= 0.0 { return Vec2::ZERO; }
        let at = |s: f32| Vec2::new(
            self.ease.apply(0.0, self.displacement.x, s),
            self.ease.apply(0.0, self.displacement.y, s),
        );
        (at(t) - at(pt)) / elapsed
    }
}

// ══════════════════════════════════════════════════════════════
// Slots (module + episode timers)
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default)]
pub struct DashSlot {
    module: Option<Rc<dyn DashModule>>,
    direction: i32,
    prev_timer: f32,
    timer: f32,
}

impl DashSlot {
    pub fn new(module: Option<Rc<dyn DashModule>>) -> Self {
        DashSlot { module, direction: 1, prev_timer: 0.0, timer: 0.0 }
    }

    pub fn module(&self) -> Option<&Rc<dyn DashModule>> { self.module.as_ref() }
    pub fn set_module(&mut self, module: Option<Rc<dyn DashModule>>) { self.module = module; }
    pub fn direction(&self) -> i32 { self.direction }
    pub fn timer(&self) -> f32 { self.timer }

    pub fn start(&mut self, direction: i32, dt: f32) {
        self.direction = direction;
        self.prev_timer = 0.0;
        self.timer = dt;
    }

    pub fn update(&mut self, dt: f32) {
        self.prev_timer = self.timer;
        self.timer += dt;
        if let Some(m) = &self.module {
            self.timer = self.timer.min(m.dash_time());
        }
    }

    pub fn speed(&self) -> f32 {
        self.module.as_ref().map_or(0.0, |m| m.speed(self.prev_timer, self.timer))
    }

    /// Without a module the episode is over.
    pub fn progress(&self) -> f32 {
        self.module.as_ref().map_or(1.0, |m| m.progress(self.timer))
    }
}

#[derive(Clone, Debug, Default)]
pub struct ActionSlot {
    module: Option<Rc<dyn ActionModule>>,
    direction: i32,
    prev_timer: f32,
    timer: f32,
}

impl ActionSlot {
    pub fn new(module: Option<Rc<dyn ActionModule>>) -> Self {
        ActionSlot { module, direction: 1, prev_timer: 0.0, timer: 0.0 }
    }

    pub fn module(&self) -> Option<&Rc<dyn ActionModule>> { self.module.as_ref() }
    pub fn set_module(&mut self, module: Option<Rc<dyn ActionModule>>) { self.module = module; }
    pub fn direction(&self) -> i32 { self.direction }
    pub fn timer(&self) -> f32 { self.timer }

    pub fn start(&mut self, direction: i32) {
        self.direction = direction;
        self.prev_timer = 0.0;
        self.timer = 0.0;
    }

    pub fn update(&mut self, dt: f32) {
        self.prev_timer = self.timer;
        self.timer += dt;
        if let Some(m) = &self.module {
            self.timer = self.timer.min(m.action_time());
        }
    }

    /// Velocity for the current sub-interval, x mirrored by direction.
    pub fn velocity(&self) -> Vec2 {
        self.module.as_ref().map_or(Vec2::ZERO, |m| {
            m.velocity(self.prev_timer, self.timer) * Vec2::new(self.direction as f32, 1.0)
        })
    }

    pub fn progress(&self) -> f32 {
        self.module.as_ref().map_or(1.0, |m| m.progress(self.timer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn basic_dash_integrates_to_distance() {
        for ease in [Ease::Linear, Ease::QuadOut, Ease::CubicInOut] {
            let m = BasicDashModule { ease, ..Default::default() };
            let (mut prev, mut curr, mut covered) = (0.0f32, 0.0f32, 0.0f32);
            while curr < m.dash_time {
                prev = curr;
                curr = (curr + DT).min(m.dash_time);
                covered += m.speed(prev, curr) * (curr - prev);
            }
            assert!((covered - 3.0).abs() < 1e-3, "{:?} covered {covered}", ease);
            assert!(prev < curr);
        }
    }

    #[test]
    fn linear_dash_speed_is_average() {
        let m = BasicDashModule::default();
        assert!((m.speed(0.0, DT) - 3.0 / 0.15).abs() < 1e-2);
        assert_eq!(m.speed(0.15, 0.15), 0.0);
    }

    #[test]
    fn teleport_fires_once_at_cast_time() {
        let m = TeleportDashModule::default();
        let mut fired = 0;
        let mut covered = 0.0;
        let (mut prev, mut curr) = (0.0f32, DT);
        loop {
            let s = m.speed(prev, curr);
            if s > 0.0 { fired += 1; }
            covered += s * (curr - prev);
            if curr >= m.dash_time { break; }
            prev = curr;
            curr = (curr + DT).min(m.dash_time);
        }
        assert_eq!(fired, 1);
        assert!((covered - 5.0).abs() < 1e-3);
    }

    #[test]
    fn dash_slot_progress_is_monotonic() {
        let mut slot = DashSlot::new(Some(Rc::new(BasicDashModule::default())));
        slot.start(-1, DT);
        let mut last = slot.progress();
        for _ in 0..20 {
            slot.update(DT);
            let p = slot.progress();
            assert!(p >= last);
            last = p;
        }
        assert!((last - 1.0).abs() < 1e-6);
        assert_eq!(slot.direction(), -1);
    }

    #[test]
    fn empty_slots_are_finished_and_still() {
        let dash = DashSlot::default();
        assert_eq!(dash.progress(), 1.0);
        assert_eq!(dash.speed(), 0.0);
        let action = ActionSlot::default();
        assert_eq!(action.progress(), 1.0);
        assert_eq!(action.velocity(), Vec2::ZERO);
    }

    #[test]
    fn leap_velocity_mirrors_direction() {
        let mut slot = ActionSlot::new(Some(Rc::new(LeapActionModule::default())));
        slot.start(-1);
        slot.update(DT);
        let v = slot.velocity();
        assert!(v.x < 0.0);
        assert!(v.y > 0.0);

        let mut covered = Vec2::ZERO;
        slot.start(1);
        while slot.progress() < 1.0 {
            slot.update(DT);
            covered += slot.velocity() * DT;
        }
        assert!((covered - Vec2::new(3.0, 1.5)).length() < 0.05);
    }
}
