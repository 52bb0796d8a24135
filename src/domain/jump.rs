/// Jump tuning, derived physics and input buffering.
///
/// Designer parameters are height and time; gravity and launch speeds
/// follow from the projectile relations:
///
///   gravity        = -2 · max_height / time_to_apex²
///   max_jump_speed = |gravity| · time_to_apex
///   min_jump_speed = √(2 · |gravity| · min_height)

use serde::Deserialize;

use super::math::frames_for;

#[derive(Clone, Copy, PartialEq, Debug, Deserialize)]
#[serde(default)]
pub struct JumpSettings {
    pub variable_height: bool,
    pub air_jumps_allowed: u32,
    pub max_height: f32,
    pub min_height: f32,
    pub time_to_apex: f32,
    pub ladder_jump_force: f32,
    /// Seconds after walking off a ledge that still count as grounded.
    pub falling_grace_time: f32,
    /// Seconds a jump pressed before landing stays buffered.
    pub will_jump_time: f32,
}

impl Default for JumpSettings {
    fn default() -> Self {
        JumpSettings {
            variable_height: true,
            air_jumps_allowed: 1,
            max_height: 3.5,
            min_height: 1.0,
            time_to_apex: 0.4,
            ladder_jump_force: 0.4,
            falling_grace_time: 0.09,
            will_jump_time: 0.15,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct JumpPhysics {
    pub gravity: f32,
    pub max_jump_speed: f32,
    pub min_jump_speed: f32,
}

impl JumpPhysics {
    pub fn from_settings(s: &JumpSettings) -> Self {
        let apex = s.time_to_apex.max(f32::EPSILON);
        let gravity = -2.0 * s.max_height / (apex * apex);
        JumpPhysics {
            gravity,
            max_jump_speed: gravity.abs() * apex,
            min_jump_speed: (2.0 * gravity.abs() * s.min_height.max(0.0)).sqrt(),
        }
    }
}

/// Signed countdown frames; a negative value means the window is closed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct JumpBuffer {
    will_jump: i32,
    falling_grace: i32,
}

impl Default for JumpBuffer {
    fn default() -> Self {
        JumpBuffer { will_jump: -1, falling_grace: -1 }
    }
}

impl JumpBuffer {
    pub fn tick(&mut self) {
        if self.will_jump >= 0 { self.will_jump -= 1; }
        if self.falling_grace >= 0 { self.falling_grace -= 1; }
    }

    pub fn arm_will_jump(&mut self, time: f32, time_step: f32) {
        self.will_jump = frames_for(time, time_step);
    }

    pub fn arm_falling_grace(&mut self, time: f32, time_step: f32) {
        self.falling_grace = frames_for(time, time_step);
    }

    pub fn will_jump(&self) -> bool { self.will_jump >= 0 }
    pub fn in_falling_grace(&self) -> bool { self.falling_grace >= 0 }

    /// Close both windows after a successful jump.
    pub fn consume(&mut self) {
        self.will_jump = -1;
        self.falling_grace = -1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_speeds_match_height_and_apex() {
        let p = JumpPhysics::from_settings(&JumpSettings::default());
        assert!((p.gravity - -43.75).abs() < 1e-3);
        assert!((p.max_jump_speed - 17.5).abs() < 1e-4);
        assert!((p.max_jump_speed + p.gravity * 0.4).abs() < 1e-4);
        assert!((p.min_jump_speed - (2.0f32 * 43.75).sqrt()).abs() < 1e-4);
    }

    #[test]
    fn min_jump_reaches_min_height() {
        let s = JumpSettings::default();
        let p = JumpPhysics::from_settings(&s);
        let h = p.min_jump_speed * p.min_jump_speed / (2.0 * p.gravity.abs());
        assert!((h - s.min_height).abs() < 1e-4);
    }

    #[test]
    fn buffer_counts_down_then_closes() {
        let mut b = JumpBuffer::default();
        assert!(!b.will_jump());
        b.arm_will_jump(0.05, 1.0 / 60.0);
        for _ in 0..4 {
            assert!(b.will_jump());
            b.tick();
        }
        assert!(!b.will_jump());
    }

    #[test]
    fn consume_closes_both_windows() {
        let mut b = JumpBuffer::default();
        b.arm_will_jump(0.15, 1.0 / 60.0);
        b.arm_falling_grace(0.09, 1.0 / 60.0);
        assert!(b.in_falling_grace());
        b.consume();
        assert!(!b.will_jump());
        assert!(!b.in_falling_grace());
    }
}
