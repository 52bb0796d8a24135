/// Scalar and vector helpers shared by the motor and the controller.
///
/// Angles are degrees at the API surface and radians inside trig calls.
/// `sign` follows the platformer convention: zero counts as positive.

use glam::Vec2;

/// Unsigned angle between two vectors in degrees, 0 if either is zero-length.
pub fn angle_between(a: Vec2, b: Vec2) -> f32 {
    let denom = (a.length_squared() * b.length_squared()).sqrt();
    if denom < 1e-15 { return 0.0; }
    let cos = (a.dot(b) / denom).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Sign as ±1.0 with `sign(0.0) == 1.0`.
#[inline]
pub fn sign(x: f32) -> f32 {
    if x >= 0.0 { 1.0 } else { -1.0 }
}

/// Sign as ±1 integer with `sign_i(0.0) == 1`.
#[inline]
pub fn sign_i(x: f32) -> i32 {
    if x >= 0.0 { 1 } else { -1 }
}

/// Sign with a dead zone: -1, 0 or 1.
#[inline]
pub fn sign_or_zero(x: f32) -> i32 {
    if x > 0.0 { 1 } else if x < 0.0 { -1 } else { 0 }
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Critically damped spring toward `target`.
///
/// `velocity` carries the spring state between calls. Overshoot is
/// prevented: if the result would pass the target it lands on it and the
/// carried velocity is zeroed.
pub fn smooth_damp(
    current: f32,
    target: f32,
    velocity: &mut f32,
    smooth_time: f32,
    max_speed: f32,
    dt: f32,
) -> f32 {
    let smooth_time = smooth_time.max(0.0001);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let exp = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let max_change = max_speed * smooth_time;
    let change = (current - target).clamp(-max_change, max_change);
    let clamped_target = current - change;

    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * exp;
    let mut output = clamped_target + (change + temp) * exp;

    if (target - current > 0.0) == (output > target) {
        output = target;
        *velocity = (output - target) / dt.max(1e-6);
    }
    output
}

/// Number of fixed steps covering `time` seconds, rounded to nearest.
pub fn frames_for(time: f32, time_step: f32) -> i32 {
    if time_step <= 0.0 { return 0; }
    (time / time_step).round() as i32
}
