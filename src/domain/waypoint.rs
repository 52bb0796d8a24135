/// Waypoint path driver.
///
/// Walks a polyline at constant speed and reports, each step, the velocity
/// that brings the body from its current position to the next point on the
/// path. Cyclic paths wrap from the last point to the first; ping-pong
/// paths walk back the way they came. The driver pauses `wait_time`
/// seconds at every waypoint it reaches.

use glam::Vec2;

use super::input::{FrameInput, InputSource};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum PathMode {
    #[default]
    Cyclic,
    PingPong,
}

#[derive(Clone, Debug)]
pub struct WaypointDriver {
    points: Vec<Vec2>,
    mode: PathMode,
    speed: f32,
    wait_time: f32,

    prev: usize,
    next: usize,
    segment_length: f32,
    progress: f32,
    waiting: f32,
}

impl WaypointDriver {
    pub fn new(points: Vec<Vec2>, mode: PathMode, speed: f32) -> Self {
        let mut d = WaypointDriver {
            points,
            mode,
            speed,
            wait_time: 0.0,
            prev: 0,
            next: 1,
            segment_length: 0.0,
            progress: 0.0,
            waiting: 0.0,
        };
        d.set_path(0, 1);
        d
    }

    pub fn with_wait(mut self, wait_time: f32) -> Self {
        self.wait_time = wait_time.max(0.0);
        self
    }

    pub fn points(&self) -> &[Vec2] { &self.points }
    pub fn mode(&self) -> PathMode { self.mode }

    /// Length of the virtual index space: ping-pong paths revisit the
    /// interior points on the way back.
    fn span(&self) -> usize {
        let n = self.points.len();
        match self.mode {
            PathMode::Cyclic => n.max(1),
            PathMode::PingPong => (n * 2).saturating_sub(2).max(1),
        }
    }

    fn point(&self, index: usize) -> Vec2 {
        let n = self.points.len();
        if n == 0 { return Vec2::ZERO; }
        let i = index % self.span();
        if i < n { self.points[i] } else { self.points[2 * n - 2 - i] }
    }

    fn set_path(&mut self, start: usize, end: usize) {
        self.prev = start;
        self.next = end % self.span();
        self.segment_length = self.point(self.prev).distance(self.point(self.next));
        self.progress = 0.0;
    }

    /// Target position after advancing `dt` seconds along the path.
    pub fn advance(&mut self, dt: f32) -> Vec2 {
        if self.points.len() < 2 {
            return self.point(0);
        }
        if self.waiting > 0.0 {
            self.waiting = (self.waiting - dt).max(0.0);
            return self.point(self.prev);
        }

        if self.segment_length > f32::EPSILON {
            self.progress += dt * self.speed / self.segment_length;
        } else {
            self.progress = 1.0;
        }
        self.progress = self.progress.clamp(0.0, 1.0);

        let from = self.point(self.prev);
        let to = self.point(self.next);
        if self.progress >= 1.0 {
            let start = self.next;
            self.set_path(start, start + 1);
            self.waiting = self.wait_time;
            return to;
        }
        from.lerp(to, self.progress)
    }
}

impl InputSource for WaypointDriver {
    fn poll(&mut self, position: Vec2, dt: f32) -> FrameInput {
        if dt <= 0.0 { return FrameInput::default(); }
        let target = self.advance(dt);
        FrameInput::with_axis((target - position) / dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Vec2> {
        vec![Vec2::ZERO, Vec2::new(2.0, 0.0), Vec2::new(2.0, 2.0)]
    }

    #[test]
    fn constant_speed_along_segment() {
        let mut d = WaypointDriver::new(square(), PathMode::Cyclic, 2.0);
        let p = d.advance(0.25);
        assert!((p - Vec2::new(0.5, 0.0)).length() < 1e-5);
        let p = d.advance(0.25);
        assert!((p - Vec2::new(1.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn cyclic_wraps_to_first_point() {
        let mut d = WaypointDriver::new(square(), PathMode::Cyclic, 100.0);
        let visited: Vec<Vec2> = (0..4).map(|_| d.advance(1.0)).collect();
        assert_eq!(visited, vec![Vec2::new(2.0, 0.0), Vec2::new(2.0, 2.0), Vec2::ZERO, Vec2::new(2.0, 0.0)]);
    }

    #[test]
    fn ping_pong_walks_back() {
        let mut d = WaypointDriver::new(square(), PathMode::PingPong, 100.0);
        let visited: Vec<Vec2> = (0..5).map(|_| d.advance(1.0)).collect();
        assert_eq!(
            visited,
            vec![Vec2::new(2.0, 0.0), Vec2::new(2.0, 2.0), Vec2::new(2.0, 0.0), Vec2::ZERO, Vec2::new(2.0, 0.0)]
        );
    }

    #[test]
    fn waits_at_each_point() {
        let mut d = WaypointDriver::new(square(), PathMode::Cyclic, 100.0).with_wait(0.5);
        assert_eq!(d.advance(1.0), Vec2::new(2.0, 0.0));
        assert_eq!(d.advance(0.25), Vec2::new(2.0, 0.0));
        assert_eq!(d.advance(0.25), Vec2::new(2.0, 0.0));
        assert_eq!(d.advance(1.0), Vec2::new(2.0, 2.0));
    }

    #[test]
    fn poll_reports_velocity_to_target() {
        let mut d = WaypointDriver::new(square(), PathMode::Cyclic, 2.0);
        let input = d.poll(Vec2::ZERO, 0.5);
        assert!((input.axis - Vec2::new(2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn single_point_path_is_stationary() {
        let mut d = WaypointDriver::new(vec![Vec2::ONE], PathMode::Cyclic, 2.0);
        assert_eq!(d.advance(1.0), Vec2::ONE);
    }
}
