/// The step function: advances a scene by one fixed time step.
///
/// Processing order:
///   1. Platforms (carry their passengers before and after moving)
///   2. Trigger volumes (ladder enter / stay / exit, zone setters)
///   3. Characters (latch input, run the movement state machine)
///   4. Drain controller events, respawn bodies that fell out
///
/// `FixedTimestep` turns wall-clock frame time into a bounded number of
/// such steps.

use tracing::trace;

use crate::domain::input::FrameInput;
use super::event::SceneEvent;
use super::world::{Scene, LADDER_ZONE_HEIGHT};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

/// `inputs[i]` drives character `i`; missing entries read as idle.
pub fn step(scene: &mut Scene, inputs: &[FrameInput], dt: f32) -> Vec<SceneEvent> {
    let mut events = Vec::new();
    scene.tick += 1;

    resolve_platforms(scene, dt);
    resolve_triggers(scene, &mut events);
    resolve_characters(scene, inputs, dt, &mut events);
    resolve_fallen(scene, &mut events);

    trace!(tick = scene.tick, events = events.len(), "scene step");
    events
}

fn resolve_platforms(scene: &mut Scene, dt: f32) {
    let Scene { platforms, colliders, characters, .. } = scene;
    for p in platforms.iter_mut() {
        p.update(colliders, dt, characters.as_mut_slice());
    }
}

fn resolve_triggers(scene: &mut Scene, events: &mut Vec<SceneEvent>) {
    for body in 0..scene.characters.len() {
        let Some(bounds) = scene.body_bounds(body) else { continue };

        let inside = scene.ladders.iter().position(|l| l.bounds.overlaps(&bounds));
        let prev = scene.ladder_contacts[body];
        let c = &mut scene.characters[body];

        if let Some(old) = prev.filter(|p| Some(*p) != inside) {
            c.ladder_area_exit();
            c.clear_ladder_restricted_area();
            events.push(SceneEvent::LadderExited { body, ladder: old });
        }

        if let Some(idx) = inside {
            let ladder = scene.ladders[idx];
            if prev == Some(idx) {
                c.ladder_area_stay(ladder.bounds, LADDER_ZONE_HEIGHT, LADDER_ZONE_HEIGHT);
            } else {
                c.ladder_area_enter(ladder.bounds, LADDER_ZONE_HEIGHT, LADDER_ZONE_HEIGHT);
                match ladder.restrict {
                    Some(r) => c.set_ladder_restricted_area(r.bounds, r.ignore_top),
                    None => c.clear_ladder_restricted_area(),
                }
                events.push(SceneEvent::LadderEntered { body, ladder: idx });
            }
        }
        scene.ladder_contacts[body] = inside;

        for zone in &scene.zones {
            if zone.bounds.contains(bounds.center) {
                c.set_ladder_zone(zone.zone);
            }
        }
    }
}

fn resolve_characters(scene: &mut Scene, inputs: &[FrameInput], dt: f32, events: &mut Vec<SceneEvent>) {
    let Scene { characters, colliders, .. } = scene;
    for (body, c) in characters.iter_mut().enumerate() {
        let input = inputs.get(body).copied().unwrap_or_default();
        c.read_input(input, dt);
        c.update(colliders, dt);
        events.extend(c.drain_events().into_iter().map(|event| SceneEvent::Character { body, event }));
    }
}

fn resolve_fallen(scene: &mut Scene, events: &mut Vec<SceneEvent>) {
    let kill = scene.kill_line();
    for body in 0..scene.characters.len() {
        let fallen = scene.body_bounds(body).is_some_and(|b| b.max().y < kill);
        if fallen {
            scene.respawn(body);
            events.push(SceneEvent::Respawned { body });
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Fixed time step
// ══════════════════════════════════════════════════════════════

/// Accumulates frame time and hands out whole simulation steps.
#[derive(Clone, Copy, Debug)]
pub struct FixedTimestep {
    step: f32,
    max_steps: u32,
    accumulator: f32,
}

impl FixedTimestep {
    pub fn new(step: f32, max_steps: u32) -> Self {
        FixedTimestep { step: step.max(1e-4), max_steps: max_steps.max(1), accumulator: 0.0 }
    }

    pub fn step(&self) -> f32 { self.step }

    /// Add `elapsed` seconds; returns how many steps to run now. Backlog
    /// beyond `max_steps` is dropped so a stall cannot snowball.
    pub fn advance(&mut self, elapsed: f32) -> u32 {
        self.accumulator += elapsed.max(0.0);
        let mut n = 0;
        while self.accumulator >= self.step && n < self.max_steps {
            self.accumulator -= self.step;
            n += 1;
        }
        if n == self.max_steps {
            self.accumulator = self.accumulator.min(self.step);
        }
        n
    }

    /// Fraction of a step left in the accumulator.
    pub fn alpha(&self) -> f32 { self.accumulator / self.step }

    pub fn reset(&mut self) { self.accumulator = 0.0; }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use crate::config::AppConfig;
    use crate::domain::events::ControllerEvent;
    use crate::domain::input::ButtonState;
    use crate::domain::state::MotorState;
    use crate::sim::level::parse_level;
    use crate::sim::world::CharacterTemplate;

    const DT: f32 = 1.0 / 60.0;

    fn scene(text: &str) -> Scene {
        let def = parse_level(text).unwrap();
        Scene::from_level(&def, CharacterTemplate::from_config(&AppConfig::default()))
    }

    fn run(scene: &mut Scene, input: FrameInput, frames: usize) -> Vec<SceneEvent> {
        let mut events = vec![];
        for _ in 0..frames {
            events.extend(step(scene, &[input], DT));
        }
        events
    }

    #[test]
    fn walks_with_input() {
        let mut s = scene("P.........\n##########");
        let x0 = s.body_bounds(0).unwrap().center.x;
        run(&mut s, FrameInput::with_axis(Vec2::X), 30);
        let x1 = s.body_bounds(0).unwrap().center.x;
        assert!((x1 - x0 - 4.0).abs() < 0.05, "moved {}", x1 - x0);
        assert_eq!(s.tick, 30);
    }

    #[test]
    fn jump_events_are_tagged() {
        let mut s = scene("P...\n####");
        let events = step(&mut s, &[FrameInput { jump: ButtonState::tap(), ..Default::default() }], DT);
        assert!(events.contains(&SceneEvent::Character { body: 0, event: ControllerEvent::NormalJump }));
    }

    #[test]
    fn rider_follows_moving_platform() {
        let mut s = scene(
            "!platform 0 1.5 4 0.5 2 cyclic 2,1.75 10,1.75\n\
             ...............\n\
             .P.............\n\
             ...............\n\
             ...............",
        );
        assert_eq!(s.player().unwrap().state(), MotorState::OnGround);
        let x0 = s.body_bounds(0).unwrap().min().x;
        run(&mut s, FrameInput::default(), 60);
        let b = s.body_bounds(0).unwrap();
        assert!((b.min().x - x0 - 2.0).abs() < 0.05, "rode {}", b.min().x - x0);
        assert!((b.min().y - 2.0).abs() < 0.05);
        assert_eq!(s.player().unwrap().state(), MotorState::OnGround);
    }

    #[test]
    fn ladder_volume_enter_and_exit() {
        let mut s = scene(".....\n..H..\n..H..\n..H..\n.PH..\n#####");
        let events = run(&mut s, FrameInput::with_axis(Vec2::X), 3);
        assert!(events.contains(&SceneEvent::LadderEntered { body: 0, ladder: 0 }));
        assert!(s.player().unwrap().is_in_ladder_area());

        run(&mut s, FrameInput::with_axis(Vec2::Y), 2);
        assert_eq!(s.player().unwrap().state(), MotorState::OnLadder);

        let events = run(&mut s, FrameInput::with_axis(Vec2::NEG_X), 15);
        assert!(events.contains(&SceneEvent::LadderExited { body: 0, ladder: 0 }));
        assert!(!s.player().unwrap().is_in_ladder_area());
        assert_ne!(s.player().unwrap().state(), MotorState::OnLadder);
    }

    #[test]
    fn zone_volume_forces_zone() {
        let mut s = scene("!zone top 0 1 3 1\n.....\n.P...\n#####");
        step(&mut s, &[FrameInput::default()], DT);
        // Outside any ladder area nothing recomputes the zone.
        assert_eq!(s.player().unwrap().ladder().zone(), crate::domain::ladder::LadderZone::Top);
    }

    #[test]
    fn falling_out_respawns() {
        let mut s = scene("P..\n...");
        let events = run(&mut s, FrameInput::default(), 120);
        assert!(events.contains(&SceneEvent::Respawned { body: 0 }));
        assert!(s.body_bounds(0).unwrap().max().y > s.kill_line());
    }

    #[test]
    fn timestep_hands_out_whole_steps() {
        let mut t = FixedTimestep::new(DT, 5);
        assert_eq!(t.advance(0.055), 3);
        assert!(t.alpha() < 1.0);
        assert_eq!(t.advance(DT * 0.5), 0);
        assert_eq!(t.advance(DT * 0.6), 1);
    }

    #[test]
    fn timestep_drops_backlog() {
        let mut t = FixedTimestep::new(DT, 5);
        assert_eq!(t.advance(1.0), 5);
        assert!(t.alpha() <= 1.0);
        assert!(t.advance(0.0) <= 1);
    }
}
