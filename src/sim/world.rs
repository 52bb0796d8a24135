/// Scene: everything one running level owns.
///
///   - `colliders`  the collision world (static geometry, platforms, bodies)
///   - `characters` movement controllers; index 0 is the player
///   - `platforms`  waypoint-driven platform controllers
///   - `ladders` / `zones`  trigger volumes, checked once per step
///
/// Built from a `LevelDef` plus the configured tuning. Characters are
/// rebuilt from `CharacterTemplate` on respawn.

use std::rc::Rc;

use glam::Vec2;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::domain::collider::{Collider, ColliderSet};
use crate::domain::controller::{ControllerSettings, MovementController};
use crate::domain::geometry::Bounds;
use crate::domain::module::{ActionModule, DashModule};
use crate::domain::motor::{CharacterMotor, Motor, MotorSettings};
use crate::domain::platform::{PlatformController, PlatformMotor};
use crate::domain::query::{ColliderId, CollisionWorld, LayerMask};
use crate::domain::waypoint::WaypointDriver;
use crate::sim::level::{LadderDef, LevelDef, ZoneDef, BODY_SIZE};

/// Height of the top and bottom zones of every ladder.
pub const LADDER_ZONE_HEIGHT: f32 = 1.0;
/// Bodies whose top falls this far below the level are respawned.
pub const KILL_DEPTH: f32 = 8.0;

/// What a character is rebuilt from.
#[derive(Clone, Debug)]
pub struct CharacterTemplate {
    pub motor: MotorSettings,
    pub settings: ControllerSettings,
    pub dash: Option<Rc<dyn DashModule>>,
    pub action: Option<Rc<dyn ActionModule>>,
}

impl CharacterTemplate {
    pub fn from_config(cfg: &AppConfig) -> Self {
        CharacterTemplate {
            motor: cfg.motor,
            settings: cfg.controller_settings(),
            dash: cfg.dash_module(),
            action: cfg.action_module(),
        }
    }

    fn build(&self, collider: ColliderId) -> MovementController {
        let mut c = MovementController::new(CharacterMotor::new(collider, self.motor), self.settings);
        c.change_dash_module(self.dash.clone(), false);
        c.change_action_module(self.action.clone(), false);
        c
    }
}

#[derive(Debug)]
pub struct Scene {
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub tick: u64,

    pub colliders: ColliderSet,
    pub characters: Vec<MovementController>,
    pub platforms: Vec<PlatformController>,
    pub ladders: Vec<LadderDef>,
    pub zones: Vec<ZoneDef>,

    spawn: Vec2,
    template: CharacterTemplate,
    /// Ladder each character currently overlaps.
    pub(crate) ladder_contacts: Vec<Option<usize>>,
}

impl Scene {
    pub fn from_level(def: &LevelDef, template: CharacterTemplate) -> Self {
        let mut colliders = ColliderSet::default();
        for b in &def.solids { colliders.insert(Collider::solid(*b)); }
        for b in &def.one_ways { colliders.insert(Collider::one_way(*b)); }
        for (b, rise) in &def.ramps { colliders.insert(Collider::ramp(*b, *rise)); }

        let mut platforms = Vec::with_capacity(def.platforms.len());
        for p in &def.platforms {
            let mut collider = Collider::body(p.bounds, LayerMask::PLATFORM);
            collider.one_way = p.one_way;
            let id = colliders.insert(collider);
            let driver = WaypointDriver::new(p.points.clone(), p.mode, p.speed);
            platforms.push(PlatformController::new(PlatformMotor::new(id, p.one_way), 1.0, Some(Box::new(driver))));
        }

        let mut scene = Scene {
            name: def.name.clone(),
            width: def.width,
            height: def.height,
            tick: 0,
            colliders,
            characters: vec![],
            platforms,
            ladders: def.ladders.clone(),
            zones: def.zones.clone(),
            spawn: def.spawn,
            template,
            ladder_contacts: vec![],
        };
        scene.spawn_character(def.spawn);

        info!(
            level = %scene.name,
            colliders = scene.colliders.len(),
            platforms = scene.platforms.len(),
            ladders = scene.ladders.len(),
            "scene built"
        );
        scene
    }

    /// Add a character whose body's minimum corner is `min`. Returns its index.
    pub fn spawn_character(&mut self, min: Vec2) -> usize {
        let id = self.colliders.insert(Collider::body(
            Bounds::from_min_max(min, min + BODY_SIZE),
            LayerMask::CHARACTER,
        ));
        let mut controller = self.template.build(id);
        controller.settle(&self.colliders);
        self.characters.push(controller);
        self.ladder_contacts.push(None);
        self.characters.len() - 1
    }

    /// Put a character back at the level spawn with a fresh controller.
    pub fn respawn(&mut self, body: usize) {
        let Some(old) = self.characters.get(body) else { return };
        let id = old.motor().collider();
        self.colliders.set_center(id, self.spawn + BODY_SIZE * 0.5);
        let mut controller = self.template.build(id);
        controller.settle(&self.colliders);
        self.characters[body] = controller;
        self.ladder_contacts[body] = None;
        debug!(body, "respawned");
    }

    pub fn player(&self) -> Option<&MovementController> { self.characters.first() }
    pub fn player_mut(&mut self) -> Option<&mut MovementController> { self.characters.first_mut() }

    pub fn body_bounds(&self, body: usize) -> Option<Bounds> {
        let c = self.characters.get(body)?;
        self.colliders.bounds(c.motor().collider())
    }

    pub fn spawn_point(&self) -> Vec2 { self.spawn }
    pub fn template(&self) -> &CharacterTemplate { &self.template }

    /// Swap the dash module of the template and of every character.
    pub fn set_dash_module(&mut self, module: Option<Rc<dyn DashModule>>) {
        self.template.dash = module.clone();
        for c in &mut self.characters {
            c.change_dash_module(module.clone(), true);
        }
    }

    /// Lowest y a body may reach before it is respawned.
    pub fn kill_line(&self) -> f32 { -KILL_DEPTH }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::MotorState;
    use crate::sim::level::{builtin_level, parse_level};

    fn template() -> CharacterTemplate {
        CharacterTemplate::from_config(&AppConfig::default())
    }

    #[test]
    fn builtin_scene_spawns_grounded_player() {
        let def = builtin_level().unwrap();
        let scene = Scene::from_level(&def, template());
        let player = scene.player().unwrap();
        assert_eq!(player.state(), MotorState::OnGround);
        assert!(player.dash_module().is_some());
        assert!(player.action_module().is_some());
        assert_eq!(scene.platforms.len(), 1);

        // static runs + 2 ramps + 1 platform + player
        let statics = def.solids.len() + def.one_ways.len() + def.ramps.len();
        assert_eq!(scene.colliders.len(), statics + 2);
    }

    #[test]
    fn spawn_in_air_starts_falling() {
        let def = parse_level(".P.\n...\n...\n###").unwrap();
        let scene = Scene::from_level(&def, template());
        assert_eq!(scene.player().unwrap().state(), MotorState::Falling);
    }

    #[test]
    fn respawn_restores_spawn_position() {
        let def = parse_level("P..\n###").unwrap();
        let mut scene = Scene::from_level(&def, template());
        let id = scene.player().unwrap().motor().collider();
        scene.colliders.translate(id, Vec2::new(1.5, -20.0));
        scene.respawn(0);
        let b = scene.body_bounds(0).unwrap();
        assert!((b.min() - def.spawn).length() < 1e-5);
        assert_eq!(scene.player().unwrap().state(), MotorState::OnGround);
    }

    #[test]
    fn dash_swap_reaches_template_and_characters() {
        let def = parse_level("P..\n###").unwrap();
        let mut scene = Scene::from_level(&def, template());
        scene.set_dash_module(None);
        assert!(scene.template().dash.is_none());
        assert!(scene.player().unwrap().dash_module().is_none());
    }
}
