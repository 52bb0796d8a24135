/// Character movement state machine.
///
/// One `update` per fixed step:
///
///   1. timers        dash / action episode timers, jump buffers
///   2. state         dash / action completion, jump apex, ground ↔ air,
///                    wall-slide exit
///   3. input         buffered jump (will-jump window), dash, action,
///                    ladder entry
///   4. mode step     per-state target velocity, then `move_by`
///   5. ladder zone   recomputed from the body center
///
/// Every transition goes through `change_state`, which fires the leave
/// events of the old state, the enter events of the new one, then
/// `StateChanged`. Re-entering the current state is a no-op.

use std::fmt;
use std::rc::Rc;

use glam::{IVec2, Vec2};
use serde::Deserialize;
use tracing::debug;

use super::collision::{CollisionCallbacks, CollisionInfo};
use super::events::{ControllerEvent, EventBus, SubscriptionId};
use super::geometry::Bounds;
use super::input::FrameInput;
use super::jump::{JumpBuffer, JumpPhysics, JumpSettings};
use super::ladder::{LadderState, LadderZone};
use super::math::{sign_or_zero, smooth_damp};
use super::module::{ActionModule, ActionSlot, DashModule, DashSlot};
use super::motor::{CharacterMotor, Motor};
use super::query::{ColliderId, CollisionWorld};
use super::state::{Facing, MotorState};
use super::wall::{detect_ledge, is_against_wall, WallSettings};

// ══════════════════════════════════════════════════════════════
// Settings
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Debug, Deserialize)]
#[serde(default)]
pub struct MovementSettings {
    pub speed: f32,
    /// Smoothing time for horizontal velocity while airborne.
    /// Ground acceleration is instant.
    pub air_acceleration_time: f32,
}

impl Default for MovementSettings {
    fn default() -> Self {
        MovementSettings { speed: 8.0, air_acceleration_time: 0.1 }
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Deserialize)]
#[serde(default)]
pub struct LadderSettings {
    pub snap_to_restricted_area: bool,
    pub exit_on_ground: bool,
    pub speed: f32,
    pub lock_facing_right: bool,
}

impl Default for LadderSettings {
    fn default() -> Self {
        LadderSettings {
            snap_to_restricted_area: false,
            exit_on_ground: true,
            speed: 4.0,
            lock_facing_right: true,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct ControllerSettings {
    pub movement: MovementSettings,
    pub ladder: LadderSettings,
    pub jump: JumpSettings,
    pub wall: WallSettings,
}

/// Input latched by `read_input`, consumed by the next `update`.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
struct InputBuffer {
    axis: Vec2,
    jump_pressed: bool,
    jump_held: bool,
    dash_pressed: bool,
    action_pressed: bool,
}

// ══════════════════════════════════════════════════════════════
// Controller
// ══════════════════════════════════════════════════════════════

pub struct MovementController {
    motor: CharacterMotor,
    settings: ControllerSettings,
    physics: JumpPhysics,

    state: MotorState,
    apply_gravity: bool,
    velocity: Vec2,
    velocity_x_smoothing: f32,
    facing: Facing,

    input: InputBuffer,
    jump_buffer: JumpBuffer,
    air_jump_counter: u32,
    can_air_jump: Option<Box<dyn Fn() -> bool>>,

    wall_dir_x: i32,
    wall_stick_timer: f32,

    dash: DashSlot,
    action: ActionSlot,
    ladder: LadderState,

    current_dt: f32,
    listeners: EventBus<ControllerEvent>,
    pending: Vec<ControllerEvent>,
}

impl fmt::Debug for MovementController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MovementController")
            .field("state", &self.state)
            .field("velocity", &self.velocity)
            .field("facing", &self.facing)
            .field("air_jump_counter", &self.air_jump_counter)
            .field("motor", &self.motor)
            .finish_non_exhaustive()
    }
}

impl MovementController {
    pub fn new(motor: CharacterMotor, settings: ControllerSettings) -> Self {
        MovementController {
            motor,
            physics: JumpPhysics::from_settings(&settings.jump),
            wall_stick_timer: settings.wall.stick_time,
            settings,
            state: MotorState::OnGround,
            apply_gravity: true,
            velocity: Vec2::ZERO,
            velocity_x_smoothing: 0.0,
            facing: Facing::Right,
            input: InputBuffer::default(),
            jump_buffer: JumpBuffer::default(),
            air_jump_counter: 0,
            can_air_jump: None,
            wall_dir_x: 0,
            dash: DashSlot::default(),
            action: ActionSlot::default(),
            ladder: LadderState::default(),
            current_dt: 0.0,
            listeners: EventBus::default(),
            pending: Vec::new(),
        }
    }

    pub fn with_dash_module(mut self, module: Rc<dyn DashModule>) -> Self {
        self.dash.set_module(Some(module));
        self
    }

    pub fn with_action_module(mut self, module: Rc<dyn ActionModule>) -> Self {
        self.action.set_module(Some(module));
        self
    }

    /// Probe the ground under the body and pick the starting state.
    pub fn settle(&mut self, world: &dyn CollisionWorld) {
        if !self.motor.settle(world) {
            self.change_state(MotorState::Falling);
        }
    }

    // ── Queries ──

    pub fn state(&self) -> MotorState { self.state }
    pub fn is_state(&self, state: MotorState) -> bool { self.state == state }
    /// Controller velocity in units/s (before collision resolution).
    pub fn velocity(&self) -> Vec2 { self.velocity }
    pub fn facing(&self) -> Facing { self.facing }
    pub fn motor(&self) -> &CharacterMotor { &self.motor }
    pub fn motor_mut(&mut self) -> &mut CharacterMotor { &mut self.motor }
    pub fn collisions(&self) -> &CollisionInfo { self.motor.collisions() }
    pub fn settings(&self) -> &ControllerSettings { &self.settings }
    pub fn physics(&self) -> &JumpPhysics { &self.physics }
    pub fn air_jump_counter(&self) -> u32 { self.air_jump_counter }
    pub fn ladder(&self) -> &LadderState { &self.ladder }
    pub fn dash_module(&self) -> Option<&Rc<dyn DashModule>> { self.dash.module() }
    pub fn action_module(&self) -> Option<&Rc<dyn ActionModule>> { self.action.module() }
    pub fn dash_progress(&self) -> f32 { self.dash.progress() }
    pub fn action_progress(&self) -> f32 { self.action.progress() }
    pub fn gravity_enabled(&self) -> bool { self.apply_gravity }

    pub fn is_on_ground(&self) -> bool { self.motor.collisions().below }

    pub fn is_in_air(&self) -> bool {
        let c = self.motor.collisions();
        !c.below && !c.left && !c.right
    }

    pub fn is_against_wall(&self) -> bool { is_against_wall(self.motor.collisions()) }
    pub fn is_in_ladder_area(&self) -> bool { self.ladder.is_in_area() }
    pub fn is_in_ladder_top_area(&self) -> bool { self.ladder.is_in_top_zone() }
    pub fn is_restricted_on_ladder(&self) -> bool { self.ladder.restricted().is_some() }

    pub fn can_air_jump(&self) -> bool {
        match &self.can_air_jump {
            Some(f) => f(),
            None => self.air_jump_counter < self.settings.jump.air_jumps_allowed,
        }
    }

    /// Ledge point beside the body on side `wall_dir`, if any.
    pub fn check_ledge(&self, world: &dyn CollisionWorld, wall_dir: i32) -> Option<Vec2> {
        let bounds = world.bounds(self.motor.collider())?;
        detect_ledge(
            world,
            &bounds,
            wall_dir,
            self.settings.wall.ledge_detection_offset,
            self.velocity.y,
            self.current_dt,
            self.motor.settings().collision_mask,
            Some(self.motor.collider()),
        )
    }

    // ── Configuration ──

    pub fn set_movement_speed(&mut self, speed: f32) { self.settings.movement.speed = speed; }

    /// Replace the jump tuning and re-derive gravity and jump speeds.
    pub fn set_jump_settings(&mut self, jump: JumpSettings) {
        self.settings.jump = jump;
        self.physics = JumpPhysics::from_settings(&jump);
    }

    pub fn set_wall_settings(&mut self, wall: WallSettings) { self.settings.wall = wall; }
    pub fn set_ladder_settings(&mut self, ladder: LadderSettings) { self.settings.ladder = ladder; }

    /// Replace the air-jump counter check with a caller predicate.
    pub fn set_can_air_jump(&mut self, predicate: Option<Box<dyn Fn() -> bool>>) {
        self.can_air_jump = predicate;
    }

    /// Swap the dash module. Removing it, or asking to, ends a dash in
    /// progress.
    pub fn change_dash_module(&mut self, module: Option<Rc<dyn DashModule>>, end_dash: bool) {
        let removed = module.is_none();
        self.dash.set_module(module);
        if (removed || end_dash) && self.state == MotorState::Dashing {
            self.change_state(self.ground_or_falling());
        }
    }

    pub fn change_action_module(&mut self, module: Option<Rc<dyn ActionModule>>, end_action: bool) {
        let removed = module.is_none();
        self.action.set_module(module);
        if (removed || end_action) && self.state == MotorState::CustomAction {
            self.change_state(self.ground_or_falling());
        }
    }

    // ── Events ──

    pub fn subscribe(&mut self, callback: impl FnMut(&ControllerEvent) + 'static) -> SubscriptionId {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Events fired since the last drain, in order.
    pub fn drain_events(&mut self) -> Vec<ControllerEvent> {
        std::mem::take(&mut self.pending)
    }

    fn emit(&mut self, event: ControllerEvent) {
        self.listeners.emit(&event);
        self.pending.push(event);
    }

    // ── External triggers ──

    pub fn set_frozen(&mut self, freeze: bool) {
        if freeze {
            self.velocity.x = 0.0;
            self.change_state(MotorState::Frozen);
        } else if self.state == MotorState::Frozen {
            self.change_state(self.ground_or_falling());
        }
    }

    pub fn ladder_area_enter(&mut self, area: Bounds, top_height: f32, bottom_height: f32) {
        self.ladder.enter(area, top_height, bottom_height);
    }

    pub fn ladder_area_stay(&mut self, area: Bounds, top_height: f32, bottom_height: f32) {
        self.ladder.enter(area, top_height, bottom_height);
    }

    pub fn ladder_area_exit(&mut self) {
        self.ladder.exit();
        if self.state == MotorState::OnLadder {
            self.exit_ladder();
        }
    }

    pub fn set_ladder_restricted_area(&mut self, bounds: Bounds, ignore_top: bool) {
        self.ladder.set_restricted(bounds, ignore_top);
    }

    pub fn clear_ladder_restricted_area(&mut self) { self.ladder.clear_restricted(); }
    pub fn set_ladder_zone(&mut self, zone: LadderZone) { self.ladder.set_zone(zone); }

    // ══════════════════════════════════════════════════════════
    // Step
    // ══════════════════════════════════════════════════════════

    /// Latch input for the next `update`.
    pub fn read_input(&mut self, input: FrameInput, dt: f32) {
        self.input.axis = input.axis.clamp(Vec2::NEG_ONE, Vec2::ONE);
        self.input.jump_pressed = input.jump.pressed;
        if input.jump.pressed {
            self.jump_buffer.arm_will_jump(self.settings.jump.will_jump_time, dt);
        }
        self.input.jump_held = input.jump.held;
        self.input.dash_pressed = input.dash.pressed;
        self.input.action_pressed = input.action.pressed;
    }

    /// Attempt a jump now from the latched input. False when no jump
    /// source is eligible.
    pub fn try_jump(&mut self) -> bool {
        let raw = self.raw_input();
        let wall_dir = self.wall_side();
        self.start_jump(raw, wall_dir)
    }

    pub fn update(&mut self, world: &mut dyn CollisionWorld, dt: f32) {
        self.current_dt = dt;

        self.update_timers(dt);
        self.update_state(dt);

        if self.jump_buffer.will_jump() {
            self.input.jump_pressed = true;
        }

        let raw = self.raw_input();
        self.wall_dir_x = self.wall_side();

        if self.input.dash_pressed {
            self.start_dash(raw.x, dt);
        }
        if self.input.action_pressed {
            self.start_action(raw.x);
        }

        if self.ladder.is_in_area() && self.can_enter_ladder() {
            let wants = if self.ladder.is_in_top_zone() { raw.y < 0 } else { raw.y > 0 };
            if wants {
                self.enter_ladder();
            }
        }

        match self.state {
            MotorState::Dashing => self.dash_step(world, dt),
            MotorState::CustomAction => self.action_step(world, dt),
            MotorState::OnLadder => self.ladder_step(world, raw, dt),
            MotorState::Frozen => self.frozen_step(world, dt),
            _ => self.free_step(world, raw, dt),
        }

        if self.ladder.is_in_area() {
            if let Some(b) = world.bounds(self.motor.collider()) {
                self.ladder.resolve_zone(b.center);
            }
        }

        self.input.jump_pressed = false;
        self.input.dash_pressed = false;
        self.input.action_pressed = false;
    }

    fn update_timers(&mut self, dt: f32) {
        if self.state == MotorState::Dashing { self.dash.update(dt); }
        if self.state == MotorState::CustomAction { self.action.update(dt); }
        self.jump_buffer.tick();
    }

    fn update_state(&mut self, dt: f32) {
        if self.state == MotorState::Dashing {
            let progress = self.dash.progress();
            self.emit(ControllerEvent::DashProgress(progress));
            if progress >= 1.0 {
                self.end_dash();
            }
            if self.state == MotorState::Dashing { return; }
        }

        if self.state == MotorState::CustomAction {
            let progress = self.action.progress();
            self.emit(ControllerEvent::ActionProgress(progress));
            if progress >= 1.0 {
                self.end_action();
            }
            if self.state == MotorState::CustomAction { return; }
        }

        if self.state == MotorState::Jumping && self.motor.velocity().y <= 0.0 {
            self.change_state(MotorState::Falling);
        }

        if self.is_on_ground() {
            match self.state {
                MotorState::OnLadder => {
                    if self.settings.ladder.exit_on_ground && !self.ladder.is_in_top_zone() {
                        self.change_state(MotorState::OnGround);
                    }
                }
                MotorState::Frozen => {}
                _ => { self.change_state(MotorState::OnGround); }
            }
        } else if self.state == MotorState::OnGround {
            self.jump_buffer.arm_falling_grace(self.settings.jump.falling_grace_time, dt);
            self.change_state(MotorState::Falling);
        }

        if self.state == MotorState::WallSliding && !self.is_against_wall() {
            let next = if self.motor.velocity().y < 0.0 { MotorState::Falling } else { MotorState::Jumping };
            self.change_state(next);
        }
    }

    // ── Mode steps ──

    fn dash_step(&mut self, world: &mut dyn CollisionWorld, dt: f32) {
        let Some(module) = self.dash.module().cloned() else {
            self.change_state(self.ground_or_falling());
            return;
        };
        self.velocity.x = self.dash.direction() as f32 * self.dash.speed();
        if !self.is_on_ground() && module.uses_gravity() {
            self.velocity.y = 0.0;
        }
        if module.changes_facing() {
            self.set_facing(Facing::from_sign(self.dash.direction()));
        }

        let displacement = self.velocity * dt;
        if module.uses_collision() {
            self.motor.move_by(world, displacement, false);
            return;
        }
        // Teleport when the destination is free, else fall back to a sweep.
        let id = self.motor.collider();
        let blocked = world
            .bounds(id)
            .map(|b| world.overlap_box(&b.translated(displacement), self.motor.settings().collision_mask, Some(id)))
            .unwrap_or(true);
        if blocked {
            self.motor.move_by(world, displacement, false);
        } else {
            world.translate(id, displacement);
        }
    }

    fn action_step(&mut self, world: &mut dyn CollisionWorld, dt: f32) {
        let mut v = self.action.velocity();
        if self.action.module().is_some_and(|m| m.uses_gravity()) {
            v.y += self.physics.gravity * self.action.timer();
        }
        self.velocity = v;
        self.motor.move_by(world, v * dt, false);
    }

    fn ladder_step(&mut self, world: &mut dyn CollisionWorld, raw: IVec2, dt: f32) {
        self.velocity = self.input.axis * self.settings.ladder.speed;

        if self.input.jump_pressed {
            self.start_jump(raw, self.wall_dir_x);
        }

        if self.settings.ladder.lock_facing_right {
            self.set_facing(Facing::Right);
        } else if self.velocity.x != 0.0 {
            self.set_facing(Facing::from_sign(sign_or_zero(self.velocity.x)));
        }

        let id = self.motor.collider();
        let Some(center) = world.bounds(id).map(|b| b.center) else { return };
        let restricted = self.ladder.restricted().copied();
        if let Some(r) = &restricted {
            self.velocity = r.clamp_velocity(center, self.velocity);
        }

        // Ladders pass through one-way platforms in both directions.
        self.motor.pass_through_one_way();
        self.motor.move_by(world, self.velocity * dt, false);

        if let Some(r) = &restricted {
            if let Some(now) = world.bounds(id).map(|b| b.center) {
                let settled = r.settle(now, self.settings.ladder.snap_to_restricted_area);
                world.translate(id, settled - now);
            }
        }
    }

    fn frozen_step(&mut self, world: &mut dyn CollisionWorld, dt: f32) {
        self.clip_vertical_velocity();
        if self.apply_gravity {
            self.velocity.y += self.physics.gravity * dt;
        }
        self.motor.move_by(world, self.velocity * dt, false);
    }

    fn free_step(&mut self, world: &mut dyn CollisionWorld, raw: IVec2, dt: f32) {
        let wall_dir = self.wall_dir_x;

        // Drop through a one-way floor.
        if self.input.jump_pressed && raw.y < 0 && self.motor.collisions().below_one_way {
            self.motor.fall_through();
            self.consume_jump_pressed();
            self.change_state(MotorState::Falling);
        }

        let target_x = self.input.axis.x * self.settings.movement.speed;
        if self.is_on_ground() {
            self.velocity.x = target_x;
            self.velocity_x_smoothing = 0.0;
        } else {
            self.velocity.x = smooth_damp(
                self.velocity.x,
                target_x,
                &mut self.velocity_x_smoothing,
                self.settings.movement.air_acceleration_time,
                f32::INFINITY,
                dt,
            );
        }

        let mut sticking = false;
        let mut grabbing = false;

        if self.is_against_wall() {
            if self.settings.wall.can_grab_ledge {
                grabbing = self.grab_ledge(world, raw, wall_dir);
                if grabbing {
                    self.hold_wall(MotorState::OnLedge, raw, wall_dir, dt, false);
                }
            }

            if !grabbing && self.settings.wall.can_slide {
                if self.is_on_ground() {
                    if self.state != MotorState::WallSliding
                        && self.settings.wall.can_climb
                        && raw.x == wall_dir
                        && self.input.jump_pressed
                    {
                        sticking = true;
                        self.consume_jump_pressed();
                    }
                } else if self.state == MotorState::WallSliding || raw.x == wall_dir {
                    sticking = true;
                }

                if sticking {
                    self.hold_wall(MotorState::WallSliding, raw, wall_dir, dt, true);
                }
            }
        }

        self.clip_vertical_velocity();

        if self.input.jump_pressed && raw.y >= 0 {
            self.start_jump(raw, wall_dir);
        }

        if self.settings.jump.variable_height
            && !self.input.jump_held
            && raw.y >= 0
            && self.velocity.y > self.physics.min_jump_speed
        {
            self.velocity.y = self.physics.min_jump_speed;
        }

        if self.apply_gravity {
            let mut gravity = self.physics.gravity;
            if self.state == MotorState::WallSliding && self.velocity.y < 0.0 {
                gravity *= self.settings.wall.slide_speed_loss;
            }
            self.velocity.y += gravity * dt;
        }

        if grabbing {
            if self.state == MotorState::OnLedge && self.velocity.y < 0.0 {
                self.velocity.y = 0.0;
            }
            self.face_wall();
        } else if sticking {
            let wall = self.settings.wall;
            if wall.can_climb {
                if self.state == MotorState::WallSliding {
                    self.velocity.y = self.input.axis.y * wall.climb_speed;
                }
            } else if self.velocity.y < -wall.slide_speed_max {
                self.velocity.y = -wall.slide_speed_max;
            }
            self.face_wall();
        } else if self.velocity.x != 0.0 {
            self.set_facing(Facing::from_sign(sign_or_zero(self.velocity.x)));
        }

        self.motor.move_by(world, self.velocity * dt, false);
    }

    /// Ledge probe on the wall side; snaps the body's top to a fresh ledge.
    fn grab_ledge(&mut self, world: &mut dyn CollisionWorld, raw: IVec2, wall_dir: i32) -> bool {
        let Some(ledge) = self.check_ledge(world, wall_dir) else { return false };
        if self.state == MotorState::OnLedge {
            return true;
        }
        if self.velocity.y >= 0.0 || raw.x != wall_dir {
            return false;
        }
        self.velocity.y = 0.0;
        let id = self.motor.collider();
        if let Some(b) = world.bounds(id) {
            world.translate(id, Vec2::Y * (ledge.y - b.max().y));
        }
        true
    }

    /// Shared wall-stick bookkeeping for ledge hangs and wall slides.
    ///
    /// Pressing away from the wall drains the stick timer; anything else
    /// refills it. Slides tolerate neutral input, ledges only tolerate
    /// not pressing away.
    fn hold_wall(&mut self, state: MotorState, raw: IVec2, wall_dir: i32, dt: f32, neutral_refills: bool) {
        if self.change_state(state) {
            self.air_jump_counter = 0;
            self.emit(ControllerEvent::JumpCounterReset(state));
        }

        let stick_time = self.settings.wall.stick_time;
        if self.wall_stick_timer <= 0.0 {
            self.change_state(MotorState::Falling);
            self.wall_stick_timer = stick_time;
            return;
        }

        self.velocity_x_smoothing = 0.0;
        self.velocity.x = 0.0;

        let leaving = if neutral_refills {
            raw.x != wall_dir && raw.x != 0
        } else {
            raw.x == -wall_dir
        };
        if leaving {
            self.wall_stick_timer -= dt;
            if neutral_refills && self.wall_stick_timer < 0.0 {
                self.change_state(MotorState::Falling);
                self.wall_stick_timer = stick_time;
            }
        } else {
            self.wall_stick_timer = stick_time;
        }
    }

    // ── Jump ──

    fn start_jump(&mut self, raw: IVec2, wall_dir: i32) -> bool {
        let performed = match self.state {
            MotorState::OnLedge => {
                self.velocity.y = self.physics.max_jump_speed;
                self.emit(ControllerEvent::LedgeJump);
                true
            }
            MotorState::WallSliding => {
                if self.settings.wall.can_wall_jump {
                    let v = self.settings.wall.wall_jump_vector(raw.x, wall_dir);
                    self.emit(ControllerEvent::WallJump(v));
                    self.velocity = v;
                    true
                } else {
                    false
                }
            }
            _ => self.normal_jump(),
        };

        if performed {
            self.consume_jump_pressed();
            self.change_state(MotorState::Jumping);
            self.emit(ControllerEvent::Jump);
        }
        performed
    }

    fn normal_jump(&mut self) -> bool {
        if self.state == MotorState::OnGround || self.jump_buffer.in_falling_grace() {
            self.velocity.y = self.physics.max_jump_speed;
            self.emit(ControllerEvent::NormalJump);
        } else if self.state == MotorState::OnLadder {
            self.velocity.y = self.settings.jump.ladder_jump_force;
            self.emit(ControllerEvent::LadderJump);
        } else if self.can_air_jump() {
            self.velocity.y = self.physics.max_jump_speed;
            self.air_jump_counter += 1;
            self.emit(ControllerEvent::AirJump);
        } else {
            return false;
        }
        true
    }

    fn consume_jump_pressed(&mut self) {
        self.input.jump_pressed = false;
        self.jump_buffer.consume();
    }

    // ── Dash / action ──

    fn start_dash(&mut self, raw_x: i32, dt: f32) {
        let Some(module) = self.dash.module().cloned() else { return };
        if self.state == MotorState::Dashing { return; }
        if module.ground_only() && !self.is_on_ground() { return; }

        let dir = if raw_x != 0 { raw_x } else { self.facing.sign() };
        if !module.can_dash_to_sliding_wall() && self.state == MotorState::WallSliding && dir == self.wall_side_or_left() {
            return;
        }

        if module.changes_facing() {
            self.set_facing(Facing::from_sign(dir));
        }
        if !self.is_on_ground() && module.uses_gravity() {
            self.velocity.y = 0.0;
        }

        self.dash.start(dir, dt);
        self.emit(ControllerEvent::DashStart(Facing::from_sign(dir)));
        self.change_state(MotorState::Dashing);
    }

    fn end_dash(&mut self) {
        if self.state != MotorState::Dashing { return; }
        self.velocity.x = self.dash.direction() as f32 * self.dash.speed();
        self.velocity_x_smoothing = 0.0;
        self.change_state(self.ground_or_falling());
    }

    fn start_action(&mut self, raw_x: i32) {
        let Some(module) = self.action.module().cloned() else { return };
        if self.state == MotorState::CustomAction { return; }
        if module.ground_only() && !self.is_on_ground() { return; }

        let dir = if raw_x != 0 { raw_x } else { self.facing.sign() };
        if !module.can_use_to_sliding_wall() && self.state == MotorState::WallSliding && dir == self.wall_side_or_left() {
            return;
        }

        self.action.start(dir);
        self.emit(ControllerEvent::ActionStart(Facing::from_sign(dir)));
        self.change_state(MotorState::CustomAction);
    }

    fn end_action(&mut self) {
        if self.state != MotorState::CustomAction { return; }
        self.velocity = self.action.velocity();
        self.velocity_x_smoothing = 0.0;
        self.change_state(self.ground_or_falling());
    }

    // ── Ladder ──

    fn can_enter_ladder(&self) -> bool {
        !matches!(
            self.state,
            MotorState::OnLadder | MotorState::Dashing | MotorState::CustomAction | MotorState::Frozen
        )
    }

    fn enter_ladder(&mut self) {
        self.velocity = Vec2::ZERO;
        self.change_state(MotorState::OnLadder);
        self.air_jump_counter = 0;
        self.emit(ControllerEvent::JumpCounterReset(MotorState::OnLadder));
        self.apply_gravity = false;
    }

    fn exit_ladder(&mut self) {
        self.velocity.y = 0.0;
        self.change_state(self.ground_or_falling());
    }

    // ── Helpers ──

    fn raw_input(&self) -> IVec2 {
        IVec2::new(sign_or_zero(self.input.axis.x), sign_or_zero(self.input.axis.y))
    }

    fn wall_side(&self) -> i32 {
        let c = self.motor.collisions();
        if c.right { 1 } else if c.left { -1 } else { 0 }
    }

    fn wall_side_or_left(&self) -> i32 {
        if self.motor.collisions().right { 1 } else { -1 }
    }

    fn ground_or_falling(&self) -> MotorState {
        if self.is_on_ground() { MotorState::OnGround } else { MotorState::Falling }
    }

    /// Kill vertical velocity into a ceiling or into the floor.
    fn clip_vertical_velocity(&mut self) {
        let c = self.motor.collisions();
        if c.above {
            self.velocity.y = 0.0;
        } else if c.below && self.velocity.y < 0.0 {
            self.velocity.y = 0.0;
        }
    }

    fn face_wall(&mut self) {
        let f = if self.motor.collisions().right { Facing::Right } else { Facing::Left };
        self.set_facing(f);
    }

    fn set_facing(&mut self, facing: Facing) {
        if self.facing == facing { return; }
        self.facing = facing;
        self.emit(ControllerEvent::FacingFlip(facing));
    }

    /// Returns whether a transition happened.
    fn change_state(&mut self, next: MotorState) -> bool {
        if self.state == next { return false; }

        if self.state == MotorState::OnLadder {
            self.apply_gravity = true;
        }
        match self.state {
            MotorState::Jumping => self.emit(ControllerEvent::JumpEnd),
            MotorState::Dashing => self.emit(ControllerEvent::DashEnd),
            MotorState::WallSliding => self.emit(ControllerEvent::WallSlidingEnd),
            MotorState::OnLedge => self.emit(ControllerEvent::LedgeGrabEnd),
            MotorState::CustomAction => self.emit(ControllerEvent::ActionEnd),
            _ => {}
        }

        let prev = self.state;
        self.state = next;

        match next {
            MotorState::OnGround => {
                self.air_jump_counter = 0;
                self.emit(ControllerEvent::JumpCounterReset(MotorState::OnGround));
                if prev != MotorState::Frozen {
                    self.emit(ControllerEvent::Landed);
                }
            }
            MotorState::OnLedge => {
                self.emit(ControllerEvent::LedgeGrabStart(Facing::from_sign(self.wall_dir_x)));
            }
            MotorState::WallSliding => {
                self.emit(ControllerEvent::WallSlidingStart(Facing::from_sign(self.wall_dir_x)));
            }
            _ => {}
        }

        debug!(from = prev.name(), to = next.name(), "state change");
        self.emit(ControllerEvent::StateChanged { from: prev, to: next });
        true
    }
}

/// Platforms carry controllers through their motor.
impl Motor for MovementController {
    fn collider(&self) -> ColliderId { self.motor.collider() }

    fn move_by(&mut self, world: &mut dyn CollisionWorld, displacement: Vec2, on_moving_motor: bool) -> CollisionCallbacks {
        self.motor.move_by(world, displacement, on_moving_motor)
    }

    fn push(&mut self, force: Vec2, on_moving_motor: bool) {
        self.motor.push(force, on_moving_motor);
    }
}
