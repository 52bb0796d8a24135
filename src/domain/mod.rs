//! Pure simulation layer: geometry, collision world, motors, movement
//! state machine. No I/O, no clocks; every step takes an explicit `dt`.

pub mod collider;
pub mod collision;
pub mod controller;
pub mod easing;
pub mod events;
pub mod geometry;
pub mod input;
pub mod jump;
pub mod ladder;
pub mod math;
pub mod module;
pub mod motor;
pub mod platform;
pub mod query;
pub mod raycast;
pub mod state;
pub mod wall;
pub mod waypoint;
