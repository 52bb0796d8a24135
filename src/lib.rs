//! Deterministic 2D platformer motor and character movement state machine.
//!
//!   domain  the pure simulation: colliders, motors, controller, modules
//!   sim     levels, scenes and the fixed-step driver
//!   ui      terminal playground (input, renderer, sound)
//!   config  `config.toml` tuning and key bindings

pub mod config;
pub mod domain;
pub mod sim;
pub mod ui;
