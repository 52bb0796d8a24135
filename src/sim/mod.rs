//! Scene layer: levels, trigger volumes and the fixed-step driver on top
//! of the pure domain.

pub mod event;
pub mod level;
pub mod step;
pub mod world;
