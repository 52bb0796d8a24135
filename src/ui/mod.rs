//! Terminal playground: keyboard and gamepad input, the renderer and sound.

pub mod gamepad;
pub mod input;
pub mod renderer;
pub mod sound;
