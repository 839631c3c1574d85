//! Character definitions for the game world.

mod character;
mod components;

pub use character::*;
pub use components::*;
