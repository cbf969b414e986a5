//! Game entities.
//!
//! This module defines the cells and food pellets that live in the world.

mod cell;
mod food;

pub use cell::{mass_to_radius, Behavior, BotBrain, Cell};
pub use food::Food;
