//! Food pellet.

use glam::Vec2;
use protocol::Color;

/// A food pellet that can be eaten by cells.
#[derive(Debug, Clone)]
pub struct Food {
    pub id: u32,
    pub position: Vec2,
    pub radius: f32,
    pub color: Color,
    /// Spatial bucket the pellet is filed under.
    pub bucket: usize,
}

impl Food {
    /// Create a new food pellet.
    pub fn new(id: u32, position: Vec2, radius: f32, color: Color) -> Self {
        Self {
            id,
            position,
            radius,
            color,
            bucket: 0,
        }
    }
}
