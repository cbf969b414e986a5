//! Shared protocol crate for the cell arena.
//!
//! This crate contains:
//! - Client -> server messages and their validation
//! - Server -> client events and snapshot views
//! - Shared types (Color)

mod error;
pub mod messages;

pub use error::ProtocolError;
pub use messages::{CellView, ClientMessage, FoodView, ServerMessage};

use serde::{Serialize, Serializer};

/// RGB color used for cells and food.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// CSS hex form, e.g. `#ff8000`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}
