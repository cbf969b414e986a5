//! Server -> Client events.

use crate::Color;
use serde::Serialize;

/// A cell as seen by clients.
///
/// Values are rounded before they are put on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellView {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub mass: f32,
    pub color: Color,
    pub name: String,
    pub is_bot: bool,
    pub parent_id: Option<u32>,
    pub score: f32,
}

/// A food pellet as seen by clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodView {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub color: Color,
}

/// Event sent to one or all clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Reply to a successful join (reliable, unicast).
    #[serde(rename_all = "camelCase")]
    Init {
        cell: CellView,
        world_width: f32,
        world_height: f32,
    },
    /// World snapshot (best effort, broadcast).
    #[serde(rename_all = "camelCase")]
    GameUpdate {
        timestamp: u64,
        players: Vec<CellView>,
        food: Vec<FoodView>,
        total_players: usize,
    },
    /// The receiving connection's cell was eaten (reliable, unicast).
    #[serde(rename_all = "camelCase")]
    PlayerDeath {
        player_id: u32,
        eaten_by: u32,
        final_mass: f32,
        final_score: f32,
    },
    /// Join rejected because the server is at capacity.
    #[serde(rename_all = "camelCase")]
    ServerFull { max_players: usize },
}

impl ServerMessage {
    /// Encode as a JSON text frame.
    pub fn to_json(&self) -> String {
        // Every field is a plain number, string or Vec; encoding cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}
