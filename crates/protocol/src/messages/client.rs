//! Client -> Server message parsing.

use crate::ProtocolError;
use serde::Deserialize;

/// Largest inbound text frame accepted by the decoder.
pub const MAX_MESSAGE_LEN: usize = 1024;

/// Parsed client message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Join the game with a nickname.
    Join {
        #[serde(default)]
        name: String,
    },
    /// Cursor position in world coordinates.
    Move { x: f64, y: f64 },
    /// Split (Space key).
    Split,
}

impl ClientMessage {
    /// Parse and validate a client message from a text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        if text.len() > MAX_MESSAGE_LEN {
            return Err(ProtocolError::TooLarge(text.len()));
        }

        let message: ClientMessage = serde_json::from_str(text)?;
        if let ClientMessage::Move { x, y } = message {
            if !x.is_finite() || !y.is_finite() {
                return Err(ProtocolError::NonFiniteCoordinate(x, y));
            }
        }
        Ok(message)
    }
}
