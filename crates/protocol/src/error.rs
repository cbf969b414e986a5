//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while decoding a client message.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Non-finite coordinate in move: ({0}, {1})")]
    NonFiniteCoordinate(f64, f64),

    #[error("Message too large: {0} bytes")]
    TooLarge(usize),
}
