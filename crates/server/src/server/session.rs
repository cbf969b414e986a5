//! Connected session state.

use super::Outbound;
use protocol::ServerMessage;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tracing::debug;

/// Name given to players that join without one.
pub const DEFAULT_NAME: &str = "An unnamed cell";

/// A connected WebSocket session.
#[derive(Debug)]
pub struct Session {
    /// Unique session ID.
    pub id: u32,
    /// Remote address.
    pub addr: SocketAddr,
    /// Player name (set on join).
    pub name: Option<String>,
    /// Top-level cell controlled by this session, once joined.
    pub cell: Option<u32>,
    outbox: mpsc::UnboundedSender<Outbound>,
}

impl Session {
    pub fn new(id: u32, addr: SocketAddr, outbox: mpsc::UnboundedSender<Outbound>) -> Self {
        Self {
            id,
            addr,
            name: None,
            cell: None,
            outbox,
        }
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.cell.is_some()
    }

    /// Queue a reliable event. Returns false if the connection is gone.
    pub fn send(&self, message: ServerMessage) -> bool {
        let sent = self.outbox.send(Outbound::Event(message)).is_ok();
        if !sent {
            debug!("Session {} outbox closed", self.id);
        }
        sent
    }

    /// Ask the connection task to close the socket.
    pub fn close(&self) {
        let _ = self.outbox.send(Outbound::Close);
    }
}

/// Trim and truncate a requested name, falling back to [`DEFAULT_NAME`].
pub fn sanitize_name(raw: &str, max_len: usize) -> String {
    let name: String = raw.trim().chars().take(max_len).collect();
    let name = name.trim_end();
    if name.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        name.to_string()
    }
}
