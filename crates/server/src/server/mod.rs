//! Game server implementation.

use crate::config::Config;
use futures_util::{SinkExt, StreamExt};
use protocol::{ClientMessage, ServerMessage};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

pub mod game;
pub mod session;

pub use game::{run_game_loop, GameState};

/// A validated command from a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Join { name: String },
    Move { x: f32, y: f32 },
    Split,
    /// The socket closed.
    Disconnect,
}

impl From<ClientMessage> for Command {
    fn from(message: ClientMessage) -> Self {
        match message {
            ClientMessage::Join { name } => Command::Join { name },
            ClientMessage::Move { x, y } => Command::Move { x: x as f32, y: y as f32 },
            ClientMessage::Split => Command::Split,
        }
    }
}

/// An event from a connection task to the game loop.
#[derive(Debug)]
pub enum Inbound {
    /// A WebSocket handshake completed.
    Connected {
        session: u32,
        addr: SocketAddr,
        outbox: mpsc::UnboundedSender<Outbound>,
    },
    Command { session: u32, command: Command },
}

/// A reliable message from the game loop to one connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Event(ServerMessage),
    /// Close the socket after flushing earlier events.
    Close,
}

/// Run the game server.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on ws://{}", addr);

    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Inbound>();
    let (snapshot_tx, _snapshot_rx) = broadcast::channel::<Arc<str>>(8);

    // Start the game loop
    let game = GameState::new(config, snapshot_tx.clone());
    tokio::spawn(run_game_loop(game, inbound_rx));

    let mut next_session: u32 = 1;
    loop {
        let (stream, addr) = listener.accept().await?;

        let session = next_session;
        next_session = next_session.wrapping_add(1).max(1);

        let inbound = inbound_tx.clone();
        let snapshots = snapshot_tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, addr, session, inbound, snapshots).await {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    session: u32,
    inbound: mpsc::UnboundedSender<Inbound>,
    mut snapshots: broadcast::Receiver<Arc<str>>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New connection from {}", addr);

    let (mut write, mut read) = ws_stream.split();
    let (outbox, mut events) = mpsc::unbounded_channel();
    inbound.send(Inbound::Connected { session, addr, outbox })?;

    // Message loop - handle incoming messages, reliable events and snapshots
    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match ClientMessage::parse(text.as_str()) {
                        Ok(message) => {
                            let command = Inbound::Command { session, command: message.into() };
                            if inbound.send(command).is_err() {
                                break;
                            }
                        }
                        Err(e) => debug!("Dropped message from {}: {}", addr, e),
                    },
                    Some(Ok(Message::Close(_))) => {
                        info!("Client {} disconnected", addr);
                        break;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                    None => {
                        break;
                    }
                    _ => {}
                }
            }
            event = events.recv() => {
                match event {
                    Some(Outbound::Event(message)) => {
                        if let Err(e) = write.send(Message::text(message.to_json())).await {
                            warn!("Failed to send event to {}: {}", addr, e);
                            break;
                        }
                    }
                    Some(Outbound::Close) | None => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
            snapshot = snapshots.recv() => {
                match snapshot {
                    Ok(json) => {
                        if let Err(e) = write.send(Message::text(json.to_string())).await {
                            warn!("Failed to send snapshot to {}: {}", addr, e);
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("{} lagging, skipped {} snapshots", addr, skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    let _ = inbound.send(Inbound::Command { session, command: Command::Disconnect });
    Ok(())
}
