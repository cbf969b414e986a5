//! Cell arena simulation core and session gateway.

pub mod ai;
pub mod collision;
pub mod config;
pub mod entity;
pub mod movement;
pub mod server;
pub mod snapshot;
pub mod spatial;
pub mod split;
pub mod world;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use server::{run, Command, GameState, Inbound, Outbound};
pub use world::World;
