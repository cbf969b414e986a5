//! Message definitions for the arena protocol.
//!
//! Messages are JSON objects tagged by a `type` field. This module contains
//! both client->server and server->client message types.

mod client;
mod server;

pub use client::*;
pub use server::*;
