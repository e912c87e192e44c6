//! # Game Server Library
//!
//! This library provides the authoritative server for a top-down multiplayer
//! action game. It owns player positions and world objects, resolves melee
//! attacks against breakable objects, and pushes every resulting state change
//! to connected clients as JSON events over websockets.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative State
//! Clients report movement and request attacks; the server decides what
//! actually happens. Hit detection always uses the server's copy of the
//! attacker's position, never the one carried in the attack request.
//!
//! ### Connection Lifecycle
//! A new connection gets a freshly spawned player and an `init` snapshot of
//! the world, and every other client is told about the newcomer. Closing the
//! socket or sending `disconnect` removes the player and notifies everyone.
//!
//! ### Event Broadcasting
//! Each outbound event has a fixed audience: the triggering connection only,
//! everyone but the triggering connection, or everyone.
//!
//! ## Architecture Design
//!
//! ### Run-to-Completion Event Loop
//! All network tasks funnel inbound frames into one channel. The main loop
//! takes one message at a time, applies it to the [`session::GameSession`],
//! and flushes the events it produced before reading the next message. No
//! game state is shared between tasks, so no locking is needed.
//!
//! ### Per-Connection Writers
//! Every websocket has a single writer task fed by an unbounded queue, which
//! keeps events for one client in the order they were emitted.
//!
//! ## Module Organization
//!
//! ### Players Module (`players`)
//! Registry of connected players keyed by connection id.
//!
//! ### World Module (`world`)
//! Weapon catalog and live breakables, loaded from JSON with a fallback
//! directory and an empty-catalog default.
//!
//! ### Combat Module (`combat`)
//! Sector hit detection and damage, destruction and loot resolution.
//!
//! ### Broadcast Module (`broadcast`)
//! Delivery targets and the queue between the session and the network layer.
//!
//! ### Session Module (`session`)
//! Owns the registry, world and RNG for one game and turns client events into
//! state changes and broadcasts.
//!
//! ### Network Module (`network`)
//! Websocket accept loop, per-connection reader and writer tasks, capacity
//! limit and the main server loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//! use server::world::WorldData;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let world = WorldData::load(Path::new("data"), Path::new("../data"));
//!     let mut server = Server::bind("127.0.0.1:3000", world, ServerConfig::default()).await?;
//!
//!     // Accepts websocket clients and processes their events until shutdown
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod combat;
pub mod network;
pub mod players;
pub mod session;
pub mod world;
