//! # Party Game Server Library
//!
//! This library provides the authoritative server for a round-based party
//! game: one player (the judge) picks a topic, every player answers it with a
//! GIF, everybody votes for somebody else's answer and the most voted players
//! score a point. Rounds repeat until the room's round limit is reached.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Rooms
//! The server owns the single source of truth for every room. Clients only
//! send intents; the server decides whether the actor may perform them in the
//! current phase and broadcasts the resulting room snapshot.
//!
//! ### Durable Sessions
//! Connections are volatile: browsers refresh, sockets drop, networks flap.
//! Each client holds a session id that survives all of that. Reconnecting with
//! it puts the player back into their seat, in whatever phase the room is in,
//! with their points and submissions intact.
//!
//! ### Housekeeping
//! Background tasks drop silent connections, evict sessions inactive for five
//! minutes and discard rooms nobody has touched for a long time.
//!
//! ## Architecture Design
//!
//! ### Single Event Loop
//! All room-affecting packets are processed to completion, one at a time, by
//! the main loop in [`network::Server::run`]. Nothing awaits while room state
//! is borrowed, so two players acting on the same room can never produce a
//! lost update.
//!
//! ### Quorum-Driven Phases
//! Phases advance when every seated player has acted, never on a timer. A
//! stalled player blocks only their own room.
//!
//! ## Module Organization
//!
//! - [`connection_manager`]: UDP peers, connection handles and timeouts
//! - [`session`]: session registry and expiry
//! - [`room`]: the per-room state machine
//! - [`room_store`]: room lookup, id allocation and idle-room reaping
//! - [`tally`]: vote counting and winner selection
//! - [`game`]: action dispatch from connections to rooms
//! - [`network`]: socket tasks and the main loop
//! - [`config`]: runtime settings
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> server::ServerResult<()> {
//!     let mut server = Server::new(ServerConfig::default()).await?;
//!     server.run().await
//! }
//! ```

pub mod config;
pub mod connection_manager;
pub mod error;
pub mod game;
pub mod network;
pub mod room;
pub mod room_store;
pub mod session;
pub mod tally;

pub type ServerResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;
