//! # Party Game Client Library
//!
//! A headless client for the party game server. It speaks the UDP protocol
//! defined in `shared`, remembers the session id the server issued so it can
//! retake its seat after a restart, and tracks the latest room snapshot.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! [`network::GameClient`] owns the socket: connecting with an optional
//! session id, sending actions, heartbeats and receiving server events.
//!
//! ### Commands Module (`commands`)
//! Parses the text commands of the interactive prompt (`create`, `join`,
//! `topic`, `gif`, `vote`, ...) and turns them into protocol packets.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::GameClient;
//! use shared::Packet;
//!
//! #[tokio::main]
//! async fn main() -> client::ClientResult<()> {
//!     let mut client = GameClient::new("127.0.0.1:8080").await?;
//!     client.connect(None).await?;
//!     client.recv().await?; // session
//!
//!     client
//!         .send(&Packet::CreateRoom {
//!             player_name: "alice".to_string(),
//!         })
//!         .await?;
//!     client.recv().await?; // room-created
//!     println!("Room code: {:?}", client.room_id());
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod network;

pub type ClientResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;
