//! # chat-relay
//!
//! A concurrent, line-based TCP chat relay: server, client, and the
//! protocol plumbing between them.
//!
//! A connecting client is greeted with `HELLO 1` and registers a nickname
//! with `NICK <name>`. Once the server answers `OK`, the session is active:
//! every `MSG <text>` the client sends is relayed as `MSG <name> <text>` to
//! all other active clients, and arrivals and departures are announced with
//! `JOIN <name>` / `EXIT <name>`. Each connection runs on its own task; the
//! shared registry hands broadcasts to per-session outbound queues, so one
//! slow peer never stalls the rest.
//!
//! ## Server
//! ```no_run
//! use chat_relay::{ChatServer, ServerConfig};
//!
//! # async fn example() -> chat_relay::error::Result<()> {
//! let addr = "127.0.0.1:7667".parse().unwrap();
//! let server = ChatServer::new(ServerConfig::with_addr(addr).max_clients(100));
//! server.run().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Client
//! ```no_run
//! use chat_relay::client::ChatClient;
//!
//! # async fn example() -> chat_relay::error::Result<()> {
//! let mut client = ChatClient::connect("127.0.0.1:7667", "alice").await?;
//! client.send("hello").await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

pub use client::{ChatClient, ChatEvent};
pub use error::{Error, Result};
pub use protocol::{Command, Frame};
pub use registry::ClientRegistry;
pub use server::{ChatServer, ServerConfig};
