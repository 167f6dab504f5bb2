//! Client registry and broadcast fan-out
//!
//! The registry tracks every active session and routes chat traffic
//! between them. Each session owns an unbounded outbound queue; the
//! registry holds the sender halves and fans a frame out by queueing it
//! for every member except the original sender.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<ClientRegistry>
//!                   ┌──────────────────────────┐
//!                   │ clients: HashMap<u64,    │
//!                   │   ClientEntry {          │
//!                   │     nickname,            │
//!                   │     sender: mpsc::Tx,    │
//!                   │   }                      │
//!                   │ >                        │
//!                   └────────────┬─────────────┘
//!                                │ broadcast(frame, exclude)
//!            ┌───────────────────┼───────────────────┐
//!            │                   │                   │
//!            ▼                   ▼                   ▼
//!       [Session A]         [Session B]         [Session C]
//!       reads MSG           outbound.recv()     outbound.recv()
//!            │                   │                   │
//!            └──► broadcast ─────┴──► write ────────►└──► write
//! ```
//!
//! The lock is held only for membership changes and snapshots; deliveries
//! queue outside it, and each session writes its own socket, so a slow
//! peer delays nobody but itself. `bytes::Bytes` keeps the fan-out
//! allocation-free: every queue shares one encoded line.

pub mod config;
pub mod entry;
pub mod error;
pub mod store;

pub use config::RegistryConfig;
pub use entry::{ClientEntry, Outbound};
pub use error::RegistryError;
pub use store::ClientRegistry;
