//! Registered client entries and outbound delivery messages

use std::time::Instant;

use bytes::Bytes;
use tokio::sync::mpsc;

/// Message queued for delivery on a session's outbound channel
///
/// Cheap to clone: `Line` carries reference-counted bytes, so a broadcast
/// to N recipients shares one encoded buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A pre-encoded wire line to write to the client socket
    Line(Bytes),
    /// Orderly close requested (registry shutdown)
    Shutdown,
}

/// Entry for one active client in the registry
#[derive(Debug)]
pub struct ClientEntry {
    /// Registry id
    pub id: u64,
    /// Accepted nickname
    pub nickname: String,
    /// When the client became active
    pub joined_at: Instant,
    /// Sender half of the session's outbound queue
    pub(super) sender: mpsc::UnboundedSender<Outbound>,
}

impl ClientEntry {
    pub(super) fn new(id: u64, nickname: String, sender: mpsc::UnboundedSender<Outbound>) -> Self {
        Self {
            id,
            nickname,
            joined_at: Instant::now(),
            sender,
        }
    }

    /// Queue a message for delivery; `false` if the session is already gone.
    pub(crate) fn send(&self, message: Outbound) -> bool {
        self.sender.send(message).is_ok()
    }
}
