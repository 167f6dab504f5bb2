//! Statistics for the chat relay
//!
//! `ServerStats` is shared across connection tasks and updated with relaxed
//! atomics; `SessionStats` is owned by one session and stays plain.

use std::sync::atomic::{AtomicU64, Ordering};

/// Server-wide counters
#[derive(Debug, Default)]
pub struct ServerStats {
    connections_accepted: AtomicU64,
    connections_rejected: AtomicU64,
    sessions_registered: AtomicU64,
    messages_relayed: AtomicU64,
    messages_rejected: AtomicU64,
}

impl ServerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_accepted(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.connections_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_registered(&self) {
        self.sessions_registered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_relayed(&self) {
        self.messages_relayed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_message_rejected(&self) {
        self.messages_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time view of the counters.
    pub fn snapshot(&self) -> ServerStatsSnapshot {
        ServerStatsSnapshot {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connections_rejected: self.connections_rejected.load(Ordering::Relaxed),
            sessions_registered: self.sessions_registered.load(Ordering::Relaxed),
            messages_relayed: self.messages_relayed.load(Ordering::Relaxed),
            messages_rejected: self.messages_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Copyable view of [`ServerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerStatsSnapshot {
    /// Connections accepted by the listener
    pub connections_accepted: u64,
    /// Connections refused at admission (capacity)
    pub connections_rejected: u64,
    /// Sessions that completed the handshake
    pub sessions_registered: u64,
    /// Chat messages fanned out to peers
    pub messages_relayed: u64,
    /// Lines answered with an `ERROR` reply
    pub messages_rejected: u64,
}

/// Per-session counters
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStats {
    /// Protocol lines read from the peer
    pub lines_received: u64,
    /// Chat messages this session broadcast
    pub messages_relayed: u64,
    /// Lines answered with an `ERROR` reply
    pub messages_rejected: u64,
    /// Bytes read from the peer
    pub bytes_received: u64,
    /// Bytes written to the peer
    pub bytes_sent: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_stats_snapshot() {
        let stats = ServerStats::new();
        assert_eq!(stats.snapshot(), ServerStatsSnapshot::default());

        stats.record_accepted();
        stats.record_accepted();
        stats.record_rejected();
        stats.record_registered();
        stats.record_relayed();
        stats.record_message_rejected();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.connections_accepted, 2);
        assert_eq!(snapshot.connections_rejected, 1);
        assert_eq!(snapshot.sessions_registered, 1);
        assert_eq!(snapshot.messages_relayed, 1);
        assert_eq!(snapshot.messages_rejected, 1);
    }

    #[test]
    fn test_session_stats_default() {
        let stats = SessionStats::default();
        assert_eq!(stats.lines_received, 0);
        assert_eq!(stats.messages_relayed, 0);
        assert_eq!(stats.bytes_received, 0);
        assert_eq!(stats.bytes_sent, 0);
    }
}
