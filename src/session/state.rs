//! Session state machine
//!
//! Tracks one client connection from accept to teardown.

use std::net::SocketAddr;
use std::time::Instant;

use crate::stats::SessionStats;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// TCP connected, greeting not yet sent
    Connected,
    /// Greeting sent, waiting for the NICK line
    AwaitingNick,
    /// Registered and relaying messages
    Active,
    /// Torn down
    Closed,
}

/// Complete per-session state
#[derive(Debug)]
pub struct SessionState {
    /// Registry id, assigned when the session becomes active
    pub id: Option<u64>,
    /// Remote peer address
    pub peer_addr: SocketAddr,
    /// Accepted nickname
    pub nickname: Option<String>,
    /// Current phase
    pub phase: SessionPhase,
    /// Connection start time
    pub connected_at: Instant,
    /// Time the handshake completed
    pub activated_at: Option<Instant>,
    /// Per-session counters
    pub stats: SessionStats,
}

impl SessionState {
    /// Create state for a freshly accepted connection.
    pub fn new(peer_addr: SocketAddr) -> Self {
        Self {
            id: None,
            peer_addr,
            nickname: None,
            phase: SessionPhase::Connected,
            connected_at: Instant::now(),
            activated_at: None,
            stats: SessionStats::default(),
        }
    }

    /// Greeting sent; wait for the nickname.
    pub fn await_nick(&mut self) {
        if self.phase == SessionPhase::Connected {
            self.phase = SessionPhase::AwaitingNick;
        }
    }

    /// Nickname accepted and registered.
    pub fn activate(&mut self, id: u64, nickname: String) {
        if self.phase == SessionPhase::AwaitingNick {
            self.id = Some(id);
            self.nickname = Some(nickname);
            self.activated_at = Some(Instant::now());
            self.phase = SessionPhase::Active;
        }
    }

    /// Final transition; membership and the socket are gone after this.
    pub fn close(&mut self) {
        self.phase = SessionPhase::Closed;
    }

    /// Check if the session is relaying messages.
    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    /// Check if the session has been torn down.
    pub fn is_closed(&self) -> bool {
        self.phase == SessionPhase::Closed
    }

    /// Get session duration.
    pub fn duration(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 7667)
    }

    #[test]
    fn test_session_lifecycle() {
        let mut state = SessionState::new(addr());

        assert_eq!(state.phase, SessionPhase::Connected);
        assert!(!state.is_active());

        state.await_nick();
        assert_eq!(state.phase, SessionPhase::AwaitingNick);

        state.activate(7, "alice".to_string());
        assert_eq!(state.phase, SessionPhase::Active);
        assert!(state.is_active());
        assert_eq!(state.id, Some(7));
        assert_eq!(state.nickname.as_deref(), Some("alice"));
        assert!(state.activated_at.is_some());

        state.close();
        assert!(state.is_closed());
    }

    #[test]
    fn test_activate_requires_awaiting_nick() {
        let mut state = SessionState::new(addr());

        // Straight from Connected: no transition, nothing assigned.
        state.activate(1, "alice".to_string());
        assert_eq!(state.phase, SessionPhase::Connected);
        assert_eq!(state.id, None);

        state.await_nick();
        state.close();

        // Closed is final.
        state.activate(1, "alice".to_string());
        assert_eq!(state.phase, SessionPhase::Closed);
        assert_eq!(state.id, None);
    }
}
