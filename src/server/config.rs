//! Server configuration

use std::net::SocketAddr;

use crate::protocol::constants::{DEFAULT_MAX_CLIENTS, MAX_LINE_LEN};

/// Default port when none is configured
pub const DEFAULT_PORT: u16 = 7667;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent clients (0 = unlimited)
    pub max_clients: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Longest accepted protocol line, in bytes
    pub max_line_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_clients: DEFAULT_MAX_CLIENTS,
            tcp_nodelay: true, // chat lines are tiny, latency matters
            max_line_len: MAX_LINE_LEN,
        }
    }
}

impl ServerConfig {
    /// Create a new config with a custom bind address.
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address.
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the client capacity.
    pub fn max_clients(mut self, max: usize) -> Self {
        self.max_clients = max;
        self
    }

    /// Enable or disable TCP_NODELAY.
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }

    /// Set the maximum accepted line length in bytes.
    pub fn max_line_len(mut self, len: usize) -> Self {
        self.max_line_len = len;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert_eq!(config.max_clients, DEFAULT_MAX_CLIENTS);
        assert!(config.tcp_nodelay);
        assert_eq!(config.max_line_len, MAX_LINE_LEN);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:7668".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_clients, DEFAULT_MAX_CLIENTS);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:7000".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .max_clients(5)
            .tcp_nodelay(false)
            .max_line_len(512);

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_clients, 5);
        assert!(!config.tcp_nodelay);
        assert_eq!(config.max_line_len, 512);
    }
}
