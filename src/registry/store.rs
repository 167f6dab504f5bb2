//! Client registry implementation
//!
//! The central registry of active sessions and the broadcast fan-out from
//! any sender to everyone else.

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};

use crate::protocol::Frame;

use super::config::RegistryConfig;
use super::entry::{ClientEntry, Outbound};
use super::error::RegistryError;

/// Central registry of active client sessions
///
/// Thread-safe via `RwLock`. The lock covers membership checks, inserts,
/// removes, and snapshots only; queue sends to slow peers happen after it
/// is released, so one blocked socket never stalls registry mutations.
pub struct ClientRegistry {
    inner: RwLock<Inner>,
    config: RegistryConfig,
}

#[derive(Debug)]
struct Inner {
    clients: HashMap<u64, ClientEntry>,
    /// Next session id; monotonic for the life of the process, never reused.
    next_id: u64,
}

impl ClientRegistry {
    /// Create a registry with default configuration.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with custom configuration.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            inner: RwLock::new(Inner {
                clients: HashMap::new(),
                next_id: 1,
            }),
            config,
        }
    }

    /// Get the registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a client, assigning it the next session id.
    ///
    /// Returns an error when the registry is at capacity.
    pub async fn register(
        &self,
        nickname: &str,
        sender: mpsc::UnboundedSender<Outbound>,
    ) -> Result<u64, RegistryError> {
        let mut inner = self.inner.write().await;

        let max = self.config.max_clients;
        if max > 0 && inner.clients.len() >= max {
            return Err(RegistryError::CapacityExceeded { max_clients: max });
        }

        let id = inner.next_id;
        inner.next_id += 1;
        inner
            .clients
            .insert(id, ClientEntry::new(id, nickname.to_string(), sender));

        tracing::info!(
            session_id = id,
            nickname = %nickname,
            active = inner.clients.len(),
            "Client registered"
        );

        Ok(id)
    }

    /// Remove a client. Returns the entry only if it was still registered,
    /// so duplicate teardown attempts observe exactly one removal.
    pub async fn remove(&self, id: u64) -> Option<ClientEntry> {
        let mut inner = self.inner.write().await;
        let entry = inner.clients.remove(&id);

        if let Some(ref entry) = entry {
            tracing::info!(
                session_id = id,
                nickname = %entry.nickname,
                active = inner.clients.len(),
                "Client removed"
            );
        }

        entry
    }

    /// Broadcast a frame to every registered client except `exclude`.
    ///
    /// The frame is encoded once; the recipient snapshot is taken under the
    /// read lock and the queue sends happen after it is released. A send to
    /// a session that is already gone is skipped, never aborting delivery
    /// to the remaining recipients. Returns the number of queues reached.
    pub async fn broadcast(&self, frame: &Frame, exclude: Option<u64>) -> usize {
        let line = frame.encode();

        let recipients: Vec<(u64, mpsc::UnboundedSender<Outbound>)> = {
            let inner = self.inner.read().await;
            inner
                .clients
                .values()
                .filter(|entry| Some(entry.id) != exclude)
                .map(|entry| (entry.id, entry.sender.clone()))
                .collect()
        };

        let mut delivered = 0;
        for (id, sender) in recipients {
            if sender.send(Outbound::Line(line.clone())).is_ok() {
                delivered += 1;
            } else {
                tracing::debug!(session_id = id, "Broadcast recipient already gone");
            }
        }

        delivered
    }

    /// Snapshot of `(id, nickname)` for the registered clients, id-ordered.
    pub async fn peers(&self) -> Vec<(u64, String)> {
        let inner = self.inner.read().await;
        let mut peers: Vec<(u64, String)> = inner
            .clients
            .values()
            .map(|entry| (entry.id, entry.nickname.clone()))
            .collect();
        peers.sort_unstable_by_key(|(id, _)| *id);
        peers
    }

    /// Number of registered clients.
    pub async fn len(&self) -> usize {
        self.inner.read().await.clients.len()
    }

    /// Check if no clients are registered.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.clients.is_empty()
    }

    /// Drain the registry, asking every session to close.
    ///
    /// Removed entries yield `None` from later [`remove`](Self::remove)
    /// calls, which keeps session teardown from announcing departures
    /// during a full shutdown. Returns the number of sessions signalled.
    pub async fn shutdown(&self) -> usize {
        let mut inner = self.inner.write().await;
        let count = inner.clients.len();

        for (_, entry) in inner.clients.drain() {
            let _ = entry.send(Outbound::Shutdown);
        }

        if count > 0 {
            tracing::info!(sessions = count, "Registry shut down");
        }

        count
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (
        mpsc::UnboundedSender<Outbound>,
        mpsc::UnboundedReceiver<Outbound>,
    ) {
        mpsc::unbounded_channel()
    }

    #[tokio::test]
    async fn test_register_assigns_monotonic_ids() {
        let registry = ClientRegistry::new();
        let (tx, _rx) = channel();

        let first = registry.register("alice", tx.clone()).await.unwrap();
        let second = registry.register("bob", tx.clone()).await.unwrap();
        assert!(second > first);

        // Ids are not reused after removal.
        registry.remove(second).await.unwrap();
        let third = registry.register("eve", tx).await.unwrap();
        assert!(third > second);
    }

    #[tokio::test]
    async fn test_capacity_exceeded() {
        let registry = ClientRegistry::with_config(RegistryConfig::default().max_clients(2));
        let (tx, _rx) = channel();

        registry.register("alice", tx.clone()).await.unwrap();
        registry.register("bob", tx.clone()).await.unwrap();

        let result = registry.register("eve", tx).await;
        assert_eq!(result, Err(RegistryError::CapacityExceeded { max_clients: 2 }));
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_broadcast_excludes_sender() {
        let registry = ClientRegistry::new();
        let (alice_tx, mut alice_rx) = channel();
        let (bob_tx, mut bob_rx) = channel();
        let (eve_tx, mut eve_rx) = channel();

        let alice = registry.register("alice", alice_tx).await.unwrap();
        registry.register("bob", bob_tx).await.unwrap();
        registry.register("eve", eve_tx).await.unwrap();

        let frame = Frame::Message {
            nickname: "alice".to_string(),
            text: "hi".to_string(),
        };
        let delivered = registry.broadcast(&frame, Some(alice)).await;
        assert_eq!(delivered, 2);

        let expected = Outbound::Line(frame.encode());
        assert_eq!(bob_rx.recv().await.unwrap(), expected);
        assert_eq!(eve_rx.recv().await.unwrap(), expected);
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_skips_dead_receiver() {
        let registry = ClientRegistry::new();
        let (alice_tx, alice_rx) = channel();
        let (bob_tx, mut bob_rx) = channel();

        registry.register("alice", alice_tx).await.unwrap();
        registry.register("bob", bob_tx).await.unwrap();
        drop(alice_rx);

        let delivered = registry.broadcast(&Frame::Ok, None).await;
        assert_eq!(delivered, 1);
        assert_eq!(bob_rx.recv().await.unwrap(), Outbound::Line(Frame::Ok.encode()));
    }

    #[tokio::test]
    async fn test_remove_yields_entry_once() {
        let registry = ClientRegistry::new();
        let (tx, _rx) = channel();
        let id = registry.register("alice", tx).await.unwrap();

        let entry = registry.remove(id).await.unwrap();
        assert_eq!(entry.nickname, "alice");
        assert!(registry.remove(id).await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_peers_snapshot() {
        let registry = ClientRegistry::new();
        let (tx, _rx) = channel();

        let alice = registry.register("alice", tx.clone()).await.unwrap();
        let bob = registry.register("bob", tx).await.unwrap();

        let peers = registry.peers().await;
        assert_eq!(
            peers,
            vec![(alice, "alice".to_string()), (bob, "bob".to_string())]
        );
    }

    #[tokio::test]
    async fn test_shutdown_drains_and_signals() {
        let registry = ClientRegistry::new();
        let (alice_tx, mut alice_rx) = channel();
        let (bob_tx, mut bob_rx) = channel();

        let alice = registry.register("alice", alice_tx).await.unwrap();
        registry.register("bob", bob_tx).await.unwrap();

        assert_eq!(registry.shutdown().await, 2);
        assert!(registry.is_empty().await);
        assert_eq!(alice_rx.recv().await.unwrap(), Outbound::Shutdown);
        assert_eq!(bob_rx.recv().await.unwrap(), Outbound::Shutdown);

        // Drained entries no longer announce on removal.
        assert!(registry.remove(alice).await.is_none());
    }
}
