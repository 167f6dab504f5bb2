//! Chat server listener
//!
//! Handles the TCP accept loop and spawns one session task per connection.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

use crate::error::Result;
use crate::registry::{ClientRegistry, RegistryConfig};
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;
use crate::stats::ServerStats;

/// Line-based chat relay server
pub struct ChatServer {
    config: ServerConfig,
    registry: Arc<ClientRegistry>,
    stats: Arc<ServerStats>,
    shutdown_tx: watch::Sender<()>,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl ChatServer {
    /// Create a new server with the given configuration.
    pub fn new(config: ServerConfig) -> Self {
        let connection_semaphore = if config.max_clients > 0 {
            Some(Arc::new(Semaphore::new(config.max_clients)))
        } else {
            None
        };
        let (shutdown_tx, _) = watch::channel(());

        Self {
            registry: Arc::new(ClientRegistry::with_config(
                RegistryConfig::default().max_clients(config.max_clients),
            )),
            stats: Arc::new(ServerStats::new()),
            shutdown_tx,
            connection_semaphore,
            config,
        }
    }

    /// Get a reference to the client registry.
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Get the server-wide counters.
    pub fn stats(&self) -> &Arc<ServerStats> {
        &self.stats
    }

    /// Get the configured bind address.
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Run the server.
    ///
    /// Binds the configured address and accepts until the process dies.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Chat server listening");
        self.serve(listener).await
    }

    /// Run the server with graceful shutdown.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Chat server listening");
        self.serve_until(listener, shutdown).await
    }

    /// Serve on a pre-bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let mut sessions = JoinSet::new();
        self.accept_loop(&listener, &mut sessions).await
    }

    /// Serve on a pre-bound listener until `shutdown` resolves, then close
    /// every session and wait for their tasks to finish.
    pub async fn serve_until<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut sessions = JoinSet::new();

        tokio::select! {
            _ = shutdown => tracing::info!("Shutdown signal received"),
            result = self.accept_loop(&listener, &mut sessions) => return result,
        }

        // Stop accepting, drain the registry, wake every session task
        // (including any still mid-handshake), then join them all.
        drop(listener);
        let closing = self.registry.shutdown().await;
        let _ = self.shutdown_tx.send(());
        tracing::info!(sessions = closing, "Closing active sessions");
        while sessions.join_next().await.is_some() {}

        Ok(())
    }

    async fn accept_loop(
        &self,
        listener: &TcpListener,
        sessions: &mut JoinSet<()>,
    ) -> Result<()> {
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((socket, peer_addr)) => self.handle_connection(sessions, socket, peer_addr),
                    Err(e) => tracing::error!(error = %e, "Failed to accept connection"),
                },
                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Session task failed");
                    }
                }
            }
        }
    }

    fn handle_connection(
        &self,
        sessions: &mut JoinSet<()>,
        socket: TcpStream,
        peer_addr: SocketAddr,
    ) {
        self.stats.record_accepted();

        // Admission check; an over-capacity connection gets no protocol
        // traffic, the socket just drops closed.
        let permit = match self.connection_semaphore {
            Some(ref semaphore) => match Arc::clone(semaphore).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    self.stats.record_rejected();
                    tracing::warn!(
                        peer = %peer_addr,
                        max_clients = self.config.max_clients,
                        "Connection rejected: at capacity"
                    );
                    return;
                }
            },
            None => None,
        };

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::debug!(peer = %peer_addr, error = %e, "Failed to set TCP_NODELAY");
            }
        }

        tracing::debug!(peer = %peer_addr, "New connection");

        let registry = Arc::clone(&self.registry);
        let stats = Arc::clone(&self.stats);
        let shutdown = self.shutdown_tx.subscribe();
        let config = self.config.clone();

        sessions.spawn(async move {
            let _permit = permit;
            let mut connection =
                Connection::new(socket, peer_addr, registry, stats, shutdown, &config);

            // Orderly peer closes end with Ok; an Err here is a real I/O
            // failure on this session's socket.
            if let Err(e) = connection.run().await {
                tracing::warn!(peer = %peer_addr, error = %e, "Connection error");
            }
        });
    }
}
