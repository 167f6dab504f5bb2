//! Per-connection session driver
//!
//! Runs one client from accept to teardown: greeting, nickname handshake,
//! then the relay loop that multiplexes socket reads with deliveries queued
//! by other sessions' broadcasts. The session task is the only writer to
//! its socket, which keeps per-sender message order intact.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{self, AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, watch};

use crate::error::ProtocolError;
use crate::protocol::command::{Command, Frame};
use crate::protocol::constants::MAX_MESSAGE_LEN;
use crate::protocol::framer::LineReader;
use crate::registry::{ClientRegistry, Outbound};
use crate::server::config::ServerConfig;
use crate::session::{SessionPhase, SessionState};
use crate::stats::ServerStats;

/// Drives one client connection
pub(crate) struct Connection<S> {
    state: SessionState,
    reader: LineReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
    outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    shutdown: watch::Receiver<()>,
    registry: Arc<ClientRegistry>,
    stats: Arc<ServerStats>,
}

impl<S: AsyncRead + AsyncWrite> Connection<S> {
    pub(crate) fn new(
        stream: S,
        peer_addr: SocketAddr,
        registry: Arc<ClientRegistry>,
        stats: Arc<ServerStats>,
        shutdown: watch::Receiver<()>,
        config: &ServerConfig,
    ) -> Self {
        let (read_half, write_half) = io::split(stream);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Self {
            state: SessionState::new(peer_addr),
            reader: LineReader::with_limit(read_half, config.max_line_len),
            writer: write_half,
            outbound_tx,
            outbound_rx,
            shutdown,
            registry,
            stats,
        }
    }

    /// Run the session to completion. Tears down before returning, whatever
    /// the exit path was.
    pub(crate) async fn run(&mut self) -> io::Result<()> {
        let mut shutdown = self.shutdown.clone();

        let result = tokio::select! {
            result = self.drive() => result,
            _ = shutdown.changed() => {
                tracing::debug!(peer = %self.state.peer_addr, "Server shutting down");
                Ok(())
            }
        };

        self.teardown().await;
        result
    }

    async fn drive(&mut self) -> io::Result<()> {
        if self.handshake().await? {
            self.relay_loop().await
        } else {
            Ok(())
        }
    }

    /// Greet the peer and settle its nickname. Returns whether the session
    /// became active.
    async fn handshake(&mut self) -> io::Result<bool> {
        self.send_frame(&Frame::hello()).await?;
        self.state.await_nick();

        let line = match self.read_line().await? {
            Some(line) => line,
            None => {
                tracing::debug!(peer = %self.state.peer_addr, "Peer closed during handshake");
                return Ok(false);
            }
        };

        let nickname = match Command::decode(&line) {
            Ok(Command::Nick(name)) => name,
            Ok(_) => return self.refuse(ProtocolError::UnexpectedCommand("NICK")).await,
            Err(err) => return self.refuse(err).await,
        };

        match self.registry.register(&nickname, self.outbound_tx.clone()).await {
            Ok(id) => {
                self.state.activate(id, nickname.clone());
                self.stats.record_registered();
                self.send_frame(&Frame::Ok).await?;
                self.registry.broadcast(&Frame::Join(nickname), Some(id)).await;
                tracing::info!(
                    session_id = id,
                    peer = %self.state.peer_addr,
                    nickname = %self.state.nickname.as_deref().unwrap_or_default(),
                    "Session active"
                );
                Ok(true)
            }
            Err(err) => {
                // Admission control normally rejects at accept; if the
                // registry still refuses, close without protocol traffic.
                tracing::warn!(peer = %self.state.peer_addr, error = %err, "Registration refused");
                self.stats.record_rejected();
                Ok(false)
            }
        }
    }

    /// Answer a handshake violation with `ERROR <reason>` and refuse the
    /// session; the caller closes the connection (no retry is offered).
    async fn refuse(&mut self, err: ProtocolError) -> io::Result<bool> {
        tracing::warn!(peer = %self.state.peer_addr, error = %err, "Handshake rejected");
        self.stats.record_message_rejected();
        self.send_frame(&Frame::error(&err)).await?;
        Ok(false)
    }

    /// Steady state: relay inbound chat, write queued deliveries.
    async fn relay_loop(&mut self) -> io::Result<()> {
        loop {
            tokio::select! {
                read = self.reader.read_line() => match read? {
                    Some(line) => {
                        self.state.stats.lines_received += 1;
                        self.state.stats.bytes_received += line.len() as u64 + 1;
                        if !self.handle_line(&line).await? {
                            return Ok(());
                        }
                    }
                    None => {
                        tracing::debug!(
                            session_id = self.state.id,
                            peer = %self.state.peer_addr,
                            "Peer closed connection"
                        );
                        return Ok(());
                    }
                },
                delivery = self.outbound_rx.recv() => match delivery {
                    Some(Outbound::Line(line)) => self.write_line(line).await?,
                    Some(Outbound::Shutdown) | None => {
                        tracing::debug!(session_id = self.state.id, "Close requested");
                        return Ok(());
                    }
                },
            }
        }
    }

    /// Handle one decoded line in the active phase. Returns `false` when
    /// the peer asked to leave.
    async fn handle_line(&mut self, line: &Bytes) -> io::Result<bool> {
        match Command::decode(line) {
            Ok(Command::Msg(text)) => {
                let len = text.chars().count();
                if len > MAX_MESSAGE_LEN {
                    // Rejected to the offender only; the connection stays up.
                    self.state.stats.messages_rejected += 1;
                    self.stats.record_message_rejected();
                    tracing::warn!(
                        session_id = self.state.id,
                        len = len,
                        "Oversize message rejected"
                    );
                    self.send_frame(&Frame::error(ProtocolError::MessageTooLong(len))).await?;
                    return Ok(true);
                }

                let nickname = self.state.nickname.clone().unwrap_or_default();
                tracing::info!(
                    session_id = self.state.id,
                    nickname = %nickname,
                    text = %text,
                    "Chat message"
                );
                let delivered = self
                    .registry
                    .broadcast(&Frame::Message { nickname, text }, self.state.id)
                    .await;
                tracing::debug!(session_id = self.state.id, delivered = delivered, "Relayed");
                self.state.stats.messages_relayed += 1;
                self.stats.record_relayed();
                Ok(true)
            }
            Ok(Command::Exit) => {
                tracing::debug!(session_id = self.state.id, "Exit requested");
                Ok(false)
            }
            Ok(Command::Nick(_)) => {
                // The nickname is fixed once the handshake is done.
                self.state.stats.messages_rejected += 1;
                self.stats.record_message_rejected();
                self.send_frame(&Frame::error(ProtocolError::UnexpectedCommand("MSG or EXIT")))
                    .await?;
                Ok(true)
            }
            Err(err) => {
                self.state.stats.messages_rejected += 1;
                self.stats.record_message_rejected();
                tracing::warn!(session_id = self.state.id, error = %err, "Rejected line");
                self.send_frame(&Frame::error(&err)).await?;
                Ok(true)
            }
        }
    }

    /// Idempotent teardown: at most one EXIT broadcast, one removal, one
    /// socket close, regardless of how many exit paths fired.
    async fn teardown(&mut self) {
        if self.state.phase == SessionPhase::Closed {
            return;
        }

        if let Some(id) = self.state.id {
            if let Some(entry) = self.registry.remove(id).await {
                self.registry.broadcast(&Frame::Exit(entry.nickname), Some(id)).await;
            }
        }

        let _ = self.writer.shutdown().await;
        self.state.close();

        tracing::debug!(
            session_id = self.state.id,
            peer = %self.state.peer_addr,
            duration_ms = self.state.duration().as_millis() as u64,
            messages = self.state.stats.messages_relayed,
            "Session closed"
        );
    }

    async fn read_line(&mut self) -> io::Result<Option<Bytes>> {
        let line = self.reader.read_line().await?;
        if let Some(ref line) = line {
            self.state.stats.lines_received += 1;
            self.state.stats.bytes_received += line.len() as u64 + 1;
        }
        Ok(line)
    }

    async fn send_frame(&mut self, frame: &Frame) -> io::Result<()> {
        self.write_line(frame.encode()).await
    }

    async fn write_line(&mut self, line: Bytes) -> io::Result<()> {
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        self.state.stats.bytes_sent += line.len() as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryConfig;
    use std::net::{IpAddr, Ipv4Addr};

    fn peer() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 40000)
    }

    // The sender must outlive the connection: a dropped shutdown channel
    // reads as an immediate shutdown request.
    fn fixtures() -> (Arc<ClientRegistry>, Arc<ServerStats>, watch::Sender<()>, ServerConfig) {
        let (shutdown_tx, _) = watch::channel(());
        (
            Arc::new(ClientRegistry::new()),
            Arc::new(ServerStats::new()),
            shutdown_tx,
            ServerConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_handshake_then_peer_close() {
        let (registry, stats, shutdown_tx, config) = fixtures();
        let shutdown = shutdown_tx.subscribe();
        let mock = tokio_test::io::Builder::new()
            .write(b"HELLO 1\n")
            .read(b"NICK alice\n")
            .write(b"OK\n")
            .build();

        let mut connection = Connection::new(
            mock,
            peer(),
            Arc::clone(&registry),
            stats.clone(),
            shutdown,
            &config,
        );
        connection.run().await.unwrap();

        assert!(connection.state.is_closed());
        assert!(registry.is_empty().await);
        assert_eq!(stats.snapshot().sessions_registered, 1);
    }

    #[tokio::test]
    async fn test_invalid_nickname_refused() {
        let (registry, stats, shutdown_tx, config) = fixtures();
        let shutdown = shutdown_tx.subscribe();
        let mock = tokio_test::io::Builder::new()
            .write(b"HELLO 1\n")
            .read(b"NICK bad name\n")
            .write(b"ERROR invalid nickname\n")
            .build();

        let mut connection =
            Connection::new(mock, peer(), Arc::clone(&registry), stats, shutdown, &config);
        connection.run().await.unwrap();

        assert!(registry.is_empty().await);
        assert!(connection.state.nickname.is_none());
    }

    #[tokio::test]
    async fn test_join_message_and_exit_reach_peer() {
        let (registry, stats, shutdown_tx, config) = fixtures();
        let shutdown = shutdown_tx.subscribe();
        let (peer_tx, mut peer_rx) = mpsc::unbounded_channel();
        let _observer = registry.register("eve", peer_tx).await.unwrap();

        let mock = tokio_test::io::Builder::new()
            .write(b"HELLO 1\n")
            .read(b"NICK bob\n")
            .write(b"OK\n")
            .read(b"MSG hello\n")
            .read(b"EXIT\n")
            .build();

        let mut connection =
            Connection::new(mock, peer(), Arc::clone(&registry), stats, shutdown, &config);
        connection.run().await.unwrap();

        assert_eq!(
            peer_rx.recv().await.unwrap(),
            Outbound::Line(Frame::Join("bob".to_string()).encode())
        );
        assert_eq!(
            peer_rx.recv().await.unwrap(),
            Outbound::Line(
                Frame::Message {
                    nickname: "bob".to_string(),
                    text: "hello".to_string()
                }
                .encode()
            )
        );
        assert_eq!(
            peer_rx.recv().await.unwrap(),
            Outbound::Line(Frame::Exit("bob".to_string()).encode())
        );
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_oversize_message_rejected_to_sender_only() {
        let (registry, stats, shutdown_tx, config) = fixtures();
        let shutdown = shutdown_tx.subscribe();
        let (peer_tx, mut peer_rx) = mpsc::unbounded_channel();
        registry.register("eve", peer_tx).await.unwrap();

        let oversize = "a".repeat(300);
        let error_line = format!("ERROR {}\n", ProtocolError::MessageTooLong(300));
        let mock = tokio_test::io::Builder::new()
            .write(b"HELLO 1\n")
            .read(b"NICK alice\n")
            .write(b"OK\n")
            .read(format!("MSG {}\n", oversize).as_bytes())
            .write(error_line.as_bytes())
            .read(b"EXIT\n")
            .build();

        let mut connection = Connection::new(
            mock,
            peer(),
            Arc::clone(&registry),
            Arc::clone(&stats),
            shutdown,
            &config,
        );
        connection.run().await.unwrap();

        // The observer saw the join and the exit, never the oversize text.
        assert_eq!(
            peer_rx.recv().await.unwrap(),
            Outbound::Line(Frame::Join("alice".to_string()).encode())
        );
        assert_eq!(
            peer_rx.recv().await.unwrap(),
            Outbound::Line(Frame::Exit("alice".to_string()).encode())
        );
        assert_eq!(stats.snapshot().messages_relayed, 0);
        assert_eq!(stats.snapshot().messages_rejected, 1);
    }

    #[tokio::test]
    async fn test_capacity_refused_without_protocol_error() {
        let (_, stats, shutdown_tx, config) = fixtures();
        let shutdown = shutdown_tx.subscribe();
        let registry =
            Arc::new(ClientRegistry::with_config(RegistryConfig::default().max_clients(1)));
        let (full_tx, _full_rx) = mpsc::unbounded_channel();
        registry.register("alice", full_tx).await.unwrap();

        // HELLO and the NICK read happen, then the connection just closes.
        let mock = tokio_test::io::Builder::new()
            .write(b"HELLO 1\n")
            .read(b"NICK bob\n")
            .build();

        let mut connection =
            Connection::new(mock, peer(), Arc::clone(&registry), stats, shutdown, &config);
        connection.run().await.unwrap();

        assert_eq!(registry.len().await, 1);
        assert!(connection.state.nickname.is_none());
    }

    #[tokio::test]
    async fn test_teardown_is_idempotent() {
        let (registry, stats, shutdown_tx, config) = fixtures();
        let shutdown = shutdown_tx.subscribe();
        let (peer_tx, mut peer_rx) = mpsc::unbounded_channel();
        registry.register("eve", peer_tx).await.unwrap();

        let mock = tokio_test::io::Builder::new()
            .write(b"HELLO 1\n")
            .read(b"NICK bob\n")
            .write(b"OK\n")
            .build();

        let mut connection =
            Connection::new(mock, peer(), Arc::clone(&registry), stats, shutdown, &config);
        connection.run().await.unwrap();
        // A second teardown (e.g. racing exit paths) must not announce again.
        connection.teardown().await;

        assert_eq!(
            peer_rx.recv().await.unwrap(),
            Outbound::Line(Frame::Join("bob".to_string()).encode())
        );
        assert_eq!(
            peer_rx.recv().await.unwrap(),
            Outbound::Line(Frame::Exit("bob".to_string()).encode())
        );
        assert!(peer_rx.try_recv().is_err());
    }
}
