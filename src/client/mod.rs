//! Chat relay client
//!
//! High-level API for joining a chat relay server: connect, complete the
//! nickname handshake, then send messages and pull peer events.

use std::io;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::error::{ProtocolError, Result};
use crate::protocol::command::{is_valid_nickname, Command, Frame};
use crate::protocol::constants::{MAX_MESSAGE_LEN, PROTOCOL_VERSION};
use crate::protocol::framer::LineReader;

/// Events observed by a connected client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// A peer's chat message was relayed to us
    Message {
        /// Sender nickname, as stamped by the server
        nickname: String,
        /// Message text
        text: String,
    },
    /// A peer became active
    Joined(String),
    /// A peer disconnected
    Left(String),
    /// The server rejected one of our lines
    ServerError(String),
}

/// Connected chat client
///
/// # Example
/// ```no_run
/// use chat_relay::client::{ChatClient, ChatEvent};
///
/// # async fn example() -> chat_relay::error::Result<()> {
/// let mut client = ChatClient::connect("127.0.0.1:7667", "alice").await?;
/// client.send("hello, everyone").await?;
///
/// while let Some(event) = client.next_event().await? {
///     if let ChatEvent::Message { nickname, text } = event {
///         println!("{}: {}", nickname, text);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct ChatClient {
    reader: LineReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    nickname: String,
}

impl ChatClient {
    /// Connect to a server and complete the nickname handshake.
    ///
    /// The nickname is validated locally before any traffic is sent; the
    /// server must greet with `HELLO 1` and answer the `NICK` line with
    /// `OK`. An `ERROR <reason>` answer surfaces as
    /// [`ProtocolError::Rejected`].
    pub async fn connect(addr: impl ToSocketAddrs, nickname: &str) -> Result<Self> {
        if !is_valid_nickname(nickname) {
            return Err(ProtocolError::InvalidNickname(nickname.to_string()).into());
        }

        let stream = TcpStream::connect(addr).await?;
        let (read_half, write_half) = stream.into_split();
        let mut client = Self {
            reader: LineReader::new(read_half),
            writer: write_half,
            nickname: nickname.to_string(),
        };

        match client.read_frame().await? {
            Some(Frame::Hello(PROTOCOL_VERSION)) => {}
            Some(frame) => {
                return Err(ProtocolError::UnexpectedGreeting(frame.to_string()).into())
            }
            None => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
        }

        client.write_command(&Command::Nick(nickname.to_string())).await?;

        match client.read_frame().await? {
            Some(Frame::Ok) => {}
            Some(Frame::Error(reason)) => return Err(ProtocolError::Rejected(reason).into()),
            Some(frame) => return Err(ProtocolError::UnexpectedFrame(frame.to_string()).into()),
            None => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
        }

        tracing::debug!(nickname = %nickname, "Handshake complete");
        Ok(client)
    }

    /// The nickname accepted by the server.
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Send a chat message.
    ///
    /// Text is checked locally: no embedded newline, at most 255 characters.
    pub async fn send(&mut self, text: &str) -> Result<()> {
        if text.contains('\n') {
            return Err(ProtocolError::EmbeddedNewline.into());
        }
        let len = text.chars().count();
        if len > MAX_MESSAGE_LEN {
            return Err(ProtocolError::MessageTooLong(len).into());
        }
        self.write_command(&Command::Msg(text.to_string())).await
    }

    /// Pull the next event; `Ok(None)` when the server closes the stream.
    pub async fn next_event(&mut self) -> Result<Option<ChatEvent>> {
        loop {
            let frame = match self.read_frame().await? {
                Some(frame) => frame,
                None => return Ok(None),
            };

            match frame {
                Frame::Message { nickname, text } => {
                    return Ok(Some(ChatEvent::Message { nickname, text }))
                }
                Frame::Join(nickname) => return Ok(Some(ChatEvent::Joined(nickname))),
                Frame::Exit(nickname) => return Ok(Some(ChatEvent::Left(nickname))),
                Frame::Error(reason) => return Ok(Some(ChatEvent::ServerError(reason))),
                // Handshake frames after the handshake carry no event.
                Frame::Hello(_) | Frame::Ok => {
                    tracing::debug!(frame = %frame, "Ignoring stray handshake frame");
                }
            }
        }
    }

    /// Announce departure and close the outgoing half of the connection.
    pub async fn exit(&mut self) -> Result<()> {
        self.write_command(&Command::Exit).await?;
        self.writer.shutdown().await?;
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Option<Frame>> {
        match self.reader.read_line().await? {
            Some(line) => Ok(Some(Frame::decode(&line)?)),
            None => Ok(None),
        }
    }

    async fn write_command(&mut self, command: &Command) -> Result<()> {
        let line = command.encode();
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
