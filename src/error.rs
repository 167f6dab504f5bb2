//! Error types for the chat relay
//!
//! Protocol violations are recoverable: the server answers them with an
//! `ERROR <reason>` line (closing the connection only during the handshake),
//! and the client surfaces them as typed errors. I/O failures tear down the
//! affected session; nothing here is fatal to the process.

use std::fmt;
use std::io;

use crate::protocol::constants::MAX_MESSAGE_LEN;
use crate::registry::RegistryError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Underlying socket I/O failed
    Io(io::Error),
    /// A peer violated the wire protocol
    Protocol(ProtocolError),
    /// The registry rejected an operation
    Registry(RegistryError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Protocol(e) => write!(f, "protocol error: {}", e),
            Error::Registry(e) => write!(f, "registry error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Protocol(e) => Some(e),
            Error::Registry(e) => Some(e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::Registry(e)
    }
}

/// A violation of the line protocol
///
/// The `Display` text doubles as the `<reason>` of an `ERROR <reason>` wire
/// line, so it stays short and never contains a newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Line contained bytes outside UTF-8
    InvalidEncoding,
    /// Command token not recognized
    UnknownCommand(String),
    /// Command is missing its required argument
    MissingArgument(&'static str),
    /// Nickname failed the `[A-Za-z0-9_]{1,12}` check
    InvalidNickname(String),
    /// Message text exceeds the protocol limit
    MessageTooLong(usize),
    /// A different command was required in the current state
    UnexpectedCommand(&'static str),
    /// Outgoing text may not contain a newline
    EmbeddedNewline,
    /// Server greeting was missing or carried the wrong version (client side)
    UnexpectedGreeting(String),
    /// Server answered the handshake with `ERROR <reason>` (client side)
    Rejected(String),
    /// Server sent a frame that does not fit the client's state (client side)
    UnexpectedFrame(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::InvalidEncoding => write!(f, "invalid encoding"),
            ProtocolError::UnknownCommand(command) => {
                write!(f, "unknown command '{}'", command)
            }
            ProtocolError::MissingArgument(command) => {
                write!(f, "missing argument for {}", command)
            }
            ProtocolError::InvalidNickname(_) => write!(f, "invalid nickname"),
            ProtocolError::MessageTooLong(len) => {
                write!(f, "message too long ({} > {} characters)", len, MAX_MESSAGE_LEN)
            }
            ProtocolError::UnexpectedCommand(expected) => write!(f, "expected {}", expected),
            ProtocolError::EmbeddedNewline => write!(f, "text contains a newline"),
            ProtocolError::UnexpectedGreeting(line) => {
                write!(f, "unexpected greeting '{}'", line)
            }
            ProtocolError::Rejected(reason) => write!(f, "rejected by server: {}", reason),
            ProtocolError::UnexpectedFrame(frame) => write!(f, "unexpected frame '{}'", frame),
        }
    }
}

impl std::error::Error for ProtocolError {}
