//! Wire command parsing and serialization
//!
//! One protocol line is `<COMMAND> <args...>` (terminator already stripped
//! by the framer). The command token ends at the first run of ASCII
//! whitespace; what each command makes of the remainder is its own
//! business: `NICK` takes a nickname, `MSG` takes the whole rest of the
//! line as text, `EXIT` takes nothing.

use std::fmt;

use bytes::Bytes;

use crate::error::ProtocolError;

use super::constants::{MAX_NICKNAME_LEN, PROTOCOL_VERSION};

/// Client-to-server command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `NICK <name>`: request a nickname during the handshake
    Nick(String),
    /// `MSG <text>`: chat message; the remainder of the line is the text
    Msg(String),
    /// `EXIT`: voluntary disconnect
    Exit,
}

impl Command {
    /// Decode one client line.
    ///
    /// An unknown command, a missing argument, or an invalid nickname comes
    /// back as a [`ProtocolError`]; the caller decides whether to answer
    /// with an `ERROR` line or drop the connection. A sender name embedded
    /// in `MSG` is deliberately not parsed out: the server stamps the
    /// authenticated nickname on relay and never trusts client input for it.
    pub fn decode(line: &[u8]) -> Result<Self, ProtocolError> {
        let line = std::str::from_utf8(line).map_err(|_| ProtocolError::InvalidEncoding)?;
        let (command, rest) = split_command(line);
        match command {
            "NICK" => match rest {
                Some(name) if is_valid_nickname(name) => Ok(Command::Nick(name.to_string())),
                Some(name) => Err(ProtocolError::InvalidNickname(name.to_string())),
                None => Err(ProtocolError::MissingArgument("NICK")),
            },
            "MSG" => match rest {
                Some(text) => Ok(Command::Msg(text.to_string())),
                None => Err(ProtocolError::MissingArgument("MSG")),
            },
            // Tolerates a trailing argument; the original clients send none.
            "EXIT" => Ok(Command::Exit),
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }

    /// Serialize to a wire line, newline-terminated.
    pub fn encode(&self) -> Bytes {
        let mut line = self.to_string();
        line.push('\n');
        Bytes::from(line)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Nick(name) => write!(f, "NICK {}", name),
            Command::Msg(text) => write!(f, "MSG {}", text),
            Command::Exit => write!(f, "EXIT"),
        }
    }
}

/// Server-to-client frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// `HELLO <version>`: greeting sent immediately on accept
    Hello(u32),
    /// `OK`: nickname accepted
    Ok,
    /// `ERROR <reason>`: request rejected
    Error(String),
    /// `MSG <nickname> <text>`: relayed chat message
    Message { nickname: String, text: String },
    /// `JOIN <nickname>`: a peer became active
    Join(String),
    /// `EXIT <nickname>`: a peer disconnected
    Exit(String),
}

impl Frame {
    /// The greeting for the protocol version this crate speaks.
    pub fn hello() -> Self {
        Frame::Hello(PROTOCOL_VERSION)
    }

    /// An `ERROR` frame carrying the display text of `reason`.
    pub fn error(reason: impl fmt::Display) -> Self {
        Frame::Error(reason.to_string())
    }

    /// Serialize to a canonical wire line, newline-terminated.
    ///
    /// Emitted lines never contain an embedded newline: nicknames are
    /// charset-checked and chat text arrives through the framer, which
    /// cannot produce one.
    pub fn encode(&self) -> Bytes {
        let mut line = self.to_string();
        debug_assert!(!line.contains('\n'));
        line.push('\n');
        Bytes::from(line)
    }

    /// Decode one server line (the client side of the codec).
    pub fn decode(line: &[u8]) -> Result<Self, ProtocolError> {
        let line = std::str::from_utf8(line).map_err(|_| ProtocolError::InvalidEncoding)?;
        let (command, rest) = split_command(line);
        match command {
            "HELLO" => match rest.and_then(|version| version.parse::<u32>().ok()) {
                Some(version) => Ok(Frame::Hello(version)),
                None => Err(ProtocolError::UnexpectedGreeting(line.to_string())),
            },
            "OK" => Ok(Frame::Ok),
            "ERROR" => Ok(Frame::Error(rest.unwrap_or_default().to_string())),
            "MSG" => {
                let rest = rest.ok_or(ProtocolError::MissingArgument("MSG"))?;
                let (nickname, text) = split_command(rest);
                if nickname.is_empty() {
                    return Err(ProtocolError::MissingArgument("MSG"));
                }
                Ok(Frame::Message {
                    nickname: nickname.to_string(),
                    text: text.unwrap_or_default().to_string(),
                })
            }
            "JOIN" => match rest {
                Some(nickname) => Ok(Frame::Join(nickname.to_string())),
                None => Err(ProtocolError::MissingArgument("JOIN")),
            },
            "EXIT" => match rest {
                Some(nickname) => Ok(Frame::Exit(nickname.to_string())),
                None => Err(ProtocolError::MissingArgument("EXIT")),
            },
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Hello(version) => write!(f, "HELLO {}", version),
            Frame::Ok => write!(f, "OK"),
            Frame::Error(reason) => write!(f, "ERROR {}", reason),
            Frame::Message { nickname, text } => write!(f, "MSG {} {}", nickname, text),
            Frame::Join(nickname) => write!(f, "JOIN {}", nickname),
            Frame::Exit(nickname) => write!(f, "EXIT {}", nickname),
        }
    }
}

/// Validate a nickname: 1 to 12 characters drawn from `[A-Za-z0-9_]`.
///
/// Anchored over the whole string; a valid prefix with trailing garbage
/// fails.
pub fn is_valid_nickname(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NICKNAME_LEN
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Split off the command token at the first run of ASCII whitespace.
///
/// Returns the token and the remainder with that run removed; `None` when
/// the line holds no whitespace at all.
fn split_command(line: &str) -> (&str, Option<&str>) {
    match line.find(|c: char| c.is_ascii_whitespace()) {
        Some(at) => {
            let (command, rest) = line.split_at(at);
            (command, Some(rest.trim_start_matches(|c: char| c.is_ascii_whitespace())))
        }
        None => (line, None),
    }
}
