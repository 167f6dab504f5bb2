//! Protocol constants

/// Wire protocol version announced in the `HELLO` greeting
pub const PROTOCOL_VERSION: u32 = 1;

/// Longest accepted nickname, in characters
pub const MAX_NICKNAME_LEN: usize = 12;

/// Longest accepted chat message text, in characters
pub const MAX_MESSAGE_LEN: usize = 255;

/// Longest accepted raw protocol line, in bytes
///
/// Generous headroom over `MAX_MESSAGE_LEN`; a peer streaming more than this
/// without a newline is cut off rather than buffered without bound.
pub const MAX_LINE_LEN: usize = 1024;

/// Default client capacity for servers and registries
pub const DEFAULT_MAX_CLIENTS: usize = 50;

/// Chunk size for reads feeding the line framer
pub const READ_CHUNK_SIZE: usize = 4096;
