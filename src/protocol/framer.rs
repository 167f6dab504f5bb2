//! Stream-to-lines boundary reconstruction
//!
//! TCP preserves byte order but not write boundaries: a single read may
//! carry a fragment of a line, exactly one line, or several lines at once.
//! [`LineFramer`] rebuilds the `\n`-delimited protocol units from that
//! stream, holding any partial tail until the rest of it arrives.
//! [`LineReader`] drives a framer from an [`AsyncRead`] source and maps a
//! 0-byte read to end-of-stream rather than an empty line.

use bytes::{Bytes, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::constants::{MAX_LINE_LEN, READ_CHUNK_SIZE};

/// Splits a byte stream into complete protocol lines.
///
/// Lines are returned with the `\n` terminator stripped; a `\r` immediately
/// before it is stripped as well, so telnet-style clients work unchanged.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: BytesMut,
    /// Scan resumes here, past bytes already known to hold no newline.
    scan: usize,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes from the stream.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the next complete line, if one is buffered.
    ///
    /// A single `feed` may make zero, one, or many lines available; callers
    /// drain with repeated calls until `None`.
    pub fn next_line(&mut self) -> Option<Bytes> {
        while self.scan < self.buf.len() {
            if self.buf[self.scan] == b'\n' {
                let mut line = self.buf.split_to(self.scan + 1);
                self.scan = 0;
                line.truncate(line.len() - 1);
                if line.last() == Some(&b'\r') {
                    line.truncate(line.len() - 1);
                }
                return Some(line.freeze());
            }
            self.scan += 1;
        }
        None
    }

    /// Bytes buffered without a terminating newline yet.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Async line source over any [`AsyncRead`].
///
/// Wraps a [`LineFramer`], reading more bytes whenever no complete line is
/// buffered. Enforces a maximum line length so a peer cannot grow the tail
/// buffer without bound.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    framer: LineFramer,
    chunk: BytesMut,
    max_line_len: usize,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_limit(inner, MAX_LINE_LEN)
    }

    /// Create a reader with a custom maximum line length in bytes.
    pub fn with_limit(inner: R, max_line_len: usize) -> Self {
        Self {
            inner,
            framer: LineFramer::new(),
            chunk: BytesMut::with_capacity(READ_CHUNK_SIZE),
            max_line_len,
        }
    }

    /// Read the next complete line, terminator stripped.
    ///
    /// Returns `Ok(None)` on orderly peer shutdown; a partial tail left at
    /// end-of-stream is discarded, never surfaced as a line. Read errors
    /// propagate untouched. Cancellation at the read await point loses no
    /// buffered data, so this is safe to race inside `select!`.
    pub async fn read_line(&mut self) -> io::Result<Option<Bytes>> {
        loop {
            if let Some(line) = self.framer.next_line() {
                return Ok(Some(line));
            }
            if self.framer.pending() > self.max_line_len {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "line exceeds maximum length",
                ));
            }
            self.chunk.clear();
            self.chunk.reserve(READ_CHUNK_SIZE);
            let n = self.inner.read_buf(&mut self.chunk).await?;
            if n == 0 {
                if self.framer.pending() > 0 {
                    tracing::debug!(
                        pending = self.framer.pending(),
                        "Discarding partial line at end of stream"
                    );
                }
                return Ok(None);
            }
            self.framer.feed(&self.chunk);
        }
    }
}
