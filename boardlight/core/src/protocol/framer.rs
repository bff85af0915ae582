//! Line Framer
//!
//! Turns a raw byte stream into discrete newline-terminated lines. The
//! socket hands us arbitrarily sized chunks: a message may arrive split
//! across several reads, or several messages may arrive in one read. The
//! framer accumulates bytes and yields complete lines in arrival order,
//! keeping any partial trailing line for the next push.
//!
//! The protocol has no length field, so the framer imposes its own cap on
//! unterminated data: a peer that streams kilobytes without ever sending a
//! terminator is not speaking this protocol, and the pending buffer is
//! dropped with a warning rather than growing without bound. Legitimate
//! messages are tens of bytes, seconds apart.

/// Default cap on accumulated unterminated bytes (8 KiB).
pub const DEFAULT_MAX_PENDING_BYTES: usize = 8 * 1024;

/// Buffer size below which we skip compaction entirely.
const MIN_COMPACT_BYTES: usize = 4096;

/// Incremental line framer for one connection.
///
/// Feed chunks with [`push`](Self::push), drain complete lines with
/// [`next_line`](Self::next_line). The framer is restartable per
/// connection: create a fresh one for each accepted stream.
#[derive(Debug)]
pub struct LineFramer {
    buffer: Vec<u8>,
    /// Start of not-yet-consumed data within `buffer`
    read_pos: usize,
    max_pending: usize,
}

impl LineFramer {
    /// Create a framer with the default pending-byte cap.
    pub fn new() -> Self {
        Self::with_max_pending(DEFAULT_MAX_PENDING_BYTES)
    }

    /// Create a framer with an explicit pending-byte cap.
    pub fn with_max_pending(max_pending: usize) -> Self {
        Self {
            buffer: Vec::new(),
            read_pos: 0,
            max_pending,
        }
    }

    /// Append a chunk of raw bytes.
    ///
    /// Empty chunks (a read timeout surfaced as a zero-length slice) are
    /// no-ops. If the unterminated backlog would exceed the cap, the whole
    /// pending buffer is discarded and a warning logged; complete lines are
    /// always extracted eagerly by the caller, so only garbage is lost.
    pub fn push(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }

        // Compact once the consumed prefix dominates the buffer.
        if self.read_pos > self.buffer.len() / 2 && self.read_pos > MIN_COMPACT_BYTES {
            self.buffer.drain(..self.read_pos);
            self.read_pos = 0;
        }

        self.buffer.extend_from_slice(chunk);

        if self.pending() > self.max_pending {
            tracing::warn!(
                pending = self.pending(),
                cap = self.max_pending,
                "unterminated data exceeded cap, dropping buffer"
            );
            self.buffer.clear();
            self.read_pos = 0;
        }
    }

    /// Number of buffered bytes not yet returned as lines.
    pub fn pending(&self) -> usize {
        self.buffer.len() - self.read_pos
    }

    /// Extract the next complete line, without its terminator.
    ///
    /// Returns `None` when no full line is buffered. Bytes are decoded
    /// lossily; the protocol is ASCII and anything else ends up as an
    /// unrecognized token downstream.
    pub fn next_line(&mut self) -> Option<String> {
        let pending = &self.buffer[self.read_pos..];
        let nl = pending.iter().position(|&b| b == b'\n')?;
        let line = String::from_utf8_lossy(&pending[..nl]).into_owned();
        self.read_pos += nl + 1;
        Some(line)
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}
