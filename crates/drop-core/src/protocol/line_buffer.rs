//! Per-connection reassembly of newline-delimited frames.
//!
//! A streaming transport makes no promises about read boundaries: one read
//! may deliver half a frame, three frames, or a frame split in the middle of
//! a multi-byte UTF-8 character. [`LineBuffer`] accumulates raw bytes per
//! connection and emits each complete line exactly once, in order, no matter
//! how the bytes were chunked. A stateless per-read parse would silently
//! corrupt or drop frames under realistic network conditions.

/// Accumulates transport reads and splits them into complete lines.
///
/// One instance per connection. Not thread-safe by itself; each connection's
/// read pump owns its buffer exclusively.
#[derive(Debug, Default)]
pub struct LineBuffer {
    /// Bytes received but not yet terminated by `\n`.
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one transport read and returns every line completed by it.
    ///
    /// Lines are returned with the terminator stripped, in arrival order.
    /// Blank lines are filtered out, as are lines that are not valid UTF-8
    /// (malformed input is dropped, never fatal). The trailing incomplete
    /// fragment, if any, is retained for the next feed.
    pub fn feed(&mut self, data: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(data);

        let mut lines = Vec::new();
        // Split on every terminator present so far; the byte level matters
        // here because a chunk boundary can fall inside a UTF-8 sequence.
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop(); // strip the terminator
            match String::from_utf8(line) {
                Ok(text) if !text.trim().is_empty() => lines.push(text),
                Ok(_) => {} // blank line
                Err(e) => {
                    tracing::debug!("dropping non-UTF-8 line: {e}");
                }
            }
        }
        lines
    }

    /// Number of buffered bytes awaiting a terminator.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
