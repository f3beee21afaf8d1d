//! Frame codec: one [`DropMessage`] per newline-terminated JSON line.
//!
//! Wire format:
//! ```text
//! {"type":"CLIP","id":"…","payload":"…","label":"…","alias":"…"}\n
//! ```
//!
//! JSON string escaping guarantees the encoded frame contains exactly one
//! raw `\n` (the terminator), even when a payload or label itself contains
//! newlines, so framing can never be corrupted by message content.
//!
//! Decoding is deliberately forgiving: a misbehaving or newer-versioned peer
//! must not be able to take the session down with garbage, so unparseable
//! lines are reported as `None` and dropped at the dispatch boundary.

use crate::protocol::messages::DropMessage;
use thiserror::Error;

/// Errors that can occur while encoding a frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The message could not be serialized to JSON.
    #[error("failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Encodes a [`DropMessage`] into its wire frame: JSON plus a trailing `\n`.
///
/// # Errors
///
/// Returns [`ProtocolError::Serialize`] if JSON serialization fails.
pub fn encode_frame(msg: &DropMessage) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = serde_json::to_vec(msg)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Parses one line (terminator already stripped) into a [`DropMessage`].
///
/// Returns `None` for anything that is not a JSON object with a string
/// `type` field. Unrecognized `type` tags decode to
/// [`DropMessage::Unknown`], which dispatch ignores — unknown is valid,
/// garbage is not.
pub fn decode_line(line: &str) -> Option<DropMessage> {
    serde_json::from_str(line.trim()).ok()
}
