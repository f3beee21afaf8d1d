//! All dropwire protocol message types.
//!
//! Every message travels as one UTF-8 JSON object per line, discriminated by
//! a `type` field holding one of `INFO | CLIP | STATUS | ACK`. Fields that a
//! peer omits take documented defaults, and fields we do not recognize are
//! ignored, so nodes of different versions can interoperate.

use serde::{Deserialize, Serialize};

/// Current protocol version string, announced in INFO messages.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Status every peer session starts with until the peer says otherwise.
pub const DEFAULT_STATUS: &str = "online";

/// INFO: a peer announces (or re-announces) itself.
///
/// Sent once immediately after a connection is established, and again on
/// demand (the `/ping` command).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoMessage {
    /// Display name chosen by the peer. Empty means "use my short id".
    #[serde(default)]
    pub alias: String,
    /// Free-form presence string.
    #[serde(default = "default_status")]
    pub status: String,
    /// Software version of the sending node, for diagnostics only.
    #[serde(default)]
    pub version: String,
}

/// CLIP: broadcast clipboard content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipMessage {
    /// Random correlation token echoed back in the receiver's ACK.
    /// Empty when a peer omits it; such clips are recorded but not acked.
    #[serde(default)]
    pub id: String,
    /// UTF-8 clipboard text, bounded by the configured maximum byte length.
    #[serde(default)]
    pub payload: String,
    /// Optional free-form tag shown alongside the payload.
    #[serde(default)]
    pub label: String,
    /// Sender's display name at the time of sending.
    #[serde(default)]
    pub alias: String,
}

/// STATUS: presence update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub alias: String,
}

/// ACK: informational receipt for a previously received CLIP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckMessage {
    /// The `id` of the CLIP being acknowledged.
    #[serde(rename = "ref")]
    pub ref_id: String,
}

fn default_status() -> String {
    DEFAULT_STATUS.to_string()
}

/// All valid dropwire messages, discriminated by the wire `type` tag.
///
/// The `Unknown` variant absorbs any tag this version does not recognize;
/// dispatch treats it as a no-op so newer peers never break older ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DropMessage {
    #[serde(rename = "INFO")]
    Info(InfoMessage),
    #[serde(rename = "CLIP")]
    Clip(ClipMessage),
    #[serde(rename = "STATUS")]
    Status(StatusMessage),
    #[serde(rename = "ACK")]
    Ack(AckMessage),
    /// Forward-compatible catch-all for unrecognized `type` tags.
    #[serde(other)]
    Unknown,
}

impl DropMessage {
    /// Returns the wire tag for this message, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            DropMessage::Info(_) => "INFO",
            DropMessage::Clip(_) => "CLIP",
            DropMessage::Status(_) => "STATUS",
            DropMessage::Ack(_) => "ACK",
            DropMessage::Unknown => "UNKNOWN",
        }
    }
}
