//! Core configuration values.
//!
//! The engine only consumes values; where they come from (TOML file, CLI
//! flags) is the embedding application's concern. Fields carry serde
//! defaults so a partial config section deserializes cleanly.

use serde::{Deserialize, Serialize};

/// Maximum accepted CLIP payload size in bytes.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 4096;

/// Number of received clips retained in the history ring.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Maximum length of a display alias in characters.
pub const MAX_ALIAS_CHARS: usize = 24;

/// Tunable values the session engine depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on CLIP payload byte length, both outbound (validated)
    /// and inbound (truncated defensively; the bound is advisory across
    /// peer versions).
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
    /// Capacity of the received-clip history ring.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// This node's display name. Empty means "derive from the peer id".
    #[serde(default)]
    pub alias: String,
    /// This node's initial presence string.
    #[serde(default = "default_initial_status")]
    pub status: String,
}

fn default_max_payload_bytes() -> usize {
    DEFAULT_MAX_PAYLOAD_BYTES
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_initial_status() -> String {
    crate::protocol::messages::DEFAULT_STATUS.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            alias: String::new(),
            status: default_initial_status(),
        }
    }
}
