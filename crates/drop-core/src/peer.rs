//! Peer identity and per-peer session state.

use std::fmt;
use std::io;

use uuid::Uuid;

/// Opaque fixed-length identity of a peer.
///
/// The transport collaborator assigns one per connection and guarantees it
/// is unique for the connection's lifetime. The engine never interprets the
/// bytes; it only uses them as a registry key and, via [`PeerId::short`],
/// as a fallback display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId([u8; 16]);

impl PeerId {
    pub const LEN: usize = 16;

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Generates a fresh random identity for the local node.
    pub fn random() -> Self {
        Self(Uuid::new_v4().into_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Short human-readable rendering: first 8 hex digits, `…`, last 4.
    pub fn short(&self) -> String {
        let hex = self.to_string();
        format!("{}…{}", &hex[..8], &hex[hex.len() - 4..])
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Write seam between the session engine and the transport collaborator.
///
/// Implementations must fail fast: a write to a closed or congested peer
/// returns an error immediately instead of blocking, so one dead peer can
/// never stall a broadcast fan-out to the others.
pub trait PeerConnection: Send {
    /// Queues one encoded frame for delivery to the peer.
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()>;
}

/// Session state for one connected remote peer.
///
/// Exists in the registry iff the underlying connection is open; the
/// connection handle is owned exclusively by the session and released when
/// the transport reports the close.
pub struct PeerSession {
    pub id: PeerId,
    /// Exclusively-owned transport handle.
    pub connection: Box<dyn PeerConnection>,
    /// Display name; starts as the short id until the peer's INFO arrives.
    pub alias: String,
    /// Presence string; starts as `"online"`.
    pub status: String,
}

impl PeerSession {
    pub fn new(id: PeerId, connection: Box<dyn PeerConnection>) -> Self {
        Self {
            id,
            connection,
            alias: id.short(),
            status: crate::protocol::messages::DEFAULT_STATUS.to_string(),
        }
    }
}

impl fmt::Debug for PeerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerSession")
            .field("id", &self.id)
            .field("alias", &self.alias)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Cloneable view of a session, for the read-only command surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSummary {
    pub id: PeerId,
    pub alias: String,
    pub status: String,
}

impl From<&PeerSession> for PeerSummary {
    fn from(session: &PeerSession) -> Self {
        Self {
            id: session.id,
            alias: session.alias.clone(),
            status: session.status.clone(),
        }
    }
}
