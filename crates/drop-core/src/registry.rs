//! In-memory registry of connected peers.
//!
//! Keyed by [`PeerId`] for O(1) lookup. A session exists here iff its
//! transport connection is currently open: the transport collaborator's
//! connect/close/error callbacks are the only things that add or remove
//! entries.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::peer::{PeerConnection, PeerId, PeerSession, PeerSummary};

#[derive(Default)]
pub struct PeerRegistry {
    sessions: HashMap<PeerId, PeerSession>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly established connection and immediately writes the
    /// local node's INFO self-announcement on it.
    ///
    /// The announcement write may fail if the connection closes instantly;
    /// that is swallowed — the close callback will clean the session up.
    pub fn on_connect(
        &mut self,
        id: PeerId,
        connection: Box<dyn PeerConnection>,
        announcement: &[u8],
    ) {
        let mut session = PeerSession::new(id, connection);
        if let Err(e) = session.connection.write_frame(announcement) {
            debug!("self-announcement to {} failed: {e}", id.short());
        }
        self.sessions.insert(id, session);
        info!("peer {} connected ({} total)", id.short(), self.sessions.len());
    }

    /// Removes the session for `id`, releasing its connection handle.
    ///
    /// Idempotent: disconnecting an already-absent peer is a no-op, since
    /// the transport may report both a close and an error for one teardown.
    pub fn on_disconnect(&mut self, id: PeerId) {
        if self.sessions.remove(&id).is_some() {
            info!(
                "peer {} disconnected ({} remaining)",
                id.short(),
                self.sessions.len()
            );
        }
    }

    pub fn get(&self, id: PeerId) -> Option<&PeerSession> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: PeerId) -> Option<&mut PeerSession> {
        self.sessions.get_mut(&id)
    }

    /// Cloneable snapshot of every session, for the command surface.
    pub fn all(&self) -> Vec<PeerSummary> {
        self.sessions.values().map(PeerSummary::from).collect()
    }

    /// Mutable iteration over sessions, for broadcast fan-out.
    pub fn sessions_mut(&mut self) -> impl Iterator<Item = &mut PeerSession> {
        self.sessions.values_mut()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
