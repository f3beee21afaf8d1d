//! The peer-session engine: message dispatch and broadcast fan-out.
//!
//! [`DropEngine`] owns the peer registry, the history ring, and the local
//! node's identity state. Inbound lines flow in through [`DropEngine::handle_line`]
//! (one call per framed line, FIFO per connection); local user actions enter
//! through the `broadcast_*` methods. The engine holds no locks of its own —
//! the embedding application serializes access (the node wraps it in an
//! `Arc<Mutex<_>>`), which keeps every state transition here synchronous and
//! directly testable.
//!
//! Fan-out policy: broadcast is best-effort. A write failure to one peer is
//! counted as non-delivery and logged, but never aborts delivery to the
//! remaining peers and never removes the peer — teardown belongs to the
//! transport collaborator's close/error callbacks.

use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{EngineConfig, MAX_ALIAS_CHARS};
use crate::history::{ClipEntry, HistoryRing};
use crate::peer::{PeerConnection, PeerId, PeerSummary};
use crate::protocol::codec::{decode_line, encode_frame};
use crate::protocol::messages::{
    AckMessage, ClipMessage, DropMessage, InfoMessage, StatusMessage, DEFAULT_STATUS,
    PROTOCOL_VERSION,
};
use crate::registry::PeerRegistry;

/// Errors reported synchronously to a caller requesting a broadcast.
///
/// These are validation rejections: nothing has been sent and no state has
/// been mutated when one is returned.
#[derive(Debug, Error, PartialEq)]
pub enum BroadcastError {
    /// The payload was empty (or whitespace-only) after trimming.
    #[error("payload is empty; nothing broadcast")]
    EmptyPayload,

    /// The payload exceeds the configured byte bound.
    #[error("payload too large: {len} bytes (max {max})")]
    PayloadTooLarge { len: usize, max: usize },
}

/// Message dispatcher and broadcast engine for one local node.
pub struct DropEngine {
    config: EngineConfig,
    local_id: PeerId,
    alias: String,
    status: String,
    registry: PeerRegistry,
    history: HistoryRing,
}

impl DropEngine {
    /// Creates an engine for the local node identified by `local_id`.
    ///
    /// An empty configured alias falls back to `peer-<4 hex>` derived from
    /// the local identity, so a node always has a printable name.
    pub fn new(local_id: PeerId, config: EngineConfig) -> Self {
        let alias = if config.alias.trim().is_empty() {
            let bytes = local_id.as_bytes();
            format!("peer-{:02x}{:02x}", bytes[0], bytes[1])
        } else {
            truncate_chars(config.alias.trim(), MAX_ALIAS_CHARS).to_string()
        };
        let status = if config.status.is_empty() {
            DEFAULT_STATUS.to_string()
        } else {
            config.status.clone()
        };
        let history = HistoryRing::new(config.history_capacity);
        Self {
            config,
            local_id,
            alias,
            status,
            registry: PeerRegistry::new(),
            history,
        }
    }

    // ── Accessors for the command surface ─────────────────────────────────────

    pub fn local_id(&self) -> PeerId {
        self.local_id
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn peers(&self) -> Vec<PeerSummary> {
        self.registry.all()
    }

    pub fn peer_count(&self) -> usize {
        self.registry.len()
    }

    pub fn history(&self) -> Vec<ClipEntry> {
        self.history.snapshot()
    }

    /// Sets the local display alias, trimmed and clamped to 24 characters.
    pub fn set_alias(&mut self, alias: &str) -> &str {
        self.alias = truncate_chars(alias.trim(), MAX_ALIAS_CHARS).to_string();
        &self.alias
    }

    // ── Connection lifecycle (driven by the transport collaborator) ───────────

    /// Registers a new connection and self-announces on it.
    pub fn on_connect(&mut self, id: PeerId, connection: Box<dyn PeerConnection>) {
        match encode_frame(&self.local_info()) {
            Ok(frame) => self.registry.on_connect(id, connection, &frame),
            Err(e) => {
                // Unreachable for well-formed local state; register anyway.
                warn!("could not encode self-announcement: {e}");
                self.registry.on_connect(id, connection, b"");
            }
        }
    }

    /// Removes the peer's session. Safe to call repeatedly.
    pub fn on_disconnect(&mut self, id: PeerId) {
        self.registry.on_disconnect(id);
    }

    // ── Inbound dispatch ──────────────────────────────────────────────────────

    /// Decodes and dispatches one framed line from `from`.
    ///
    /// Unparseable lines are dropped here; nothing a peer sends is fatal.
    pub fn handle_line(&mut self, from: PeerId, line: &str) {
        match decode_line(line) {
            Some(msg) => self.handle_message(from, msg),
            None => debug!("dropping malformed line from {}", from.short()),
        }
    }

    /// Applies one decoded message to peer/session state.
    pub fn handle_message(&mut self, from: PeerId, msg: DropMessage) {
        match msg {
            DropMessage::Info(info) => self.apply_info(from, info),
            DropMessage::Clip(clip) => self.apply_clip(from, clip),
            DropMessage::Status(status) => self.apply_status(from, status),
            DropMessage::Ack(ack) => {
                // Informational only; reserved for future correlation logic.
                debug!("ack from {} for clip {}", from.short(), ack.ref_id);
            }
            DropMessage::Unknown => {
                debug!("ignoring unknown message type from {}", from.short());
            }
        }
    }

    fn apply_info(&mut self, from: PeerId, info: InfoMessage) {
        // An INFO can race ahead of our connect callback; absent session is
        // a benign no-op.
        if let Some(session) = self.registry.get_mut(from) {
            session.alias = if info.alias.is_empty() {
                from.short()
            } else {
                info.alias
            };
            session.status = if info.status.is_empty() {
                DEFAULT_STATUS.to_string()
            } else {
                info.status
            };
            info!(
                "{} is {} (v{})",
                session.alias,
                session.status,
                if info.version.is_empty() { "?" } else { &info.version }
            );
        }
    }

    fn apply_clip(&mut self, from: PeerId, clip: ClipMessage) {
        let sender = self
            .registry
            .get(from)
            .map(|s| s.alias.clone())
            .unwrap_or_else(|| from.short());

        // Peers on other versions may send more than our configured bound.
        let payload = truncate_bytes(&clip.payload, self.config.max_payload_bytes).to_string();
        info!("clip from {sender}: {} bytes", payload.len());
        self.history
            .append(ClipEntry::now(sender, payload, clip.label));

        // Receipt goes to the originating peer only. A clip without an id
        // has nothing to reference, so it gets no ack. The connection may
        // already be closed; a failed ack is not our problem to report.
        if clip.id.is_empty() {
            return;
        }
        let ack = DropMessage::Ack(AckMessage { ref_id: clip.id });
        if let Ok(frame) = encode_frame(&ack) {
            if let Some(session) = self.registry.get_mut(from) {
                if let Err(e) = session.connection.write_frame(&frame) {
                    debug!("ack to {} failed: {e}", from.short());
                }
            }
        }
    }

    fn apply_status(&mut self, from: PeerId, status: StatusMessage) {
        if let Some(session) = self.registry.get_mut(from) {
            session.status = if status.status.is_empty() {
                DEFAULT_STATUS.to_string()
            } else {
                status.status
            };
            info!("{} -> {}", session.alias, session.status);
        }
    }

    // ── Outbound broadcast ────────────────────────────────────────────────────

    /// Broadcasts a clip to every registered peer.
    ///
    /// Returns the number of peers whose write call succeeded. Delivery is
    /// best-effort and unacknowledged at this layer.
    ///
    /// # Errors
    ///
    /// [`BroadcastError::EmptyPayload`] if the payload is blank after
    /// trimming, [`BroadcastError::PayloadTooLarge`] if it exceeds the
    /// configured byte bound. Nothing is sent in either case.
    pub fn broadcast_clip(
        &mut self,
        payload: &str,
        label: &str,
    ) -> Result<usize, BroadcastError> {
        if payload.trim().is_empty() {
            return Err(BroadcastError::EmptyPayload);
        }
        if payload.len() > self.config.max_payload_bytes {
            return Err(BroadcastError::PayloadTooLarge {
                len: payload.len(),
                max: self.config.max_payload_bytes,
            });
        }

        let msg = DropMessage::Clip(ClipMessage {
            id: fresh_clip_id(),
            payload: payload.to_string(),
            label: label.to_string(),
            alias: self.alias.clone(),
        });
        let sent = self.fan_out(&msg);
        info!("clip broadcast to {sent} peer(s)");
        Ok(sent)
    }

    /// Updates the local status and broadcasts it to every peer.
    ///
    /// # Errors
    ///
    /// [`BroadcastError::EmptyPayload`] if the status is blank after trimming.
    pub fn broadcast_status(&mut self, status: &str) -> Result<usize, BroadcastError> {
        let status = status.trim();
        if status.is_empty() {
            return Err(BroadcastError::EmptyPayload);
        }
        self.status = status.to_string();

        let msg = DropMessage::Status(StatusMessage {
            status: self.status.clone(),
            alias: self.alias.clone(),
        });
        let sent = self.fan_out(&msg);
        info!("status \"{status}\" sent to {sent} peer(s)");
        Ok(sent)
    }

    /// Re-announces the local INFO to every peer (the `/ping` action).
    pub fn announce(&mut self) -> usize {
        let msg = self.local_info();
        self.fan_out(&msg)
    }

    /// Writes one encoded frame to every registered session, tolerating
    /// per-peer failure. Returns the successful-write count.
    fn fan_out(&mut self, msg: &DropMessage) -> usize {
        let frame = match encode_frame(msg) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("could not encode {} frame: {e}", msg.kind());
                return 0;
            }
        };

        let mut sent = 0;
        for session in self.registry.sessions_mut() {
            match session.connection.write_frame(&frame) {
                Ok(()) => sent += 1,
                Err(e) => debug!("write to {} failed: {e}", session.id.short()),
            }
        }
        sent
    }

    fn local_info(&self) -> DropMessage {
        DropMessage::Info(InfoMessage {
            alias: self.alias.clone(),
            status: self.status.clone(),
            version: PROTOCOL_VERSION.to_string(),
        })
    }
}

/// Fresh random correlation token for an outbound clip.
fn fresh_clip_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}

/// Clamps `s` to at most `max` bytes, backing off to a char boundary.
fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Clamps `s` to at most `max` characters.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Shared frame log usable after the connection is boxed away.
    type FrameLog = Arc<Mutex<Vec<Vec<u8>>>>;

    struct RecordingConnection {
        frames: FrameLog,
        fail: bool,
    }

    impl PeerConnection for RecordingConnection {
        fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"));
            }
            self.frames.lock().unwrap().push(frame.to_vec());
            Ok(())
        }
    }

    fn recording() -> (Box<dyn PeerConnection>, FrameLog) {
        let frames: FrameLog = Arc::new(Mutex::new(Vec::new()));
        (
            Box::new(RecordingConnection {
                frames: Arc::clone(&frames),
                fail: false,
            }),
            frames,
        )
    }

    fn failing() -> Box<dyn PeerConnection> {
        Box::new(RecordingConnection {
            frames: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        })
    }

    fn decoded(frames: &FrameLog) -> Vec<DropMessage> {
        frames
            .lock()
            .unwrap()
            .iter()
            .map(|f| {
                let line = std::str::from_utf8(f).unwrap();
                decode_line(line).expect("recorded frame must decode")
            })
            .collect()
    }

    fn engine_with_alias(alias: &str) -> DropEngine {
        DropEngine::new(
            PeerId::random(),
            EngineConfig {
                alias: alias.to_string(),
                ..EngineConfig::default()
            },
        )
    }

    #[test]
    fn test_connect_sends_info_announcement() {
        let mut engine = engine_with_alias("local");
        let (conn, frames) = recording();
        engine.on_connect(PeerId::random(), conn);

        let msgs = decoded(&frames);
        assert_eq!(msgs.len(), 1);
        match &msgs[0] {
            DropMessage::Info(info) => {
                assert_eq!(info.alias, "local");
                assert_eq!(info.status, "online");
                assert_eq!(info.version, PROTOCOL_VERSION);
            }
            other => panic!("expected INFO announcement, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_alias_falls_back_to_peer_prefix() {
        let engine = engine_with_alias("");
        assert!(engine.alias().starts_with("peer-"));
        assert_eq!(engine.alias().len(), "peer-".len() + 4);
    }

    #[test]
    fn test_info_updates_session_alias_and_status() {
        let mut engine = engine_with_alias("local");
        let id = PeerId::random();
        let (conn, _) = recording();
        engine.on_connect(id, conn);

        engine.handle_line(
            id,
            r#"{"type":"INFO","alias":"bob","status":"away","version":"1.0.0"}"#,
        );

        let peers = engine.peers();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].alias, "bob");
        assert_eq!(peers[0].status, "away");
    }

    #[test]
    fn test_info_for_unknown_peer_is_a_noop() {
        let mut engine = engine_with_alias("local");
        engine.handle_message(
            PeerId::random(),
            DropMessage::Info(InfoMessage {
                alias: "ghost".to_string(),
                status: "here".to_string(),
                version: String::new(),
            }),
        );
        assert!(engine.peers().is_empty());
    }

    #[test]
    fn test_clip_appends_history_and_acks_sender() {
        let mut engine = engine_with_alias("local");
        let id = PeerId::random();
        let (conn, frames) = recording();
        engine.on_connect(id, conn);

        engine.handle_line(
            id,
            r#"{"type":"CLIP","id":"c0ffee","payload":"hello","label":"greeting"}"#,
        );

        let history = engine.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].payload, "hello");
        assert_eq!(history[0].label, "greeting");
        assert_eq!(history[0].from, id.short());

        // Frame 0 is our INFO announcement; frame 1 must be the ACK.
        let msgs = decoded(&frames);
        assert_eq!(
            msgs[1],
            DropMessage::Ack(AckMessage {
                ref_id: "c0ffee".to_string()
            })
        );
    }

    #[test]
    fn test_clip_without_id_is_recorded_but_not_acked() {
        let mut engine = engine_with_alias("local");
        let id = PeerId::random();
        let (conn, frames) = recording();
        engine.on_connect(id, conn);
        let before = frames.lock().unwrap().len();

        engine.handle_line(id, r#"{"type":"CLIP","payload":"orphan"}"#);

        assert_eq!(engine.history().len(), 1);
        assert_eq!(engine.history()[0].payload, "orphan");
        assert_eq!(frames.lock().unwrap().len(), before, "no ack expected");
    }

    #[test]
    fn test_clip_history_uses_updated_alias() {
        let mut engine = engine_with_alias("local");
        let id = PeerId::random();
        let (conn, _) = recording();
        engine.on_connect(id, conn);
        engine.handle_line(id, r#"{"type":"INFO","alias":"bob","status":"online"}"#);
        engine.handle_line(id, r#"{"type":"CLIP","id":"1","payload":"x"}"#);
        assert_eq!(engine.history()[0].from, "bob");
    }

    #[test]
    fn test_oversized_inbound_clip_is_truncated_on_char_boundary() {
        let mut engine = DropEngine::new(
            PeerId::random(),
            EngineConfig {
                max_payload_bytes: 5,
                ..EngineConfig::default()
            },
        );
        let id = PeerId::random();
        let (conn, _) = recording();
        engine.on_connect(id, conn);

        // "ab" + 'é' (2 bytes) puts the 5-byte cut inside 'ö'.
        engine.handle_message(
            id,
            DropMessage::Clip(ClipMessage {
                id: "1".to_string(),
                payload: "abéö".to_string(),
                label: String::new(),
                alias: String::new(),
            }),
        );
        assert_eq!(engine.history()[0].payload, "abé");
    }

    #[test]
    fn test_clip_ack_failure_is_swallowed() {
        let mut engine = engine_with_alias("local");
        let id = PeerId::random();
        engine.on_connect(id, failing());

        engine.handle_line(id, r#"{"type":"CLIP","id":"1","payload":"x"}"#);
        // The clip is still recorded even though the ack could not be sent.
        assert_eq!(engine.history().len(), 1);
    }

    #[test]
    fn test_status_updates_session() {
        let mut engine = engine_with_alias("local");
        let id = PeerId::random();
        let (conn, _) = recording();
        engine.on_connect(id, conn);

        engine.handle_line(id, r#"{"type":"STATUS","status":"at lunch"}"#);
        assert_eq!(engine.peers()[0].status, "at lunch");
    }

    #[test]
    fn test_ack_and_unknown_mutate_nothing() {
        let mut engine = engine_with_alias("local");
        let id = PeerId::random();
        let (conn, frames) = recording();
        engine.on_connect(id, conn);
        let before = frames.lock().unwrap().len();

        engine.handle_line(id, r#"{"type":"ACK","ref":"c0ffee"}"#);
        engine.handle_line(id, r#"{"type":"FUTURE","field":1}"#);

        assert!(engine.history().is_empty());
        assert_eq!(engine.peers()[0].status, "online");
        assert_eq!(frames.lock().unwrap().len(), before, "no replies expected");
    }

    #[test]
    fn test_malformed_line_is_dropped() {
        let mut engine = engine_with_alias("local");
        let id = PeerId::random();
        let (conn, _) = recording();
        engine.on_connect(id, conn);
        engine.handle_line(id, "%%% not json %%%");
        assert!(engine.history().is_empty());
        assert_eq!(engine.peer_count(), 1);
    }

    #[test]
    fn test_broadcast_clip_rejects_blank_payload() {
        let mut engine = engine_with_alias("local");
        let id = PeerId::random();
        let (conn, frames) = recording();
        engine.on_connect(id, conn);
        let before = frames.lock().unwrap().len();

        assert_eq!(engine.broadcast_clip("", ""), Err(BroadcastError::EmptyPayload));
        assert_eq!(
            engine.broadcast_clip("   \t ", ""),
            Err(BroadcastError::EmptyPayload)
        );
        assert_eq!(frames.lock().unwrap().len(), before, "nothing may be sent");
        assert!(engine.history().is_empty());
    }

    #[test]
    fn test_broadcast_clip_rejects_oversized_payload() {
        let mut engine = engine_with_alias("local");
        let big = "x".repeat(4097);
        assert_eq!(
            engine.broadcast_clip(&big, ""),
            Err(BroadcastError::PayloadTooLarge { len: 4097, max: 4096 })
        );
    }

    #[test]
    fn test_broadcast_clip_counts_only_successful_writes() {
        let mut engine = engine_with_alias("local");
        let (conn_a, frames_a) = recording();
        let (conn_b, frames_b) = recording();
        engine.on_connect(PeerId::random(), conn_a);
        engine.on_connect(PeerId::random(), conn_b);
        engine.on_connect(PeerId::random(), failing());

        let sent = engine.broadcast_clip("hello", "").unwrap();
        assert_eq!(sent, 2);

        for frames in [&frames_a, &frames_b] {
            let msgs = decoded(frames);
            match msgs.last().unwrap() {
                DropMessage::Clip(clip) => {
                    assert_eq!(clip.payload, "hello");
                    assert_eq!(clip.alias, "local");
                    assert_eq!(clip.id.len(), 8);
                }
                other => panic!("expected CLIP, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_broadcast_status_updates_local_state_first() {
        let mut engine = engine_with_alias("local");
        let (conn, frames) = recording();
        engine.on_connect(PeerId::random(), conn);

        let sent = engine.broadcast_status("  do not disturb ").unwrap();
        assert_eq!(sent, 1);
        assert_eq!(engine.status(), "do not disturb");

        match decoded(&frames).last().unwrap() {
            DropMessage::Status(status) => {
                assert_eq!(status.status, "do not disturb");
                assert_eq!(status.alias, "local");
            }
            other => panic!("expected STATUS, got {other:?}"),
        }
    }

    #[test]
    fn test_broadcast_status_rejects_blank() {
        let mut engine = engine_with_alias("local");
        assert_eq!(
            engine.broadcast_status("  "),
            Err(BroadcastError::EmptyPayload)
        );
        assert_eq!(engine.status(), "online", "local status must be untouched");
    }

    #[test]
    fn test_announce_reaches_every_live_peer() {
        let mut engine = engine_with_alias("local");
        let (conn_a, frames_a) = recording();
        engine.on_connect(PeerId::random(), conn_a);
        engine.on_connect(PeerId::random(), failing());

        assert_eq!(engine.announce(), 1);
        let msgs = decoded(&frames_a);
        assert!(matches!(msgs.last().unwrap(), DropMessage::Info(_)));
    }

    #[test]
    fn test_set_alias_clamps_to_24_chars() {
        let mut engine = engine_with_alias("local");
        let long = "a".repeat(40);
        assert_eq!(engine.set_alias(&long).len(), 24);
        assert_eq!(engine.set_alias("  bob  "), "bob");
    }

    #[test]
    fn test_truncate_bytes_respects_char_boundaries() {
        assert_eq!(truncate_bytes("héllo", 2), "h");
        assert_eq!(truncate_bytes("héllo", 3), "hé");
        assert_eq!(truncate_bytes("héllo", 100), "héllo");
    }
}
