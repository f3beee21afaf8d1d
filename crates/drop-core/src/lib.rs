//! # drop-core
//!
//! Message protocol and peer-session engine for dropwire, a peer-to-peer
//! clipboard and presence broadcaster. This crate is the invariant-bearing
//! core: it owns line framing over a streaming transport, message-type
//! dispatch, per-peer session state, best-effort broadcast fan-out, and the
//! bounded receive history.
//!
//! It deliberately knows nothing about sockets: the transport collaborator
//! (see `drop-node`) establishes connections, delivers raw inbound bytes,
//! and implements the [`peer::PeerConnection`] write seam. That keeps every
//! protocol invariant testable without I/O.
//!
//! - **`protocol`** – wire format: one JSON object per `\n`-terminated line,
//!   tagged by a `type` field, plus the [`protocol::LineBuffer`] that
//!   reassembles lines from arbitrarily chunked reads.
//! - **`peer`** / **`registry`** – peer identity and the session map,
//!   mutated only by transport connect/close callbacks and inbound
//!   INFO/STATUS messages.
//! - **`history`** – most-recent-first ring of received clips.
//! - **`engine`** – the dispatcher and broadcast engine tying it together.

pub mod config;
pub mod engine;
pub mod history;
pub mod peer;
pub mod protocol;
pub mod registry;

pub use config::EngineConfig;
pub use engine::{BroadcastError, DropEngine};
pub use history::{ClipEntry, HistoryRing};
pub use peer::{PeerConnection, PeerId, PeerSession, PeerSummary};
pub use protocol::codec::{decode_line, encode_frame, ProtocolError};
pub use protocol::line_buffer::LineBuffer;
pub use protocol::messages::DropMessage;
pub use registry::PeerRegistry;
