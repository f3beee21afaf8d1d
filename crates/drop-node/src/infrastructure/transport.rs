//! TCP transport collaborator for the session engine.
//!
//! The engine treats transport as an external collaborator: this module
//! establishes connections (listening and dialing), exchanges a 16-byte
//! identity preamble, and then runs the line protocol:
//!
//! - One **read pump** task per connection feeds raw bytes through a
//!   [`LineBuffer`] and dispatches each complete line into the shared
//!   engine. EOF or a read error tears the session down via
//!   `on_disconnect`.
//! - One **writer** task per connection drains a bounded frame queue into
//!   the socket. The engine-facing handle ([`ChannelConnection`]) only does
//!   a `try_send` into that queue, so a write to a dead or congested peer
//!   fails immediately instead of stalling a broadcast fan-out.

use std::net::SocketAddr;
use std::sync::Arc;

use drop_core::{DropEngine, LineBuffer, PeerConnection, PeerId};
use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::{mpsc, Mutex},
};
use tracing::{debug, info, warn};

/// Engine shared between every connection task and the CLI.
pub type SharedEngine = Arc<Mutex<DropEngine>>;

/// Outbound frames queued per peer before a slow peer counts as failed.
const WRITE_QUEUE_FRAMES: usize = 64;

/// Errors that can occur in the node transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The TCP listener could not be bound.
    #[error("failed to bind listener on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// An outbound connection attempt failed.
    #[error("failed to connect to {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// The identity preamble exchange failed.
    #[error("identity handshake with {addr} failed: {source}")]
    Handshake {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Listens for and dials peers, binding each resulting byte stream to the
/// shared engine.
pub struct TcpTransport {
    local_id: PeerId,
    engine: SharedEngine,
}

impl TcpTransport {
    pub fn new(local_id: PeerId, engine: SharedEngine) -> Self {
        Self { local_id, engine }
    }

    /// Binds `addr` and spawns the accept loop.
    ///
    /// Returns the actually bound address (useful when `addr` requests an
    /// ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::BindFailed`] if the port cannot be bound;
    /// per-connection failures after that are logged, never fatal.
    pub async fn listen(self: &Arc<Self>, addr: SocketAddr) -> Result<SocketAddr, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::BindFailed { addr, source })?;
        let bound = listener
            .local_addr()
            .map_err(|source| TransportError::BindFailed { addr, source })?;
        info!("listening on {bound}");

        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer_addr)) => {
                        debug!("inbound connection from {peer_addr}");
                        let this = Arc::clone(&this);
                        tokio::spawn(async move {
                            if let Err(e) = this.run_session(stream, peer_addr).await {
                                debug!("session with {peer_addr} ended: {e}");
                            }
                        });
                    }
                    Err(e) => {
                        warn!("accept failed: {e}");
                    }
                }
            }
        });
        Ok(bound)
    }

    /// Dials `addr` and runs the session in the background.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectFailed`] if the TCP connect fails.
    pub async fn dial(self: &Arc<Self>, addr: SocketAddr) -> Result<(), TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| TransportError::ConnectFailed { addr, source })?;
        debug!("outbound connection to {addr}");

        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = this.run_session(stream, addr).await {
                debug!("session with {addr} ended: {e}");
            }
        });
        Ok(())
    }

    /// Runs one connection to completion: handshake, registration, read
    /// pump, teardown.
    async fn run_session(
        &self,
        mut stream: TcpStream,
        peer_addr: SocketAddr,
    ) -> Result<(), TransportError> {
        let peer_id = exchange_identity(&mut stream, self.local_id, peer_addr).await?;
        if peer_id == self.local_id {
            debug!("dropping self-connection via {peer_addr}");
            return Ok(());
        }

        let (mut read_half, mut write_half) = stream.into_split();

        // Writer task: drains the bounded queue so engine-side writes never
        // touch the socket directly.
        let (frame_tx, mut frame_rx) = mpsc::channel::<Vec<u8>>(WRITE_QUEUE_FRAMES);
        tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                if let Err(e) = write_half.write_all(&frame).await {
                    debug!("socket write failed: {e}");
                    break;
                }
            }
            // Dropping the half closes the write side; the peer sees EOF.
        });

        {
            let mut engine = self.engine.lock().await;
            engine.on_connect(peer_id, Box::new(ChannelConnection { frames: frame_tx }));
        }

        // Read pump: the only task reading this connection, so dispatch
        // order matches frame order.
        let mut buffer = LineBuffer::new();
        let mut chunk = [0u8; 4096];
        loop {
            match read_half.read(&mut chunk).await {
                Ok(0) => break, // clean EOF
                Ok(n) => {
                    let lines = buffer.feed(&chunk[..n]);
                    if !lines.is_empty() {
                        let mut engine = self.engine.lock().await;
                        for line in lines {
                            engine.handle_line(peer_id, &line);
                        }
                    }
                }
                Err(e) => {
                    debug!("read from {} failed: {e}", peer_id.short());
                    break;
                }
            }
        }

        self.engine.lock().await.on_disconnect(peer_id);
        Ok(())
    }
}

/// Sends our 16-byte identity and reads the peer's.
async fn exchange_identity(
    stream: &mut TcpStream,
    local_id: PeerId,
    addr: SocketAddr,
) -> Result<PeerId, TransportError> {
    let wrap = |source| TransportError::Handshake { addr, source };
    stream.write_all(local_id.as_bytes()).await.map_err(wrap)?;
    let mut bytes = [0u8; PeerId::LEN];
    stream.read_exact(&mut bytes).await.map_err(wrap)?;
    Ok(PeerId::from_bytes(bytes))
}

/// Engine-facing write handle backed by the per-peer frame queue.
///
/// `try_send` gives the fail-fast semantics the engine requires: a full
/// queue (peer too slow) or a gone writer task (peer dead) is an immediate
/// error, and the fan-out moves on to the next peer.
struct ChannelConnection {
    frames: mpsc::Sender<Vec<u8>>,
}

impl PeerConnection for ChannelConnection {
    fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()> {
        use tokio::sync::mpsc::error::TrySendError;
        self.frames.try_send(frame.to_vec()).map_err(|e| match e {
            TrySendError::Full(_) => {
                std::io::Error::new(std::io::ErrorKind::WouldBlock, "peer write queue full")
            }
            TrySendError::Closed(_) => {
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "peer writer gone")
            }
        })
    }
}
