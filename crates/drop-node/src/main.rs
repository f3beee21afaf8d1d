//! dropwire node entry point.
//!
//! Wires together configuration, the session engine, the TCP transport, and
//! the interactive CLI:
//!
//! ```text
//! main()
//!  └─ load config (file, then CLI overrides)
//!  └─ DropEngine in Arc<Mutex<_>>   -- shared session state
//!  └─ TcpTransport::listen          -- accept loop
//!  └─ TcpTransport::dial            -- one attempt per configured peer
//!  └─ cli::run                      -- stdin command loop until /exit
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use drop_core::{DropEngine, PeerId};
use drop_node::cli;
use drop_node::infrastructure::config::{self, NodeConfig};
use drop_node::infrastructure::transport::TcpTransport;

/// Clipboard and status beacon for a small mesh of trusted peers.
///
/// Every flag overrides the corresponding value from the config file; flags
/// left unset fall back to the file (or its defaults).
#[derive(Debug, Parser)]
#[command(
    name = "dropwire",
    about = "peer-to-peer clipboard and status beacon",
    version
)]
struct Cli {
    /// Path to the TOML config file.
    ///
    /// Defaults to the platform config dir (e.g. `~/.config/dropwire/config.toml`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// TCP port to listen on for peer connections.
    #[arg(long, value_name = "PORT")]
    listen: Option<u16>,

    /// Display alias announced to peers (clamped to 24 characters).
    #[arg(long)]
    alias: Option<String>,

    /// Peer address to dial at startup; repeatable.
    #[arg(long, value_name = "HOST:PORT")]
    peer: Vec<String>,
}

/// Applies CLI overrides onto the loaded file config.
fn merge(mut config: NodeConfig, cli: &Cli) -> NodeConfig {
    if let Some(port) = cli.listen {
        config.network.listen_port = port;
    }
    if let Some(alias) = &cli.alias {
        config.engine.alias = alias.clone();
    }
    config.network.peers.extend(cli.peer.iter().cloned());
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging; level overridden by RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::default_config_path()?,
    };
    let config = merge(config::load(&config_path)?, &cli);

    let local_id = PeerId::random();
    let engine = DropEngine::new(local_id, config.engine.clone());
    info!("peer id : {}", local_id.short());
    info!("alias   : {}", engine.alias());
    let engine = Arc::new(Mutex::new(engine));

    let transport = Arc::new(TcpTransport::new(local_id, Arc::clone(&engine)));
    let listen_addr: SocketAddr = ([0, 0, 0, 0], config.network.listen_port).into();
    transport.listen(listen_addr).await?;

    for peer in &config.network.peers {
        match peer.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = transport.dial(addr).await {
                    warn!("{e}");
                }
            }
            Err(e) => warn!("skipping peer \"{peer}\": {e}"),
        }
    }

    info!("ready; type /help for commands");
    tokio::select! {
        _ = cli::run(Arc::clone(&engine)) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted; shutting down");
        }
    }
    Ok(())
}
