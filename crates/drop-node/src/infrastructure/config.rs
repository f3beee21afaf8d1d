//! TOML-based configuration for the node binary.
//!
//! Reads and writes [`NodeConfig`] at the platform config path:
//! - Windows:  `%APPDATA%\dropwire\config.toml`
//! - Unix:     `$XDG_CONFIG_HOME/dropwire/config.toml` (or
//!   `~/.config/dropwire/config.toml`)
//!
//! Every field carries a serde default so the node works on first run,
//! before any file exists, and keeps working when an older file is missing
//! newer fields.
//!
//! ```toml
//! [engine]
//! alias = "workbench"
//! max_payload_bytes = 4096
//!
//! [network]
//! listen_port = 42800
//! peers = ["192.168.1.20:42800"]
//! ```

use std::path::{Path, PathBuf};

use drop_core::EngineConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default TCP port the node listens on for peer connections.
pub const DEFAULT_LISTEN_PORT: u16 = 42800;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Top-level node configuration stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Values consumed by the session engine.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Transport settings.
    #[serde(default)]
    pub network: NetworkConfig,
}

/// Listener and dial settings for the TCP transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// TCP port to accept peer connections on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    /// Peer addresses (`host:port`) to dial at startup.
    #[serde(default)]
    pub peers: Vec<String>,
}

fn default_listen_port() -> u16 {
    DEFAULT_LISTEN_PORT
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_LISTEN_PORT,
            peers: Vec::new(),
        }
    }
}

/// Returns the platform-appropriate path of the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when neither the platform
/// config variable nor `HOME` is set.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let base = if cfg!(windows) {
        std::env::var_os("APPDATA").map(PathBuf::from)
    } else {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
    };
    let base = base.ok_or(ConfigError::NoPlatformConfigDir)?;
    Ok(base.join("dropwire").join("config.toml"))
}

/// Loads the config from `path`, falling back to defaults when the file
/// does not exist yet.
///
/// # Errors
///
/// Returns [`ConfigError`] on I/O failure (other than absence) or
/// malformed TOML.
pub fn load(path: &Path) -> Result<NodeConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(toml::from_str(&text)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(NodeConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes the config to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError`] on serialization or I/O failure.
pub fn save(config: &NodeConfig, path: &Path) -> Result<(), ConfigError> {
    let text = toml::to_string_pretty(config)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, text).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
