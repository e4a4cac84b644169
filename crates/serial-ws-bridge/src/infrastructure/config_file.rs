//! TOML configuration file.
//!
//! The file is optional and every field in it is optional.  Anything left out
//! falls back to the CLI / environment value, and then to the built-in
//! default (see `main.rs` for the merge).
//!
//! ```toml
//! log_level = "debug"
//!
//! [serial]
//! device = "/dev/ttyACM0"
//! baud_rate = 115200
//! read_timeout_ms = 1000
//!
//! [websocket]
//! bind_address = "127.0.0.1"
//! port = 8765
//!
//! [relay]
//! recv_wait_ms = 100
//! idle_pacing_ms = 10
//! ```
//!
//! Unknown keys are rejected so that a typo (`baudrate = ...`) is reported
//! instead of silently ignored.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level config file schema.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// `tracing` filter used when `RUST_LOG` is not set, e.g. `"info"`.
    pub log_level: Option<String>,
    #[serde(default)]
    pub serial: SerialSection,
    #[serde(default)]
    pub websocket: WebsocketSection,
    #[serde(default)]
    pub relay: RelaySection,
}

/// `[serial]` table.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SerialSection {
    pub device: Option<String>,
    pub baud_rate: Option<u32>,
    pub read_timeout_ms: Option<u64>,
}

/// `[websocket]` table.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WebsocketSection {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
}

/// `[relay]` table.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RelaySection {
    pub recv_wait_ms: Option<u64>,
    pub idle_pacing_ms: Option<u64>,
}

/// Parses config TOML from a string.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the TOML is malformed or contains
/// unknown keys.
pub fn parse_config(content: &str) -> Result<FileConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Loads the config file at `path`.
///
/// Unlike a settings file in a per-user directory, this path was given
/// explicitly, so a missing file is an error rather than "use defaults".
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Parse`] if the TOML is invalid.
pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
