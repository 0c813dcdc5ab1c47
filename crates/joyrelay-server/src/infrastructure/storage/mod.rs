//! TOML-based settings for the server binary.
//!
//! Every field has a default so the server runs without a settings file;
//! `#[serde(default = "...")]` fills in anything a partial file omits.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for settings file operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error reading settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSettings {
    #[serde(default)]
    pub network: NetworkSettings,
    #[serde(default)]
    pub keepalive: KeepaliveSettings,
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkSettings {
    /// TCP port the relay listens on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// IP address to bind.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Connection slots; further clients are refused at accept time.
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
}

/// TCP keepalive probing, so dead clients release their slot and device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeepaliveSettings {
    #[serde(default = "default_keepalive_idle")]
    pub idle_secs: u32,
    #[serde(default = "default_keepalive_interval")]
    pub interval_secs: u32,
    #[serde(default = "default_keepalive_probes")]
    pub probes: u32,
}

fn default_port() -> u16 {
    4444
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_max_clients() -> usize {
    10
}
fn default_keepalive_idle() -> u32 {
    10
}
fn default_keepalive_interval() -> u32 {
    5
}
fn default_keepalive_probes() -> u32 {
    5
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            network: NetworkSettings::default(),
            keepalive: KeepaliveSettings::default(),
        }
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            max_clients: default_max_clients(),
        }
    }
}

impl Default for KeepaliveSettings {
    fn default() -> Self {
        Self {
            idle_secs: default_keepalive_idle(),
            interval_secs: default_keepalive_interval(),
            probes: default_keepalive_probes(),
        }
    }
}

impl ServerSettings {
    /// Loads settings from `path`, or defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Io`] for file-system errors other than
    /// "not found", and [`SettingsError::Parse`] for malformed TOML.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(SettingsError::Io {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
