//! Gateway configuration
//!
//! Loaded from an optional TOML file with CLI overrides applied by main.
//! The config is an explicit value threaded through startup; nothing here
//! is process-global.

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use store::SyncPolicy;

/// Runtime configuration for the gateway process
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Directory holding the durable store
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Symbol used when a placement omits one
    #[serde(default = "default_symbol")]
    pub default_symbol: String,
    /// Whether commits fsync before acknowledging
    #[serde(default)]
    pub wal_sync: WalSync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalSync {
    #[default]
    Always,
    Never,
}

impl From<WalSync> for SyncPolicy {
    fn from(value: WalSync) -> Self {
        match value {
            WalSync::Always => SyncPolicy::Always,
            WalSync::Never => SyncPolicy::Never,
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_symbol() -> String {
    "XYZ".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            data_dir: default_data_dir(),
            default_symbol: default_symbol(),
            wal_sync: WalSync::default(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a TOML file
    pub fn from_toml(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("parsing config file {}", path.display()))
    }
}
