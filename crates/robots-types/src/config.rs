//! Fleet configuration types.
//!
//! `FleetConfig` represents `fleet-config.toml`, which carries transport
//! credentials, rsync options and the storage backend choice. Keys are
//! kebab-case (`ssh-user`, `rsync-options`, ...).

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the fleet tool. All fields have defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FleetConfig {
    /// Remote user for ssh sessions and rsync transfers.
    #[serde(default)]
    pub ssh_user: Option<String>,

    /// Private key passed to ssh as `IdentityFile`.
    #[serde(default)]
    pub ssh_key_path: Option<PathBuf>,

    /// Options passed to rsync before the source and destination.
    #[serde(default = "default_rsync_options")]
    pub rsync_options: Vec<String>,

    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_rsync_options() -> Vec<String> {
    vec!["-avz".to_string()]
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            ssh_user: None,
            ssh_key_path: None,
            rsync_options: default_rsync_options(),
            storage: StorageConfig::default(),
        }
    }
}

/// Where the fleet is persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

/// Available fleet repositories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One pretty-printed JSON document keyed by robot name.
    #[default]
    Json,
    /// SQLite database with a child table for aspects.
    Sqlite,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Json => write!(f, "json"),
            StorageBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(StorageBackend::Json),
            "sqlite" => Ok(StorageBackend::Sqlite),
            other => Err(format!("invalid storage backend: '{other}'")),
        }
    }
}
