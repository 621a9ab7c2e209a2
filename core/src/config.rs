//! Configuration types for idledger

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::IdLedgerError;
use crate::traits::IdLedgerResult;

/// Main node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Node name for logging
    pub name: String,

    /// Data directory
    pub data_dir: PathBuf,

    /// State backend configuration
    pub storage: StorageConfig,

    /// Registry contract configuration
    pub registry: RegistryConfig,

    /// API configuration
    pub api: ApiConfig,

    /// Logging level
    pub log_level: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "idledger-node".to_string(),
            data_dir: PathBuf::from("./data"),
            storage: StorageConfig::default(),
            registry: RegistryConfig::default(),
            api: ApiConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl NodeConfig {
    pub fn from_json(json: &str) -> IdLedgerResult<Self> {
        let config: NodeConfig = serde_json::from_str(json)
            .map_err(|e| IdLedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> IdLedgerResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| IdLedgerError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> IdLedgerResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| IdLedgerError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> IdLedgerResult<()> {
        if self.name.is_empty() {
            return Err(IdLedgerError::Config("node name must not be empty".into()));
        }
        if self.api.enabled && self.api.listen_addr.is_empty() {
            return Err(IdLedgerError::Config("api.listen_addr must be set".into()));
        }
        Ok(())
    }

    /// Directory the sled backend opens, relative paths resolved under `data_dir`
    pub fn state_path(&self) -> PathBuf {
        if self.storage.path.is_absolute() {
            self.storage.path.clone()
        } else {
            self.data_dir.join(&self.storage.path)
        }
    }
}

/// State backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sled,
}

impl std::str::FromStr for StorageBackend {
    type Err = IdLedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "sled" => Ok(StorageBackend::Sled),
            other => Err(IdLedgerError::Config(format!("unknown storage backend: {}", other))),
        }
    }
}

/// State backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Database path for the sled backend
    pub path: PathBuf,

    /// Enable JSON selector queries
    pub rich_query: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: PathBuf::from("state"),
            rich_query: true,
        }
    }
}

/// Registry contract configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Reject writes to a primary key that already holds a record.
    /// Off by default: writes overwrite (last writer wins).
    pub enforce_uniqueness: bool,
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Enable HTTP API
    pub enabled: bool,

    /// API listen address
    pub listen_addr: String,

    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: "127.0.0.1:8080".to_string(),
            enable_cors: true,
        }
    }
}
