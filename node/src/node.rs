//! Full node implementation

use crate::api::start_api_server;
use crate::runtime::NodeRuntime;
use idledger_core::{IdLedgerResult, NodeConfig, StorageBackend};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

/// Peer node hosting the registry contracts
pub struct IdLedgerNode {
    runtime: Arc<NodeRuntime>,
}

impl IdLedgerNode {
    /// Create a new node
    pub fn new(config: NodeConfig) -> IdLedgerResult<Self> {
        let runtime = Arc::new(NodeRuntime::new(config)?);
        Ok(Self { runtime })
    }

    /// Start the node
    pub async fn start(&self) -> anyhow::Result<()> {
        info!("Starting idledger node {}...", self.runtime.config().name);

        self.runtime.instantiate()?;

        let api_handle = if self.runtime.config().api.enabled {
            let api_runtime = self.runtime.clone();
            let api_addr = self.runtime.config().api.listen_addr.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = start_api_server(api_runtime, &api_addr).await {
                    error!("API server error: {}", e);
                }
            }))
        } else {
            None
        };

        info!("Node started successfully");
        info!("State backend: {}", self.runtime.backend_name());
        info!("Contracts: {}", self.runtime.contract_names().join(", "));

        // Wait for shutdown signal
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received, stopping node...");
            }
            Err(e) => {
                error!("Error waiting for shutdown signal: {}", e);
            }
        }

        if let Some(handle) = api_handle {
            handle.abort();
        }

        info!("Node stopped");

        Ok(())
    }

    /// Get runtime reference
    pub fn runtime(&self) -> &Arc<NodeRuntime> {
        &self.runtime
    }
}

/// Node builder for easier configuration
pub struct NodeBuilder {
    config: NodeConfig,
}

impl NodeBuilder {
    pub fn new() -> Self {
        Self {
            config: NodeConfig::default(),
        }
    }

    pub fn config(mut self, config: NodeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn api_addr(mut self, addr: &str) -> Self {
        self.config.api.listen_addr = addr.to_string();
        self
    }

    pub fn data_dir(mut self, dir: PathBuf) -> Self {
        self.config.data_dir = dir;
        self
    }

    pub fn backend(mut self, backend: StorageBackend) -> Self {
        self.config.storage.backend = backend;
        self
    }

    pub fn enforce_uniqueness(mut self) -> Self {
        self.config.registry.enforce_uniqueness = true;
        self
    }

    pub fn build(self) -> IdLedgerResult<IdLedgerNode> {
        self.config.validate()?;
        IdLedgerNode::new(self.config)
    }
}

impl Default for NodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_applies_overrides() {
        let node = NodeBuilder::new()
            .api_addr("127.0.0.1:9090")
            .enforce_uniqueness()
            .build()
            .unwrap();
        let config = node.runtime().config();
        assert_eq!(config.api.listen_addr, "127.0.0.1:9090");
        assert!(config.registry.enforce_uniqueness);

        let args: Vec<String> = ["1", "a", "p", "k", "x"].iter().map(|v| v.to_string()).collect();
        assert!(node.runtime().invoke("authority", "initOrg", &args).is_success());
        let second = node.runtime().invoke("authority", "initOrg", &args);
        assert_eq!(second.message, "Record already exists: 1");
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let mut config = NodeConfig::default();
        config.name.clear();
        assert!(NodeBuilder::new().config(config).build().is_err());
    }
}
