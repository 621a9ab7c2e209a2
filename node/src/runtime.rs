//! Node runtime: state backend plus deployed contracts

use idledger_core::{
    Contract, IdLedgerError, IdLedgerResult, NodeConfig, Response, StateMutator, StateVersion,
    StorageBackend,
};
use idledger_registry::registry_contracts;
use idledger_state::{create_memory_store, create_persistent_store, MemoryStateStore, TxContext};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Node runtime managing state and contracts
pub struct NodeRuntime {
    config: NodeConfig,
    state: Arc<dyn StateMutator>,
    contracts: BTreeMap<String, Arc<dyn Contract>>,
    tx_counter: AtomicU64,
    // one committing invocation at a time
    commit_lock: Mutex<()>,
}

impl NodeRuntime {
    /// Create a runtime with the backend selected by `config.storage`
    pub fn new(config: NodeConfig) -> IdLedgerResult<Self> {
        let state: Arc<dyn StateMutator> = match config.storage.backend {
            StorageBackend::Memory if config.storage.rich_query => create_memory_store(),
            StorageBackend::Memory => Arc::new(MemoryStateStore::without_rich_query()),
            StorageBackend::Sled => {
                let path = config.state_path();
                std::fs::create_dir_all(&path)?;
                info!("Opening sled state at {}", path.display());
                create_persistent_store(&path, config.storage.rich_query)?
            }
        };
        Ok(Self::with_state(config, state))
    }

    /// Create a runtime over an existing backend
    pub fn with_state(config: NodeConfig, state: Arc<dyn StateMutator>) -> Self {
        let contracts = registry_contracts(&config.registry)
            .into_iter()
            .map(|c| (c.name().to_string(), c))
            .collect();

        Self {
            config,
            state,
            contracts,
            tx_counter: AtomicU64::new(0),
            commit_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn state_version(&self) -> StateVersion {
        self.state.version()
    }

    pub fn backend_name(&self) -> &str {
        self.state.backend_name()
    }

    pub fn contract_names(&self) -> Vec<String> {
        self.contracts.keys().cloned().collect()
    }

    pub fn has_contract(&self, name: &str) -> bool {
        self.contracts.contains_key(name)
    }

    /// Run every contract's `init` and commit whatever it writes
    pub fn instantiate(&self) -> IdLedgerResult<()> {
        for contract in self.contracts.values() {
            let _guard = self.commit_lock.lock();
            let mut ctx = TxContext::new(self.state.as_ref(), self.next_tx_id());
            let response = contract.init(&mut ctx);
            if !response.is_success() {
                return Err(IdLedgerError::Internal(format!(
                    "{} init failed: {}",
                    contract.name(),
                    response.message
                )));
            }
            self.commit(ctx)?;
            info!("Contract {} instantiated", contract.name());
        }
        Ok(())
    }

    /// Invoke a contract function and commit its writes on success
    pub fn invoke(&self, contract: &str, function: &str, args: &[String]) -> Response {
        self.execute(contract, function, args, true)
    }

    /// Evaluate a contract function without committing anything
    pub fn query(&self, contract: &str, function: &str, args: &[String]) -> Response {
        self.execute(contract, function, args, false)
    }

    fn execute(&self, contract: &str, function: &str, args: &[String], commit: bool) -> Response {
        let Some(target) = self.contracts.get(contract) else {
            return Response::error(IdLedgerError::ContractNotFound(contract.to_string()));
        };

        let _guard = commit.then(|| self.commit_lock.lock());
        let tx_id = self.next_tx_id();
        debug!(%tx_id, contract, function, "executing");

        let mut ctx = TxContext::new(self.state.as_ref(), tx_id);
        let response = target.invoke(&mut ctx, function, args);

        if commit && response.is_success() {
            if let Err(e) = self.commit(ctx) {
                error!(contract, function, "commit failed: {}", e);
                return Response::error(e);
            }
        }
        response
    }

    fn commit(&self, ctx: TxContext<'_, dyn StateMutator>) -> IdLedgerResult<()> {
        let tx_id = ctx.tx_id().to_string();
        let changes = ctx.into_changes();
        if changes.is_empty() {
            return Ok(());
        }
        let count = changes.len();
        let version = self.state.apply_batch(changes)?;
        debug!(%tx_id, writes = count, %version, "committed");
        Ok(())
    }

    fn next_tx_id(&self) -> String {
        format!("tx-{}", self.tx_counter.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idledger_core::StorageBackend;
    use tempfile::TempDir;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_invoke_commits_and_query_reads() {
        let runtime = NodeRuntime::new(NodeConfig::default()).unwrap();
        runtime.instantiate().unwrap();
        assert_eq!(runtime.contract_names(), vec!["authority", "hash"]);

        let response = runtime.invoke("hash", "invokeMappingDataHash", &args(&["user-42", "ab12ef"]));
        assert!(response.is_success());
        assert_eq!(runtime.state_version().0, 1);

        let response = runtime.query("hash", "queryHashByIdentifier", &args(&["user-42"]));
        assert!(response.payload_str().contains(r#""mappingData_hash":"ab12ef""#));
    }

    #[test]
    fn test_query_path_never_commits() {
        let runtime = NodeRuntime::new(NodeConfig::default()).unwrap();
        let response = runtime.query("hash", "invokeMappingDataHash", &args(&["user-42", "ab12ef"]));
        assert!(response.is_success());
        assert_eq!(runtime.state_version().0, 0);

        let response = runtime.query("hash", "queryHashByIdentifier", &args(&["user-42"]));
        assert_eq!(response.payload_str(), "[]");
    }

    #[test]
    fn test_failed_invoke_leaves_state_untouched() {
        let runtime = NodeRuntime::new(NodeConfig::default()).unwrap();
        let response = runtime.invoke("authority", "initOrg", &args(&["1", "a"]));
        assert!(!response.is_success());
        assert_eq!(runtime.state_version().0, 0);
    }

    #[test]
    fn test_unknown_contract() {
        let runtime = NodeRuntime::new(NodeConfig::default()).unwrap();
        let response = runtime.invoke("marbles", "initMarble", &[]);
        assert_eq!(response.message, "Contract not found: marbles");
        assert!(!runtime.has_contract("marbles"));
    }

    #[test]
    fn test_sled_backend_persists() {
        let tmp = TempDir::new().unwrap();
        let mut config = NodeConfig::default();
        config.data_dir = tmp.path().to_path_buf();
        config.storage.backend = StorageBackend::Sled;

        {
            let runtime = NodeRuntime::new(config.clone()).unwrap();
            assert_eq!(runtime.backend_name(), "sled");
            let response = runtime.invoke(
                "authority",
                "initOrg",
                &args(&["1001", "Acme Corp", "ACM-", "pubkey123", "rootCA"]),
            );
            assert!(response.is_success());
        }

        let runtime = NodeRuntime::new(config).unwrap();
        let response = runtime.query("authority", "queryInfoByOrg", &args(&["Acme Corp"]));
        assert!(response.payload_str().starts_with(r#"[{"Key":"1001""#));
    }

    #[test]
    fn test_memory_backend_without_rich_query() {
        let mut config = NodeConfig::default();
        config.storage.rich_query = false;
        let runtime = NodeRuntime::new(config).unwrap();

        let response = runtime.query("authority", "queryInfoByOrg", &args(&["acme"]));
        assert!(!response.is_success());
        assert_eq!(
            response.message,
            "Query failed: Rich query is not supported by the memory state backend"
        );
    }
}
