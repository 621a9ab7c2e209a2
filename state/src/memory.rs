//! In-memory state store for testing and light nodes

use dashmap::DashMap;
use parking_lot::RwLock;
use idledger_core::{
    IdLedgerError, IdLedgerResult, KeyValue, StateChange, StateMutator, StateProvider,
    StateQueryIterator, StateVersion,
};
use std::sync::Arc;

use crate::store::{select_entries, CursorTracker, QueryCursor, SelectorMatcher};

/// In-memory state store
pub struct MemoryStateStore {
    data: DashMap<String, Vec<u8>>,
    version: RwLock<StateVersion>,
    rich_query: bool,
    cursors: CursorTracker,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            version: RwLock::new(StateVersion::new(0)),
            rich_query: true,
            cursors: CursorTracker::new(),
        }
    }

    /// Key-value only backend: selector queries are rejected
    pub fn without_rich_query() -> Self {
        Self {
            rich_query: false,
            ..Self::new()
        }
    }

    pub fn with_data(data: Vec<(String, Vec<u8>)>) -> Self {
        let store = Self::new();
        for (key, value) in data {
            store.data.insert(key, value);
        }
        store
    }

    /// Cursors handed out by `execute_query` and not yet released
    pub fn open_cursors(&self) -> usize {
        self.cursors.open_cursors()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateProvider for MemoryStateStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> StateVersion {
        *self.version.read()
    }

    fn get(&self, key: &str) -> IdLedgerResult<Option<Vec<u8>>> {
        Ok(self.data.get(key).map(|v| v.value().clone()))
    }

    fn exists(&self, key: &str) -> IdLedgerResult<bool> {
        Ok(self.data.contains_key(key))
    }

    fn supports_rich_query(&self) -> bool {
        self.rich_query
    }

    fn execute_query(&self, selector: &str) -> IdLedgerResult<Box<dyn StateQueryIterator>> {
        if !self.rich_query {
            return Err(IdLedgerError::RichQueryUnsupported(self.backend_name().to_string()));
        }
        let matcher = SelectorMatcher::parse(selector)?;

        let entries = self
            .data
            .iter()
            .map(|entry| Ok(KeyValue::new(entry.key().clone(), entry.value().clone())));
        let results = select_entries(entries, &matcher);

        Ok(Box::new(QueryCursor::new(results, &self.cursors)))
    }
}

impl StateMutator for MemoryStateStore {
    fn set(&self, key: &str, value: &[u8]) -> IdLedgerResult<()> {
        self.data.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> IdLedgerResult<()> {
        self.data.remove(key);
        Ok(())
    }

    fn apply_batch(&self, changes: Vec<StateChange>) -> IdLedgerResult<StateVersion> {
        let mut version = self.version.write();

        for change in changes {
            match change {
                StateChange::Set { key, value } => {
                    self.data.insert(key, value);
                }
                StateChange::Delete { key } => {
                    self.data.remove(&key);
                }
            }
        }

        *version = version.next();
        Ok(*version)
    }
}

/// Thread-safe memory store wrapper
pub type SharedMemoryStateStore = Arc<MemoryStateStore>;

/// Create a shared memory state store
pub fn create_memory_store() -> SharedMemoryStateStore {
    Arc::new(MemoryStateStore::new())
}
