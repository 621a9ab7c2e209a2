//! Persistent state store using sled database

use parking_lot::RwLock;
use idledger_core::{
    IdLedgerError, IdLedgerResult, KeyValue, StateChange, StateMutator, StateProvider,
    StateQueryIterator, StateVersion,
};
use sled::{Db, Tree};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::store::{select_entries, CursorTracker, QueryCursor, SelectorMatcher};

const STATE_TREE: &str = "state";
const META_TREE: &str = "meta";
const VERSION_KEY: &[u8] = b"version";

fn store_err(e: sled::Error) -> IdLedgerError {
    IdLedgerError::Store(e.to_string())
}

/// Persistent state store backed by sled database
pub struct PersistentStateStore {
    db: Db,
    state: Tree,
    meta: Tree,
    version: RwLock<StateVersion>,
    rich_query: bool,
    cursors: CursorTracker,
}

impl PersistentStateStore {
    pub fn open<P: AsRef<Path>>(path: P) -> IdLedgerResult<Self> {
        Self::open_with(path, true)
    }

    pub fn open_with<P: AsRef<Path>>(path: P, rich_query: bool) -> IdLedgerResult<Self> {
        let db = sled::open(path).map_err(store_err)?;
        let state = db.open_tree(STATE_TREE).map_err(store_err)?;
        let meta = db.open_tree(META_TREE).map_err(store_err)?;

        // Load version from disk or start at 0
        let version = match meta.get(VERSION_KEY).map_err(store_err)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_ref().try_into().map_err(|_| {
                    IdLedgerError::Store("corrupt version entry".to_string())
                })?;
                StateVersion::new(u64::from_le_bytes(raw))
            }
            None => StateVersion::new(0),
        };
        debug!("Opened sled state store at {}", version);

        Ok(Self {
            db,
            state,
            meta,
            version: RwLock::new(version),
            rich_query,
            cursors: CursorTracker::new(),
        })
    }

    /// Cursors handed out by `execute_query` and not yet released
    pub fn open_cursors(&self) -> usize {
        self.cursors.open_cursors()
    }

    fn entries(&self) -> impl Iterator<Item = IdLedgerResult<KeyValue>> + '_ {
        self.state.iter().map(|result| {
            let (key, value) = result.map_err(store_err)?;
            let key = String::from_utf8(key.to_vec())
                .map_err(|e| IdLedgerError::Store(format!("non UTF-8 key: {}", e)))?;
            Ok(KeyValue::new(key, value.to_vec()))
        })
    }
}

impl StateProvider for PersistentStateStore {
    fn backend_name(&self) -> &str {
        "sled"
    }

    fn version(&self) -> StateVersion {
        *self.version.read()
    }

    fn get(&self, key: &str) -> IdLedgerResult<Option<Vec<u8>>> {
        self.state
            .get(key.as_bytes())
            .map(|opt| opt.map(|v| v.to_vec()))
            .map_err(store_err)
    }

    fn exists(&self, key: &str) -> IdLedgerResult<bool> {
        self.state.contains_key(key.as_bytes()).map_err(store_err)
    }

    fn supports_rich_query(&self) -> bool {
        self.rich_query
    }

    fn execute_query(&self, selector: &str) -> IdLedgerResult<Box<dyn StateQueryIterator>> {
        if !self.rich_query {
            return Err(IdLedgerError::RichQueryUnsupported(self.backend_name().to_string()));
        }
        let matcher = SelectorMatcher::parse(selector)?;
        let results = select_entries(self.entries(), &matcher);
        Ok(Box::new(QueryCursor::new(results, &self.cursors)))
    }
}

impl StateMutator for PersistentStateStore {
    fn set(&self, key: &str, value: &[u8]) -> IdLedgerResult<()> {
        self.state.insert(key.as_bytes(), value).map_err(store_err)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> IdLedgerResult<()> {
        self.state.remove(key.as_bytes()).map_err(store_err)?;
        Ok(())
    }

    fn apply_batch(&self, changes: Vec<StateChange>) -> IdLedgerResult<StateVersion> {
        let mut version = self.version.write();
        let new_version = version.next();

        // Create a batch for atomic writes
        let mut batch = sled::Batch::default();
        for change in changes {
            match change {
                StateChange::Set { key, value } => batch.insert(key.as_bytes(), value),
                StateChange::Delete { key } => batch.remove(key.as_bytes()),
            }
        }

        self.state.apply_batch(batch).map_err(store_err)?;
        self.meta
            .insert(VERSION_KEY, new_version.0.to_le_bytes().to_vec())
            .map_err(store_err)?;
        self.db.flush().map_err(store_err)?;

        *version = new_version;
        Ok(new_version)
    }
}

/// Thread-safe persistent store wrapper
pub type SharedPersistentStateStore = Arc<PersistentStateStore>;

/// Create a shared persistent state store
pub fn create_persistent_store<P: AsRef<Path>>(
    path: P,
    rich_query: bool,
) -> IdLedgerResult<SharedPersistentStateStore> {
    Ok(Arc::new(PersistentStateStore::open_with(path, rich_query)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_persistent_store_basic() {
        let tmp = TempDir::new().unwrap();
        let store = PersistentStateStore::open(tmp.path()).unwrap();

        store.set("key1", b"value1").unwrap();
        let value = store.get("key1").unwrap();
        assert_eq!(value, Some(b"value1".to_vec()));

        store.delete("key1").unwrap();
        let value = store.get("key1").unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_persistent_store_reopen() {
        let tmp = TempDir::new().unwrap();

        // Write data
        {
            let store = PersistentStateStore::open(tmp.path()).unwrap();
            store.set("key1", b"value1").unwrap();
            let changes = vec![StateChange::Set {
                key: "k2".to_string(),
                value: b"v2".to_vec(),
            }];
            store.apply_batch(changes).unwrap();
        }

        // Reopen and verify
        {
            let store = PersistentStateStore::open(tmp.path()).unwrap();
            assert_eq!(store.get("key1").unwrap(), Some(b"value1".to_vec()));
            assert_eq!(store.get("k2").unwrap(), Some(b"v2".to_vec()));
            assert_eq!(store.version().0, 1);
        }
    }

    #[test]
    fn test_persistent_rich_query() {
        let tmp = TempDir::new().unwrap();
        let store = PersistentStateStore::open(tmp.path()).unwrap();
        store
            .set("user-1", br#"{"docType":"identity","identifier":"user-1"}"#)
            .unwrap();
        store
            .set("user-2", br#"{"docType":"identity","identifier":"user-2"}"#)
            .unwrap();

        let results: Vec<KeyValue> = store
            .execute_query(r#"{"selector":{"docType":"identity","identifier":"user-2"}}"#)
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, "user-2");
        assert_eq!(store.open_cursors(), 0);
    }

    #[test]
    fn test_persistent_without_rich_query() {
        let tmp = TempDir::new().unwrap();
        let store = PersistentStateStore::open_with(tmp.path(), false).unwrap();
        let result = store.execute_query(r#"{"selector":{}}"#);
        assert!(matches!(result, Err(IdLedgerError::RichQueryUnsupported(_))));
    }
}
