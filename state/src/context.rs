//! Per-invocation transaction context
//!
//! Contracts read committed state and buffer their writes here. The host
//! commits the write set only when the invocation succeeds.

use idledger_core::{
    ChaincodeStub, IdLedgerResult, StateChange, StateProvider, StateQueryIterator,
};
use std::collections::BTreeMap;
use tracing::trace;

/// Transaction context over a committed state backend
pub struct TxContext<'a, S: StateProvider + ?Sized> {
    state: &'a S,
    tx_id: String,
    writes: BTreeMap<String, Vec<u8>>,
}

impl<'a, S: StateProvider + ?Sized> TxContext<'a, S> {
    pub fn new(state: &'a S, tx_id: impl Into<String>) -> Self {
        Self {
            state,
            tx_id: tx_id.into(),
            writes: BTreeMap::new(),
        }
    }

    pub fn tx_id(&self) -> &str {
        &self.tx_id
    }

    /// Number of keys written so far
    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    /// Value written to `key` in this transaction, if any
    pub fn pending(&self, key: &str) -> Option<&[u8]> {
        self.writes.get(key).map(Vec::as_slice)
    }

    /// Consume the context, yielding the write set in key order
    pub fn into_changes(self) -> Vec<StateChange> {
        self.writes
            .into_iter()
            .map(|(key, value)| StateChange::Set { key, value })
            .collect()
    }
}

impl<S: StateProvider + ?Sized> ChaincodeStub for TxContext<'_, S> {
    fn get_state(&self, key: &str) -> IdLedgerResult<Option<Vec<u8>>> {
        self.state.get(key)
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> IdLedgerResult<()> {
        trace!(tx_id = %self.tx_id, key, "buffering write");
        self.writes.insert(key.to_string(), value);
        Ok(())
    }

    fn get_query_result(&self, selector: &str) -> IdLedgerResult<Box<dyn StateQueryIterator>> {
        self.state.execute_query(selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStateStore;
    use idledger_core::StateMutator;

    #[test]
    fn test_writes_are_buffered() {
        let store = MemoryStateStore::new();
        let mut ctx = TxContext::new(&store, "tx-1");

        ctx.put_state("k1", b"v1".to_vec()).unwrap();
        assert_eq!(ctx.pending("k1"), Some(&b"v1"[..]));
        // committed state is untouched until the host applies the write set
        assert_eq!(ctx.get_state("k1").unwrap(), None);
        assert_eq!(store.get("k1").unwrap(), None);
    }

    #[test]
    fn test_last_put_wins_within_transaction() {
        let store = MemoryStateStore::new();
        let mut ctx = TxContext::new(&store, "tx-2");

        ctx.put_state("k", b"first".to_vec()).unwrap();
        ctx.put_state("k", b"second".to_vec()).unwrap();
        assert_eq!(ctx.write_count(), 1);

        let changes = ctx.into_changes();
        store.apply_batch(changes).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"second".to_vec()));
    }

    #[test]
    fn test_query_reads_committed_state() {
        let store = MemoryStateStore::new();
        store.set("a", br#"{"docType":"org"}"#).unwrap();

        let mut ctx = TxContext::new(&store, "tx-3");
        ctx.put_state("b", br#"{"docType":"org"}"#.to_vec()).unwrap();

        let keys: Vec<String> = ctx
            .get_query_result(r#"{"selector":{"docType":"org"}}"#)
            .unwrap()
            .map(|r| r.unwrap().key)
            .collect();
        assert_eq!(keys, vec!["a".to_string()]);
    }
}
