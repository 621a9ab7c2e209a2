//! Core traits defining idledger interfaces
//!
//! State backends implement `StateProvider`/`StateMutator`; contracts see the
//! state only through `ChaincodeStub`, scoped to a single invocation.

use crate::types::*;
use std::fmt::Debug;

/// Result type for idledger operations
pub type IdLedgerResult<T> = Result<T, crate::error::IdLedgerError>;

/// Cursor over rich-query results
///
/// The host-side cursor must be released exactly once; `close` is idempotent
/// and implementations also release on drop.
pub trait StateQueryIterator: Iterator<Item = IdLedgerResult<KeyValue>> + Send {
    /// Release the backend cursor
    fn close(&mut self);
}

/// Read access to committed state
pub trait StateProvider: Send + Sync {
    /// Name of the backend, used in error messages
    fn backend_name(&self) -> &str;

    /// Get the current state version
    fn version(&self) -> StateVersion;

    /// Get a value by key
    fn get(&self, key: &str) -> IdLedgerResult<Option<Vec<u8>>>;

    /// Check if a key exists
    fn exists(&self, key: &str) -> IdLedgerResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Whether `execute_query` is available on this backend
    fn supports_rich_query(&self) -> bool;

    /// Execute a JSON selector query
    fn execute_query(&self, selector: &str) -> IdLedgerResult<Box<dyn StateQueryIterator>>;
}

/// Write access to state
pub trait StateMutator: StateProvider {
    /// Set a value
    fn set(&self, key: &str, value: &[u8]) -> IdLedgerResult<()>;

    /// Delete a key
    fn delete(&self, key: &str) -> IdLedgerResult<()>;

    /// Apply a batch of changes atomically
    fn apply_batch(&self, changes: Vec<StateChange>) -> IdLedgerResult<StateVersion>;
}

/// State change operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    Set { key: String, value: Vec<u8> },
    Delete { key: String },
}

/// State access handed to a contract for one invocation
pub trait ChaincodeStub {
    /// Read committed state
    fn get_state(&self, key: &str) -> IdLedgerResult<Option<Vec<u8>>>;

    /// Record a write in the invocation's write set
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> IdLedgerResult<()>;

    /// Run a rich query against committed state
    fn get_query_result(&self, selector: &str) -> IdLedgerResult<Box<dyn StateQueryIterator>>;
}

/// A contract deployed on the peer
pub trait Contract: Send + Sync + Debug {
    /// Contract name used for dispatch
    fn name(&self) -> &str;

    /// Called once when the contract is instantiated
    fn init(&self, stub: &mut dyn ChaincodeStub) -> Response;

    /// Entry point for invocations
    fn invoke(&self, stub: &mut dyn ChaincodeStub, function: &str, args: &[String]) -> Response;
}
