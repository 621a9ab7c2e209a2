//! Rich-query support shared by the state backends

use idledger_core::{IdLedgerError, IdLedgerResult, KeyValue, StateQueryIterator};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Parsed flat-equality selector
#[derive(Debug, Clone)]
pub struct SelectorMatcher {
    predicates: Vec<(String, Value)>,
}

impl SelectorMatcher {
    /// Parse a `{"selector": {...}}` document
    pub fn parse(selector: &str) -> IdLedgerResult<Self> {
        let doc: Value = serde_json::from_str(selector)
            .map_err(|e| IdLedgerError::MalformedSelector(e.to_string()))?;

        let fields = doc
            .get("selector")
            .and_then(Value::as_object)
            .ok_or_else(|| IdLedgerError::MalformedSelector("missing selector object".into()))?;

        let mut predicates = Vec::with_capacity(fields.len());
        for (field, value) in fields {
            match value {
                Value::Object(_) | Value::Array(_) => {
                    return Err(IdLedgerError::MalformedSelector(format!(
                        "unsupported predicate on field {}",
                        field
                    )));
                }
                scalar => predicates.push((field.clone(), scalar.clone())),
            }
        }

        Ok(Self { predicates })
    }

    /// True when `value` is a JSON object satisfying every predicate.
    /// Values that are not JSON objects never match.
    pub fn matches(&self, value: &[u8]) -> bool {
        let doc = match serde_json::from_slice::<Value>(value) {
            Ok(Value::Object(doc)) => doc,
            _ => return false,
        };
        self.predicates
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected))
    }

    pub fn predicate_count(&self) -> usize {
        self.predicates.len()
    }
}

/// Count of cursors a backend has handed out and not yet released
#[derive(Debug, Clone, Default)]
pub struct CursorTracker {
    open: Arc<AtomicUsize>,
}

impl CursorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_cursors(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    fn acquire(&self) -> Arc<AtomicUsize> {
        self.open.fetch_add(1, Ordering::SeqCst);
        self.open.clone()
    }
}

/// Materialized query cursor
///
/// Holds the results of one query execution. Releases its slot in the
/// backend's `CursorTracker` on `close` or on drop, whichever comes first.
pub struct QueryCursor {
    items: std::vec::IntoIter<IdLedgerResult<KeyValue>>,
    open: Arc<AtomicUsize>,
    closed: bool,
}

impl QueryCursor {
    pub fn new(items: Vec<IdLedgerResult<KeyValue>>, tracker: &CursorTracker) -> Self {
        Self {
            items: items.into_iter(),
            open: tracker.acquire(),
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Iterator for QueryCursor {
    type Item = IdLedgerResult<KeyValue>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        self.items.next()
    }
}

impl StateQueryIterator for QueryCursor {
    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for QueryCursor {
    fn drop(&mut self) {
        self.close();
    }
}

/// Filter `entries` through `selector`, ordering results by key
pub fn select_entries<I>(entries: I, selector: &SelectorMatcher) -> Vec<IdLedgerResult<KeyValue>>
where
    I: IntoIterator<Item = IdLedgerResult<KeyValue>>,
{
    let mut results: Vec<IdLedgerResult<KeyValue>> = entries
        .into_iter()
        .filter(|entry| match entry {
            Ok(kv) => selector.matches(&kv.value),
            Err(_) => true,
        })
        .collect();

    // errors sort after every key so the readable prefix is still delivered
    results.sort_by(|a, b| match (a, b) {
        (Ok(a), Ok(b)) => a.key.cmp(&b.key),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => std::cmp::Ordering::Equal,
    });
    results
}
