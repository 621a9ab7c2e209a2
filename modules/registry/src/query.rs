//! Query Service - field-equality lookups over the rich-query interface
//!
//! Response payloads are JSON arrays of `{"Key": <key>, "Record": <record>}`.
//! Record bodies are copied into the payload as stored, without a decode and
//! re-encode pass. Every value reachable by these selectors must therefore be
//! a well-formed JSON object; a malformed stored value yields a malformed
//! payload.

use idledger_core::{
    ChaincodeStub, DocType, IdLedgerError, IdLedgerResult, IdentityMappingRecord, KeyValue,
    OrgRecord, Selector, StateQueryIterator,
};
use tracing::debug;

use crate::codec;

/// How a lookup value is normalised, identically on write and on lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    Lowercase,
    Verbatim,
}

impl Normalization {
    pub fn apply(&self, value: &str) -> String {
        match self {
            Normalization::Lowercase => value.chars().flat_map(char::to_lowercase).collect(),
            Normalization::Verbatim => value.to_string(),
        }
    }
}

/// A record field that can be looked up by equality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupField {
    pub doc_type: DocType,
    pub field: &'static str,
    pub normalization: Normalization,
}

impl LookupField {
    pub fn normalize(&self, value: &str) -> String {
        self.normalization.apply(value)
    }

    /// Equality selector for `value` after normalisation
    pub fn selector(&self, value: &str) -> Selector {
        Selector::for_type(self.doc_type).with_field(self.field, self.normalize(value))
    }
}

/// Organizations by name; names are stored lowercased
pub const ORG_BY_NAME: LookupField = LookupField {
    doc_type: DocType::Org,
    field: OrgRecord::ORG_NAME,
    normalization: Normalization::Lowercase,
};

/// Identity mappings by identifier; matched case-sensitively
pub const MAPPING_BY_IDENTIFIER: LookupField = LookupField {
    doc_type: DocType::Identity,
    field: IdentityMappingRecord::IDENTIFIER,
    normalization: Normalization::Verbatim,
};

/// Releases a query cursor on every exit path
struct CursorGuard {
    cursor: Box<dyn StateQueryIterator>,
}

impl CursorGuard {
    fn new(cursor: Box<dyn StateQueryIterator>) -> Self {
        Self { cursor }
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        self.cursor.close();
    }
}

/// Stateless lookup service
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryService;

impl QueryService {
    pub fn new() -> Self {
        QueryService
    }

    /// Look up records by the single predicate argument in `args`.
    ///
    /// Extra arguments are ignored; a missing one is an argument error.
    pub fn query_by_args(
        &self,
        stub: &dyn ChaincodeStub,
        lookup: &LookupField,
        args: &[String],
    ) -> IdLedgerResult<Vec<u8>> {
        let value = args
            .first()
            .ok_or(IdLedgerError::ArgumentCount { expected: 1 })?;
        self.query_by_field(stub, lookup, value)
    }

    /// Run an equality lookup and assemble the `{Key, Record}` array
    pub fn query_by_field(
        &self,
        stub: &dyn ChaincodeStub,
        lookup: &LookupField,
        value: &str,
    ) -> IdLedgerResult<Vec<u8>> {
        let selector = codec::encode_selector(&lookup.selector(value))?;
        debug!(%selector, "executing rich query");

        let payload = self
            .execute(stub, &selector)
            .map_err(IdLedgerError::into_query_error)?;
        debug!(size = payload.len(), "query result assembled");

        Ok(payload)
    }

    fn execute(&self, stub: &dyn ChaincodeStub, selector: &str) -> IdLedgerResult<Vec<u8>> {
        let mut guard = CursorGuard::new(stub.get_query_result(selector)?);
        build_response(&mut guard.cursor)
    }
}

/// Drain `results` into a JSON array of `{"Key", "Record"}` objects
pub fn build_response(
    results: &mut dyn Iterator<Item = IdLedgerResult<KeyValue>>,
) -> IdLedgerResult<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer.push(b'[');

    let mut first = true;
    for result in results {
        let kv = result?;
        if !first {
            buffer.push(b',');
        }
        first = false;

        buffer.extend_from_slice(b"{\"Key\":");
        serde_json::to_writer(&mut buffer, &kv.key)
            .map_err(|e| IdLedgerError::Encoding(e.to_string()))?;
        buffer.extend_from_slice(b",\"Record\":");
        buffer.extend_from_slice(&kv.value);
        buffer.push(b'}');
    }

    buffer.push(b']');
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use idledger_core::StateMutator;
    use idledger_state::{CursorTracker, MemoryStateStore, QueryCursor, TxContext};

    #[test]
    fn test_lookup_normalisation() {
        assert_eq!(ORG_BY_NAME.normalize("Acme Corp"), "acme corp");
        assert_eq!(MAPPING_BY_IDENTIFIER.normalize("USER-42"), "USER-42");

        let selector = ORG_BY_NAME.selector("BUPT");
        assert_eq!(selector.selector.get("org_name").map(String::as_str), Some("bupt"));
        assert_eq!(selector.selector.get("docType").map(String::as_str), Some("org"));
    }

    #[test]
    fn test_lowercase_maps_each_char_independently() {
        // no word-final sigma rule
        assert_eq!(ORG_BY_NAME.normalize("ΟΔΥΣΣΕΥΣ"), "οδυσσευσ");

        let store = MemoryStateStore::new();
        store
            .set(
                "7",
                r#"{"docType":"org","item_num":"7","org_name":"οδυσσευσ"}"#.as_bytes(),
            )
            .unwrap();
        let ctx = TxContext::new(&store, "tx");
        let payload = QueryService::new()
            .query_by_field(&ctx, &ORG_BY_NAME, "ΟΔΥΣΣΕΥΣ")
            .unwrap();
        assert!(String::from_utf8(payload).unwrap().starts_with(r#"[{"Key":"7""#));
    }

    #[test]
    fn test_build_response_embeds_raw_records() {
        let items: Vec<IdLedgerResult<KeyValue>> = vec![
            Ok(KeyValue::new("a", br#"{"x":1}"#.to_vec())),
            Ok(KeyValue::new("b\"c", br#"{"y":2}"#.to_vec())),
        ];
        let mut items = items.into_iter();
        let payload = build_response(&mut items).unwrap();
        assert_eq!(
            String::from_utf8(payload).unwrap(),
            r#"[{"Key":"a","Record":{"x":1}},{"Key":"b\"c","Record":{"y":2}}]"#
        );

        let mut empty = std::iter::empty::<IdLedgerResult<KeyValue>>();
        assert_eq!(build_response(&mut empty).unwrap(), b"[]".to_vec());
    }

    #[test]
    fn test_missing_predicate_argument() {
        let store = MemoryStateStore::new();
        let ctx = TxContext::new(&store, "tx");
        let err = QueryService::new()
            .query_by_args(&ctx, &ORG_BY_NAME, &[])
            .unwrap_err();
        assert!(err.is_argument_error());
        assert_eq!(err.to_string(), "Incorrect number of arguments. Expecting 1");
        assert_eq!(store.open_cursors(), 0);
    }

    #[test]
    fn test_unsupported_backend_surfaces_query_error() {
        let store = MemoryStateStore::without_rich_query();
        let ctx = TxContext::new(&store, "tx");
        let err = QueryService::new()
            .query_by_field(&ctx, &MAPPING_BY_IDENTIFIER, "user-42")
            .unwrap_err();
        assert!(matches!(err, IdLedgerError::Query(_)));
    }

    #[test]
    fn test_quote_in_value_cannot_widen_selector() {
        let store = MemoryStateStore::new();
        store
            .set("k", br#"{"docType":"org","org_name":"acme"}"#)
            .unwrap();
        let ctx = TxContext::new(&store, "tx");

        let payload = QueryService::new()
            .query_by_field(&ctx, &ORG_BY_NAME, r#"x","docType":"org"#)
            .unwrap();
        assert_eq!(payload, b"[]".to_vec());
    }

    /// Stub whose cursor fails part-way through
    struct FailingStub {
        tracker: CursorTracker,
    }

    impl ChaincodeStub for FailingStub {
        fn get_state(&self, _key: &str) -> IdLedgerResult<Option<Vec<u8>>> {
            Ok(None)
        }

        fn put_state(&mut self, _key: &str, _value: Vec<u8>) -> IdLedgerResult<()> {
            Ok(())
        }

        fn get_query_result(&self, _selector: &str) -> IdLedgerResult<Box<dyn StateQueryIterator>> {
            Ok(Box::new(QueryCursor::new(
                vec![
                    Ok(KeyValue::new("a", br#"{}"#.to_vec())),
                    Err(IdLedgerError::Store("cursor expired".into())),
                ],
                &self.tracker,
            )))
        }
    }

    #[test]
    fn test_cursor_released_when_iteration_fails() {
        let stub = FailingStub {
            tracker: CursorTracker::new(),
        };
        let err = QueryService::new()
            .query_by_field(&stub, &MAPPING_BY_IDENTIFIER, "a")
            .unwrap_err();
        assert_eq!(err.to_string(), "Query failed: Storage error: cursor expired");
        assert_eq!(stub.tracker.open_cursors(), 0);
    }
}
