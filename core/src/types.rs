//! Core types for idledger
//!
//! Defines the records stored in the shared keyspace, the rich-query
//! selector, and the invocation response.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Discriminator separating record types inside the shared keyspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Org,
    Identity,
}

impl DocType {
    /// Field name the discriminator is stored under
    pub const FIELD: &'static str = "docType";

    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Org => "org",
            DocType::Identity => "identity",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Organization registration record, keyed by `item_num`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgRecord {
    #[serde(rename = "docType")]
    pub doc_type: DocType,
    pub item_num: String,
    pub org_name: String,
    pub identity_prefix: String,
    pub public_key: String,
    pub authority: String,
}

impl OrgRecord {
    pub const ITEM_NUM: &'static str = "item_num";
    pub const ORG_NAME: &'static str = "org_name";

    pub fn new(
        item_num: impl Into<String>,
        org_name: impl Into<String>,
        identity_prefix: impl Into<String>,
        public_key: impl Into<String>,
        authority: impl Into<String>,
    ) -> Self {
        Self {
            doc_type: DocType::Org,
            item_num: item_num.into(),
            org_name: org_name.into(),
            identity_prefix: identity_prefix.into(),
            public_key: public_key.into(),
            authority: authority.into(),
        }
    }
}

/// Identifier to mapping-data hash record, keyed by `identifier`
///
/// The hash is an opaque digest and is stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityMappingRecord {
    #[serde(rename = "docType")]
    pub doc_type: DocType,
    pub identifier: String,
    #[serde(rename = "mappingData_hash")]
    pub mapping_data_hash: String,
}

impl IdentityMappingRecord {
    pub const IDENTIFIER: &'static str = "identifier";
    pub const MAPPING_DATA_HASH: &'static str = "mappingData_hash";

    pub fn new(identifier: impl Into<String>, mapping_data_hash: impl Into<String>) -> Self {
        Self {
            doc_type: DocType::Identity,
            identifier: identifier.into(),
            mapping_data_hash: mapping_data_hash.into(),
        }
    }
}

/// Flat equality selector: `{"selector": {field: value, ...}}`
///
/// Every predicate is a string equality; the predicates form a conjunction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    pub selector: BTreeMap<String, String>,
}

impl Selector {
    /// Selector matching every record of one type
    pub fn for_type(doc_type: DocType) -> Self {
        let mut selector = BTreeMap::new();
        selector.insert(DocType::FIELD.to_string(), doc_type.as_str().to_string());
        Self { selector }
    }

    /// Add an equality predicate
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.selector.insert(field.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.selector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selector.is_empty()
    }
}

/// Monotonic commit counter of a state backend
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, Serialize, Deserialize)]
pub struct StateVersion(pub u64);

impl StateVersion {
    pub fn new(v: u64) -> Self {
        StateVersion(v)
    }

    pub fn next(&self) -> Self {
        StateVersion(self.0 + 1)
    }
}

impl fmt::Display for StateVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// One key/value pair returned by a rich query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Status codes carried by a contract response
pub const STATUS_OK: u16 = 200;
pub const STATUS_ERROR: u16 = 500;

/// Result of one contract invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub message: String,
    pub payload: Option<Vec<u8>>,
}

impl Response {
    pub fn success(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: STATUS_OK,
            message: String::new(),
            payload,
        }
    }

    pub fn error(message: impl ToString) -> Self {
        Self {
            status: STATUS_ERROR,
            message: message.to_string(),
            payload: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Payload as UTF-8 text, empty when absent
    pub fn payload_str(&self) -> String {
        self.payload
            .as_deref()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .unwrap_or_default()
    }
}

impl<E: fmt::Display> From<Result<Option<Vec<u8>>, E>> for Response {
    fn from(result: Result<Option<Vec<u8>>, E>) -> Self {
        match result {
            Ok(payload) => Response::success(payload),
            Err(e) => Response::error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_org_record_field_order() {
        let org = OrgRecord::new("1001", "acme corp", "ACM-", "pubkey123", "rootCA");
        let json = serde_json::to_string(&org).unwrap();
        assert_eq!(
            json,
            r#"{"docType":"org","item_num":"1001","org_name":"acme corp","identity_prefix":"ACM-","public_key":"pubkey123","authority":"rootCA"}"#
        );
    }

    #[test]
    fn test_identity_record_field_names() {
        let record = IdentityMappingRecord::new("user-42", "ab12ef");
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"docType":"identity","identifier":"user-42","mappingData_hash":"ab12ef"}"#
        );
    }

    #[test]
    fn test_selector_shape() {
        let selector = Selector::for_type(DocType::Org).with_field("org_name", "acme");
        let json = serde_json::to_string(&selector).unwrap();
        assert_eq!(json, r#"{"selector":{"docType":"org","org_name":"acme"}}"#);
    }

    #[test]
    fn test_response_from_result() {
        let ok: Result<Option<Vec<u8>>, String> = Ok(Some(b"[]".to_vec()));
        let response = Response::from(ok);
        assert!(response.is_success());
        assert_eq!(response.payload_str(), "[]");

        let err: Result<Option<Vec<u8>>, String> = Err("boom".to_string());
        let response = Response::from(err);
        assert_eq!(response.status, STATUS_ERROR);
        assert_eq!(response.message, "boom");
    }
}
