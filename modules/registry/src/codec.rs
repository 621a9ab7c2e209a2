//! Canonical JSON encoding of registry records and selectors

use idledger_core::{
    DocType, IdLedgerError, IdLedgerResult, IdentityMappingRecord, OrgRecord, Selector,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A record type stored in the shared keyspace
pub trait Record: Serialize + DeserializeOwned {
    /// Discriminator written into every encoded record
    const DOC_TYPE: DocType;

    /// Primary key the record is stored under
    fn key(&self) -> &str;
}

impl Record for OrgRecord {
    const DOC_TYPE: DocType = DocType::Org;

    fn key(&self) -> &str {
        &self.item_num
    }
}

impl Record for IdentityMappingRecord {
    const DOC_TYPE: DocType = DocType::Identity;

    fn key(&self) -> &str {
        &self.identifier
    }
}

/// Encode a record as a JSON object, discriminator first
pub fn encode<R: Record>(record: &R) -> IdLedgerResult<Vec<u8>> {
    serde_json::to_vec(record).map_err(|e| IdLedgerError::Encoding(e.to_string()))
}

/// Decode a stored record, checking its discriminator
pub fn decode<R: Record>(bytes: &[u8]) -> IdLedgerResult<R> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| IdLedgerError::Decoding(e.to_string()))?;

    let doc_type = value.get(DocType::FIELD).and_then(|v| v.as_str());
    if doc_type != Some(R::DOC_TYPE.as_str()) {
        return Err(IdLedgerError::Decoding(format!(
            "expected docType {}, found {}",
            R::DOC_TYPE,
            doc_type.unwrap_or("none")
        )));
    }

    serde_json::from_value(value).map_err(|e| IdLedgerError::Decoding(e.to_string()))
}

/// Serialize a selector; values are escaped by the JSON serializer, never
/// spliced into a template
pub fn encode_selector(selector: &Selector) -> IdLedgerResult<String> {
    serde_json::to_string(selector).map_err(|e| IdLedgerError::Encoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_org_canonical() {
        let org = OrgRecord::new("0", "bupt", "bupt.fnl", "0", "1001");
        let bytes = encode(&org).unwrap();
        assert!(bytes.starts_with(br#"{"docType":"org","#));

        let decoded: OrgRecord = decode(&bytes).unwrap();
        assert_eq!(decoded, org);
    }

    #[test]
    fn test_decode_rejects_wrong_doc_type() {
        let bytes = encode(&IdentityMappingRecord::new("bupt/123", "ff00")).unwrap();
        let result = decode::<OrgRecord>(&bytes);
        assert!(matches!(result, Err(IdLedgerError::Decoding(_))));

        assert!(decode::<IdentityMappingRecord>(b"not json").is_err());
    }

    #[test]
    fn test_selector_escapes_quotes() {
        let selector = Selector::for_type(DocType::Identity)
            .with_field("identifier", r#"x","docType":"org"#);
        let encoded = encode_selector(&selector).unwrap();
        assert_eq!(
            encoded,
            r#"{"selector":{"docType":"identity","identifier":"x\",\"docType\":\"org"}}"#
        );

        // round-trips to exactly the two intended predicates
        let parsed: Selector = serde_json::from_str(&encoded).unwrap();
        assert_eq!(parsed, selector);
        assert_eq!(parsed.len(), 2);
    }
}
