//! CLI Commands

use idledger_core::IdentityMappingRecord;
use idledger_registry::{AuthorityContract, HashContract};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// API Client for interacting with an idledger node
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::builder().timeout(Duration::from_secs(30)).build()?,
        })
    }

    /// Get node status
    pub async fn status(&self) -> Result<NodeStatus, ApiError> {
        let url = format!("{}/status", self.base_url);
        let resp: ApiResponse<NodeStatus> = self.client.get(&url).send().await?.json().await?;
        resp.into_data()?.ok_or(ApiError::EmptyResponse)
    }

    /// Submit a transaction; the node commits its writes on success
    pub async fn invoke(&self, contract: &str, function: &str, args: Vec<String>) -> Result<Value, ApiError> {
        self.call("invoke", contract, function, args).await
    }

    /// Evaluate a function without committing
    pub async fn query(&self, contract: &str, function: &str, args: Vec<String>) -> Result<Value, ApiError> {
        self.call("query", contract, function, args).await
    }

    /// `authority.initOrg`
    pub async fn register_org(&self, org: OrgArgs) -> Result<(), ApiError> {
        self.invoke(AuthorityContract::NAME, AuthorityContract::INIT_ORG, org.into_args())
            .await?;
        Ok(())
    }

    /// `authority.queryInfoByOrg`
    pub async fn query_org(&self, org_name: &str) -> Result<Value, ApiError> {
        self.query(
            AuthorityContract::NAME,
            AuthorityContract::QUERY_INFO_BY_ORG,
            vec![org_name.to_string()],
        )
        .await
    }

    /// `hash.invokeMappingDataHash`
    pub async fn put_hash(&self, identifier: &str, hash: &str) -> Result<(), ApiError> {
        self.invoke(
            HashContract::NAME,
            HashContract::INVOKE_MAPPING_DATA_HASH,
            vec![identifier.to_string(), hash.to_string()],
        )
        .await?;
        Ok(())
    }

    /// `hash.queryHashByIdentifier`, reduced to the first record's hash
    pub async fn query_hash(&self, identifier: &str) -> Result<Option<String>, ApiError> {
        let rows = self
            .query(
                HashContract::NAME,
                HashContract::QUERY_HASH_BY_IDENTIFIER,
                vec![identifier.to_string()],
            )
            .await?;
        Ok(first_mapping_hash(&rows))
    }

    async fn call(&self, route: &str, contract: &str, function: &str, args: Vec<String>) -> Result<Value, ApiError> {
        let url = format!("{}/{}/{}", self.base_url, route, contract);
        let body = InvokeRequest {
            function: function.to_string(),
            args,
        };
        let resp: ApiResponse<Value> = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        Ok(resp.into_data()?.unwrap_or(Value::Null))
    }
}

/// API response wrapper
#[derive(Deserialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_data(self) -> Result<Option<T>, ApiError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(ApiError::Server(self.error.unwrap_or_default()))
        }
    }
}

#[derive(Serialize)]
struct InvokeRequest {
    function: String,
    args: Vec<String>,
}

/// Node status
#[derive(Debug, Deserialize)]
pub struct NodeStatus {
    pub name: String,
    pub backend: String,
    pub state_version: u64,
    pub contracts: Vec<String>,
}

/// Arguments of `initOrg`, in call order
#[derive(Debug, Clone)]
pub struct OrgArgs {
    pub item_num: String,
    pub org_name: String,
    pub identity_prefix: String,
    pub public_key: String,
    pub authority: String,
}

impl OrgArgs {
    pub fn into_args(self) -> Vec<String> {
        vec![
            self.item_num,
            self.org_name,
            self.identity_prefix,
            self.public_key,
            self.authority,
        ]
    }
}

/// API Error
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Empty response")]
    EmptyResponse,
}

/// `mappingData_hash` of the first row of a query result
pub fn first_mapping_hash(rows: &Value) -> Option<String> {
    rows.as_array()?
        .first()?
        .get("Record")?
        .get(IdentityMappingRecord::MAPPING_DATA_HASH)?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_mapping_hash() {
        let rows = json!([
            {"Key": "user-42", "Record": {"docType": "identity", "identifier": "user-42", "mappingData_hash": "ab12ef"}},
            {"Key": "user-43", "Record": {"docType": "identity", "identifier": "user-43", "mappingData_hash": "ffff"}}
        ]);
        assert_eq!(first_mapping_hash(&rows), Some("ab12ef".to_string()));
    }

    #[test]
    fn test_first_mapping_hash_empty() {
        assert_eq!(first_mapping_hash(&json!([])), None);
        assert_eq!(first_mapping_hash(&Value::Null), None);
    }

    #[test]
    fn test_org_args_order() {
        let args = OrgArgs {
            item_num: "1001".into(),
            org_name: "Acme Corp".into(),
            identity_prefix: "ACM-".into(),
            public_key: "pubkey123".into(),
            authority: "rootCA".into(),
        }
        .into_args();
        assert_eq!(args, vec!["1001", "Acme Corp", "ACM-", "pubkey123", "rootCA"]);
    }

    #[test]
    fn test_server_error_surfaces_message() {
        let resp: ApiResponse<Value> = serde_json::from_str(
            r#"{"success":false,"data":null,"error":"Incorrect number of arguments. Expecting 2"}"#,
        )
        .unwrap();
        let err = resp.into_data().unwrap_err();
        assert_eq!(err.to_string(), "Server error: Incorrect number of arguments. Expecting 2");
    }
}
