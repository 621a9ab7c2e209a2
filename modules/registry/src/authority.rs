//! Organization registry contract
//!
//! Registers an organization's identity prefix, public key and authority,
//! and looks organizations up by name.

use idledger_core::{ChaincodeStub, Contract, IdLedgerResult, RegistryConfig, Response};
use tracing::info;

use crate::contract::{respond, unknown_function};
use crate::query::{QueryService, ORG_BY_NAME};
use crate::repository::RecordRepository;

/// Contract managing `OrgRecord`s
#[derive(Debug, Clone, Default)]
pub struct AuthorityContract {
    repository: RecordRepository,
    queries: QueryService,
}

impl AuthorityContract {
    pub const NAME: &'static str = "authority";
    pub const INIT_ORG: &'static str = "initOrg";
    pub const QUERY_INFO_BY_ORG: &'static str = "queryInfoByOrg";

    pub fn new(config: RegistryConfig) -> Self {
        Self {
            repository: RecordRepository::new(config),
            queries: QueryService::new(),
        }
    }

    /// `initOrg(item_num, org_name, identity_prefix, public_key, authority)`
    pub fn init_org(
        &self,
        stub: &mut dyn ChaincodeStub,
        args: &[String],
    ) -> IdLedgerResult<Option<Vec<u8>>> {
        let org = self.repository.create_org(stub, args)?;
        info!(item_num = %org.item_num, org_name = %org.org_name, "organization registered");
        Ok(None)
    }

    /// `queryInfoByOrg(org_name)`; the name is matched case-insensitively
    pub fn query_info_by_org(
        &self,
        stub: &dyn ChaincodeStub,
        args: &[String],
    ) -> IdLedgerResult<Option<Vec<u8>>> {
        let payload = self.queries.query_by_args(stub, &ORG_BY_NAME, args)?;
        Ok(Some(payload))
    }
}

impl Contract for AuthorityContract {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&self, _stub: &mut dyn ChaincodeStub) -> Response {
        Response::success(None)
    }

    fn invoke(&self, stub: &mut dyn ChaincodeStub, function: &str, args: &[String]) -> Response {
        info!(contract = Self::NAME, function, "invoke is running");

        let result = match function {
            Self::INIT_ORG => self.init_org(stub, args),
            Self::QUERY_INFO_BY_ORG => self.query_info_by_org(stub, args),
            other => unknown_function(Self::NAME, other),
        };

        respond(Self::NAME, function, result)
    }
}
