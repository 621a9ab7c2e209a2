//! Identifier to mapping-data hash contract

use idledger_core::{ChaincodeStub, Contract, IdLedgerResult, RegistryConfig, Response};
use tracing::info;

use crate::contract::{respond, unknown_function};
use crate::query::{QueryService, MAPPING_BY_IDENTIFIER};
use crate::repository::RecordRepository;

/// Contract managing `IdentityMappingRecord`s
#[derive(Debug, Clone, Default)]
pub struct HashContract {
    repository: RecordRepository,
    queries: QueryService,
}

impl HashContract {
    pub const NAME: &'static str = "hash";
    pub const INVOKE_MAPPING_DATA_HASH: &'static str = "invokeMappingDataHash";
    pub const QUERY_HASH_BY_IDENTIFIER: &'static str = "queryHashByIdentifier";

    pub fn new(config: RegistryConfig) -> Self {
        Self {
            repository: RecordRepository::new(config),
            queries: QueryService::new(),
        }
    }

    /// `invokeMappingDataHash(identifier, mapping_data_hash)`
    pub fn invoke_mapping_data_hash(
        &self,
        stub: &mut dyn ChaincodeStub,
        args: &[String],
    ) -> IdLedgerResult<Option<Vec<u8>>> {
        let record = self.repository.create_identity_mapping(stub, args)?;
        info!(identifier = %record.identifier, "mapping hash recorded");
        Ok(None)
    }

    /// `queryHashByIdentifier(identifier)`; exact, case-sensitive match
    pub fn query_hash_by_identifier(
        &self,
        stub: &dyn ChaincodeStub,
        args: &[String],
    ) -> IdLedgerResult<Option<Vec<u8>>> {
        let payload = self.queries.query_by_args(stub, &MAPPING_BY_IDENTIFIER, args)?;
        Ok(Some(payload))
    }
}

impl Contract for HashContract {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&self, _stub: &mut dyn ChaincodeStub) -> Response {
        Response::success(None)
    }

    fn invoke(&self, stub: &mut dyn ChaincodeStub, function: &str, args: &[String]) -> Response {
        info!(contract = Self::NAME, function, "invoke is running");

        let result = match function {
            Self::INVOKE_MAPPING_DATA_HASH => self.invoke_mapping_data_hash(stub, args),
            Self::QUERY_HASH_BY_IDENTIFIER => self.query_hash_by_identifier(stub, args),
            other => unknown_function(Self::NAME, other),
        };

        respond(Self::NAME, function, result)
    }
}
