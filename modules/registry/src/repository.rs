//! Record Repository - validated creation of registry records

use idledger_core::{
    ChaincodeStub, IdLedgerError, IdLedgerResult, IdentityMappingRecord, OrgRecord,
    RegistryConfig,
};
use tracing::{debug, warn};

use crate::codec::{self, Record};
use crate::query::ORG_BY_NAME;

/// Positional arguments of `initOrg`
pub const ORG_ARG_COUNT: usize = 5;

/// Positional arguments of `invokeMappingDataHash`
pub const MAPPING_ARG_COUNT: usize = 2;

/// Check arity, then that every argument is non-empty.
///
/// Only the first violation is reported.
pub fn validate_args(args: &[String], expected: usize) -> IdLedgerResult<()> {
    if args.len() != expected {
        return Err(IdLedgerError::ArgumentCount { expected });
    }
    if let Some(index) = args.iter().position(|arg| arg.is_empty()) {
        return Err(IdLedgerError::EmptyArgument { position: index + 1 });
    }
    Ok(())
}

/// Typed write operations over the invocation's state
#[derive(Debug, Clone, Default)]
pub struct RecordRepository {
    config: RegistryConfig,
}

impl RecordRepository {
    pub fn new(config: RegistryConfig) -> Self {
        Self { config }
    }

    /// Create an organization record from
    /// `[item_num, org_name, identity_prefix, public_key, authority]`
    pub fn create_org(
        &self,
        stub: &mut dyn ChaincodeStub,
        args: &[String],
    ) -> IdLedgerResult<OrgRecord> {
        validate_args(args, ORG_ARG_COUNT)?;

        let org = OrgRecord::new(
            args[0].as_str(),
            ORG_BY_NAME.normalize(&args[1]),
            args[2].as_str(),
            args[3].as_str(),
            args[4].as_str(),
        );

        self.store(stub, &org)?;
        Ok(org)
    }

    /// Create an identifier mapping record from `[identifier, mapping_data_hash]`
    pub fn create_identity_mapping(
        &self,
        stub: &mut dyn ChaincodeStub,
        args: &[String],
    ) -> IdLedgerResult<IdentityMappingRecord> {
        validate_args(args, MAPPING_ARG_COUNT)?;

        let record = IdentityMappingRecord::new(args[0].as_str(), args[1].as_str());

        self.store(stub, &record)?;
        Ok(record)
    }

    fn store<R: Record>(&self, stub: &mut dyn ChaincodeStub, record: &R) -> IdLedgerResult<()> {
        let key = record.key();

        if self.config.enforce_uniqueness && stub.get_state(key)?.is_some() {
            warn!(key, doc_type = R::DOC_TYPE.as_str(), "rejecting write to existing key");
            return Err(IdLedgerError::AlreadyExists(key.to_string()));
        }

        let bytes = codec::encode(record)?;
        debug!(key, doc_type = R::DOC_TYPE.as_str(), size = bytes.len(), "writing record");
        stub.put_state(key, bytes)
    }
}
