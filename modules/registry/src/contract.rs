//! Shared dispatch plumbing for the registry contracts

use idledger_core::{IdLedgerError, IdLedgerResult, Response};
use tracing::{info, warn};

/// Turn an operation result into a contract response, logging failures
pub(crate) fn respond(
    contract: &str,
    function: &str,
    result: IdLedgerResult<Option<Vec<u8>>>,
) -> Response {
    match &result {
        Ok(_) => info!(contract, function, "invocation succeeded"),
        Err(e) => warn!(contract, function, error = %e, "invocation failed"),
    }
    Response::from(result)
}

/// Error for a function name the contract does not export
pub(crate) fn unknown_function(contract: &str, function: &str) -> IdLedgerResult<Option<Vec<u8>>> {
    warn!(contract, function, "invoke did not find function");
    Err(IdLedgerError::UnknownOperation(function.to_string()))
}
