//! Error types for idledger

use thiserror::Error;

/// Main error type for idledger
#[derive(Error, Debug)]
pub enum IdLedgerError {
    // ============ Argument Errors ============
    #[error("Incorrect number of arguments. Expecting {expected}")]
    ArgumentCount { expected: usize },

    #[error("{} argument must be a non-empty string", ordinal(.position))]
    EmptyArgument { position: usize },

    // ============ Encoding Errors ============
    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Decoding failed: {0}")]
    Decoding(String),

    // ============ State Errors ============
    #[error("Storage error: {0}")]
    Store(String),

    #[error("Rich query is not supported by the {0} state backend")]
    RichQueryUnsupported(String),

    #[error("Malformed selector: {0}")]
    MalformedSelector(String),

    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    #[error("Query failed: {0}")]
    Query(String),

    // ============ Dispatch Errors ============
    #[error("Received unknown function invocation")]
    UnknownOperation(String),

    #[error("Contract not found: {0}")]
    ContractNotFound(String),

    // ============ Configuration Errors ============
    #[error("Configuration error: {0}")]
    Config(String),

    // ============ General Errors ============
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IdLedgerError {
    /// Wrap a store failure raised on the read path.
    ///
    /// Argument errors pass through untouched so callers still see the
    /// validation message they caused.
    pub fn into_query_error(self) -> Self {
        match self {
            IdLedgerError::Query(_)
            | IdLedgerError::ArgumentCount { .. }
            | IdLedgerError::EmptyArgument { .. } => self,
            other => IdLedgerError::Query(other.to_string()),
        }
    }

    /// True for caller-input validation failures.
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            IdLedgerError::ArgumentCount { .. } | IdLedgerError::EmptyArgument { .. }
        )
    }
}

/// English ordinal for a 1-based argument position ("1st", "2nd", ...).
pub fn ordinal(position: &usize) -> String {
    let suffix = match (position % 10, position % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", position, suffix)
}

impl From<std::io::Error> for IdLedgerError {
    fn from(err: std::io::Error) -> Self {
        IdLedgerError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for IdLedgerError {
    fn from(err: serde_json::Error) -> Self {
        IdLedgerError::Encoding(err.to_string())
    }
}
