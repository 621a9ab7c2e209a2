//! idledger Registry Contracts
//! 
//! Two contracts over the shared ledger keyspace:
//! - `authority`: organization registration (`initOrg`, `queryInfoByOrg`)
//! - `hash`: identifier to mapping-data hash (`invokeMappingDataHash`, `queryHashByIdentifier`)

pub mod codec;
pub mod repository;
pub mod query;
pub mod authority;
pub mod hash;
mod contract;

pub use codec::*;
pub use repository::*;
pub use query::*;
pub use authority::*;
pub use hash::*;

use idledger_core::{Contract, RegistryConfig};
use std::sync::Arc;

/// Both registry contracts, constructed once and shared by the host
pub fn registry_contracts(config: &RegistryConfig) -> Vec<Arc<dyn Contract>> {
    vec![
        Arc::new(AuthorityContract::new(config.clone())),
        Arc::new(HashContract::new(config.clone())),
    ]
}
