//! idledger node implementation
//!
//! Combines the state backend, the registry contracts and the HTTP API:
//! - runtime: contract dispatch and write-set commit
//! - api: axum routes for invoke/query
//! - node: startup and shutdown

mod api;
mod node;
mod runtime;

pub use api::*;
pub use node::*;
pub use runtime::*;
