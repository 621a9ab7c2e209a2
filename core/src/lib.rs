//! idledger Core Library
//! 
//! Record types, error taxonomy, and the state/contract traits shared by the
//! idledger registry contracts and the host runtime that executes them.

pub mod types;
pub mod traits;
pub mod error;
pub mod config;

pub use types::*;
pub use traits::*;
pub use error::*;
pub use config::*;
