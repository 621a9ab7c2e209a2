//! idledger State Management
//! 
//! Key-value state backends with a JSON selector rich-query interface,
//! and the transaction context contracts execute against.

pub mod store;
pub mod memory;
pub mod persistent;
pub mod context;

pub use store::*;
pub use memory::*;
pub use persistent::*;
pub use context::*;
