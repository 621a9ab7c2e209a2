//! idledger CLI library

mod commands;

pub use commands::*;
