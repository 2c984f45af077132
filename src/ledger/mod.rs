//! Ledger module containing client management, transaction processing and
//! the account-scoped orchestrator

pub mod client;
pub mod core;
pub mod transaction;

pub use client::*;
pub use core::*;
pub use transaction::*;
