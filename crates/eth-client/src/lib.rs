//! eth-client crate
//!
//! Thin signing client over an Ethereum JSON-RPC node: balances, transaction
//! options, deployment, contract calls, and waiting for receipts.

pub mod backend;
pub mod client;
pub mod contract_id;
pub mod error;
pub mod keystore;

pub use backend::{ChainBackend, DialedBackend};
pub use client::{Client, SentTransaction, TransactOpts};
pub use error::{Reverted, TransactionFailed, WaitTimeout};
