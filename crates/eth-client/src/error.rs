//! Typed failures carried inside [`eyre::Report`] so callers can downcast.

use std::time::Duration;

use alloy::primitives::B256;
use eth_currency::ReceiptSummary;
use thiserror::Error;

/// A call was rejected by the EVM.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("execution reverted: {reason}")]
pub struct Reverted {
    /// Decoded `Error(string)` message, or the raw revert data in hex.
    pub reason: String,
}

/// A transaction was mined with a failed status.
#[derive(Debug, Error)]
#[error("transaction {hash} failed: {reason}")]
pub struct TransactionFailed {
    /// Transaction hash.
    pub hash: B256,
    /// Revert reason recovered by replaying the transaction as a call.
    pub reason: String,
    /// The failed receipt, still useful for cost reporting.
    pub receipt: Box<ReceiptSummary>,
}

/// No receipt appeared before the deadline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transaction {hash} not mined after {waited:?}")]
pub struct WaitTimeout {
    /// Transaction hash.
    pub hash: B256,
    /// Time spent waiting.
    pub waited: Duration,
}
