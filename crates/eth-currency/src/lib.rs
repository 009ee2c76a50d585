//! eth-currency crate
//!
//! Unit conversion between Wei, GWei, ETH and USD, live exchange rates with
//! a fixed fallback, cost reports for transactions and receipts, and receipt
//! log decoding against a runtime ABI.

pub mod error;
pub mod logs;
pub mod rates;
pub mod report;
pub mod types;
pub mod units;

pub use error::{AbiParseError, LogDecodeError, RateFetchError};
pub use logs::{build_event_table, decode_logs, DecodedLogs, EventTable};
pub use rates::{default_rates, RateSource, RateSourceConfig};
pub use report::Reporter;
pub use types::{
    BalanceDiff, ExchangeRates, LogData, RateOrigin, RawLog, ReceiptDetails, ReceiptSummary,
    TransactionDetails, TxSummary,
};
pub use units::Converter;
