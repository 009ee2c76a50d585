//! Value types shared by the conversion and reporting modules.

use std::collections::BTreeMap;
use std::fmt;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, Bytes, B256, U256};
use bigdecimal::BigDecimal;

/// Where a pair of exchange rates came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateOrigin {
    /// Fetched from the price API during this run.
    Live,
    /// Hardcoded snapshot used when the price API is unavailable.
    Default,
}

impl fmt::Display for RateOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateOrigin::Live => f.write_str("live"),
            RateOrigin::Default => f.write_str("default"),
        }
    }
}

/// Directional ETH/USD rates for one process run.
///
/// Rates are never persisted; a new run fetches (or defaults) again.
#[derive(Clone, Debug, PartialEq)]
pub struct ExchangeRates {
    /// USD price of 1 ETH.
    pub eth_to_usd: BigDecimal,
    /// ETH price of 1 USD.
    pub usd_to_eth: BigDecimal,
    /// Live or default.
    pub origin: RateOrigin,
}

/// Cost-relevant fields of a transaction as it was submitted.
///
/// Produced by the chain client right after sending, before mining.
#[derive(Clone, Debug, PartialEq)]
pub struct TxSummary {
    /// Transaction hash.
    pub hash: B256,
    /// Sender nonce.
    pub nonce: u64,
    /// Gas limit offered.
    pub gas_limit: u64,
    /// Gas price offered, in Wei.
    pub gas_price: u128,
    /// Value transferred, in Wei.
    pub value: U256,
}

impl TxSummary {
    /// Maximum Wei the sender can be charged: `gas_limit * gas_price + value`.
    pub fn max_cost(&self) -> U256 {
        U256::from(self.gas_limit)
            .saturating_mul(U256::from(self.gas_price))
            .saturating_add(self.value)
    }
}

/// Outcome of a mined transaction as reported by the node.
#[derive(Clone, Debug, PartialEq)]
pub struct ReceiptSummary {
    /// Transaction hash.
    pub hash: B256,
    /// `true` when execution succeeded.
    pub status: bool,
    /// Gas actually consumed.
    pub gas_used: u64,
    /// Price paid per unit of gas, in Wei.
    pub effective_gas_price: u128,
    /// Address of the created contract, for deployments.
    pub contract_address: Option<Address>,
    /// Logs in receipt order.
    pub logs: Vec<RawLog>,
}

impl ReceiptSummary {
    /// Wei actually charged for gas: `gas_used * effective_gas_price`.
    pub fn final_cost(&self) -> U256 {
        U256::from(self.gas_used).saturating_mul(U256::from(self.effective_gas_price))
    }
}

/// Cost snapshot of a submitted transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionDetails {
    /// Transaction hash (0x-prefixed hex).
    pub hash: String,
    /// Sender nonce.
    pub nonce: u64,
    /// Gas limit offered.
    pub gas_limit: u64,
    /// Gas price offered, in GWei.
    pub gas_offer_price_gwei: BigDecimal,
    /// Value transferred, in GWei.
    pub value_gwei: BigDecimal,
    /// Maximum cost, in GWei.
    pub max_gas_price_gwei: BigDecimal,
    /// Maximum cost, in USD (full precision; rounded when formatted).
    pub max_gas_price_usd: BigDecimal,
}

/// Outcome snapshot of a mined transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct ReceiptDetails {
    /// Execution status: 1 success, 0 failure.
    pub status: u64,
    /// Gas actually consumed.
    pub gas_used: u64,
    /// Gas price paid, in GWei.
    pub gas_price_gwei: BigDecimal,
    /// Gas price paid, in USD.
    pub gas_price_usd: BigDecimal,
    /// `gas_used * gas_price`, in GWei.
    pub final_cost_gwei: BigDecimal,
    /// `gas_used * gas_price`, in USD.
    pub final_cost_usd: BigDecimal,
}

/// Balance readings taken at the start and end of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct BalanceDiff {
    /// Starting balance, in GWei.
    pub before_gwei: BigDecimal,
    /// Ending balance, in GWei.
    pub after_gwei: BigDecimal,
    /// `before - after`, in GWei. Negative when the balance grew.
    pub diff_gwei: BigDecimal,
    /// `before - after`, in USD.
    pub diff_usd: BigDecimal,
}

/// Undecoded log entry as found in a receipt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawLog {
    /// Indexed topics; the first is normally the event signature hash.
    pub topics: Vec<B256>,
    /// ABI-encoded non-indexed parameters.
    pub data: Bytes,
}

/// One recognized event decoded from a receipt log.
#[derive(Clone, Debug, PartialEq)]
pub struct LogData {
    /// Event name from the ABI.
    pub event_name: String,
    /// Non-indexed parameters by name.
    pub fields: BTreeMap<String, DynSolValue>,
}

/// Response of the price-conversion endpoint.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ConversionResponse {
    #[serde(default)]
    pub status: ApiStatus,
    #[serde(default)]
    pub data: Vec<ConversionData>,
}

/// `status` block present on every price API response.
#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct ApiStatus {
    #[serde(default)]
    pub error_code: i64,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct ConversionData {
    #[serde(default)]
    pub symbol: String,
    pub quote: BTreeMap<String, Quote>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct Quote {
    /// Price exactly as written in the response body.
    pub price: Option<Box<serde_json::value::RawValue>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_cost_includes_value() {
        let summary = TxSummary {
            hash: B256::ZERO,
            nonce: 0,
            gas_limit: 21_000,
            gas_price: 2_000_000_000,
            value: U256::from(5u64),
        };
        assert_eq!(summary.max_cost(), U256::from(42_000_000_000_005u64));
    }

    #[test]
    fn rate_origin_display() {
        assert_eq!(RateOrigin::Live.to_string(), "live");
        assert_eq!(RateOrigin::Default.to_string(), "default");
    }
}
