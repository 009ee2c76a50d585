//! Cost summaries for transactions, receipts and account balances.
//!
//! `Converter::*_details` turn raw chain numbers into snapshots; the
//! `format_*` functions turn snapshots into the text blocks printed by the
//! CLI. Formatting is pure: no I/O, no errors. GWei figures are printed as
//! plain decimals, USD figures with two decimals rounded half to even
//! (see [`format_usd`]).

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::U256;
use num_bigint::BigInt;
use tracing::warn;

use crate::logs::{build_event_table, decode_logs};
use crate::types::{
    BalanceDiff, LogData, ReceiptDetails, ReceiptSummary, TransactionDetails, TxSummary,
};
use crate::units::{format_plain, format_usd, u256_to_bigint, wei_to_gwei, Converter};

const RULE: &str = "----------------------------------------------------";

impl Converter {
    /// Cost snapshot of a submitted transaction.
    pub fn transaction_details(&self, tx: &TxSummary) -> TransactionDetails {
        let max_cost = u256_to_bigint(tx.max_cost());

        TransactionDetails {
            hash: format!("{:#x}", tx.hash),
            nonce: tx.nonce,
            gas_limit: tx.gas_limit,
            gas_offer_price_gwei: wei_to_gwei(&BigInt::from(tx.gas_price)),
            value_gwei: wei_to_gwei(&u256_to_bigint(tx.value)),
            max_gas_price_gwei: wei_to_gwei(&max_cost),
            max_gas_price_usd: self.wei_to_usd(&max_cost),
        }
    }

    /// Outcome snapshot of a mined transaction.
    pub fn receipt_details(&self, receipt: &ReceiptSummary) -> ReceiptDetails {
        let gas_price = BigInt::from(receipt.effective_gas_price);
        let final_cost = u256_to_bigint(receipt.final_cost());

        ReceiptDetails {
            status: u64::from(receipt.status),
            gas_used: receipt.gas_used,
            gas_price_gwei: wei_to_gwei(&gas_price),
            gas_price_usd: self.wei_to_usd(&gas_price),
            final_cost_gwei: wei_to_gwei(&final_cost),
            final_cost_usd: self.wei_to_usd(&final_cost),
        }
    }

    /// Difference between a starting and an ending balance, both in Wei.
    pub fn balance_diff(&self, starting: U256, ending: U256) -> BalanceDiff {
        let before = u256_to_bigint(starting);
        let after = u256_to_bigint(ending);
        let diff = &before - &after;

        BalanceDiff {
            before_gwei: wei_to_gwei(&before),
            after_gwei: wei_to_gwei(&after),
            diff_gwei: wei_to_gwei(&diff),
            diff_usd: self.wei_to_usd(&diff),
        }
    }
}

fn push_header(out: &mut String, title: &str) {
    out.push('\n');
    out.push_str(title);
    out.push('\n');
    out.push_str(RULE);
    out.push('\n');
}

fn push_line(out: &mut String, label: &str, value: &str) {
    out.push_str(&format!("{label:<17}: {value}\n"));
}

/// Renders a [`TransactionDetails`] block.
pub fn format_transaction(details: &TransactionDetails) -> String {
    let mut out = String::new();
    push_header(&mut out, "Transaction Details");
    push_line(&mut out, "hash", &details.hash);
    push_line(&mut out, "nonce", &details.nonce.to_string());
    push_line(&mut out, "gas limit", &details.gas_limit.to_string());
    push_line(
        &mut out,
        "gas offer price",
        &format!("{} GWei", format_plain(&details.gas_offer_price_gwei)),
    );
    push_line(
        &mut out,
        "value",
        &format!("{} GWei", format_plain(&details.value_gwei)),
    );
    push_line(
        &mut out,
        "max gas price",
        &format!("{} GWei", format_plain(&details.max_gas_price_gwei)),
    );
    push_line(
        &mut out,
        "max gas price",
        &format!("{} USD", format_usd(&details.max_gas_price_usd)),
    );
    out
}

/// Renders a [`ReceiptDetails`] block.
pub fn format_receipt(details: &ReceiptDetails) -> String {
    let mut out = String::new();
    push_header(&mut out, "Receipt Details");
    push_line(&mut out, "status", &details.status.to_string());
    push_line(&mut out, "gas used", &details.gas_used.to_string());
    push_line(
        &mut out,
        "gas price",
        &format!("{} GWei", format_plain(&details.gas_price_gwei)),
    );
    push_line(
        &mut out,
        "gas price",
        &format!("{} USD", format_usd(&details.gas_price_usd)),
    );
    push_line(
        &mut out,
        "final cost",
        &format!("{} GWei", format_plain(&details.final_cost_gwei)),
    );
    push_line(
        &mut out,
        "final cost",
        &format!("{} USD", format_usd(&details.final_cost_usd)),
    );
    out
}

/// Renders a [`BalanceDiff`] block.
pub fn format_balance_sheet(diff: &BalanceDiff) -> String {
    let mut out = String::new();
    push_header(&mut out, "Balance");
    push_line(
        &mut out,
        "balance before",
        &format!("{} GWei", format_plain(&diff.before_gwei)),
    );
    push_line(
        &mut out,
        "balance after",
        &format!("{} GWei", format_plain(&diff.after_gwei)),
    );
    push_line(
        &mut out,
        "balance diff",
        &format!("{} GWei", format_plain(&diff.diff_gwei)),
    );
    push_line(
        &mut out,
        "balance diff",
        &format!("{} USD", format_usd(&diff.diff_usd)),
    );
    out
}

/// Renders decoded events, one block per event. Empty input renders nothing.
pub fn format_logs(logs: &[LogData]) -> String {
    if logs.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    push_header(&mut out, "Logs");
    for (position, log) in logs.iter().enumerate() {
        if position > 0 {
            out.push('\n');
        }
        push_line(&mut out, "event", &log.event_name);
        for (name, value) in &log.fields {
            push_line(&mut out, name, &display_value(value));
        }
    }
    out
}

/// Renders an arbitrary titled block of labeled values.
pub fn format_block(title: &str, rows: &[(&str, String)]) -> String {
    let mut out = String::new();
    push_header(&mut out, title);
    for (label, value) in rows {
        push_line(&mut out, label, value);
    }
    out
}

/// Human-readable rendering of a decoded ABI value.
pub fn display_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Bool(flag) => flag.to_string(),
        DynSolValue::Int(number, _) => number.to_string(),
        DynSolValue::Uint(number, _) => number.to_string(),
        DynSolValue::FixedBytes(word, size) => {
            format!("0x{}", alloy::hex::encode(&word[..*size]))
        }
        DynSolValue::Address(address) => address.to_checksum(None),
        DynSolValue::Bytes(bytes) => format!("0x{}", alloy::hex::encode(bytes)),
        DynSolValue::String(text) => text.clone(),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
            let rendered: Vec<String> = items.iter().map(display_value).collect();
            format!("[{}]", rendered.join(", "))
        }
        DynSolValue::Tuple(items) => {
            let rendered: Vec<String> = items.iter().map(display_value).collect();
            format!("({})", rendered.join(", "))
        }
        other => format!("{other:?}"),
    }
}

/// Converter plus the ABI of the contract being exercised.
///
/// Produces the same blocks as the free functions, with receipt output
/// followed by the events decoded from the receipt's logs.
pub struct Reporter {
    converter: Converter,
    abi_json: String,
}

impl Reporter {
    /// Pairs a converter with the contract ABI used to decode receipt logs.
    pub fn new(converter: Converter, abi_json: impl Into<String>) -> Self {
        Self {
            converter,
            abi_json: abi_json.into(),
        }
    }

    /// Converter in use.
    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    /// Transaction block for a submitted transaction.
    pub fn fmt_transaction(&self, tx: &TxSummary) -> String {
        format_transaction(&self.converter.transaction_details(tx))
    }

    /// Receipt block, followed by decoded logs when the ABI allows it.
    ///
    /// An unusable ABI or an undecodable log only drops that part of the
    /// output; the receipt block is always present.
    pub fn fmt_receipt(&self, receipt: &ReceiptSummary) -> String {
        let mut out = format_receipt(&self.converter.receipt_details(receipt));

        match self.extract_log_data(receipt) {
            Ok(logs) => out.push_str(&format_logs(&logs)),
            Err(error) => warn!(%error, "receipt logs not decoded"),
        }

        out
    }

    /// Balance block for two readings in Wei.
    pub fn fmt_balance_sheet(&self, starting: U256, ending: U256) -> String {
        format_balance_sheet(&self.converter.balance_diff(starting, ending))
    }

    /// Decodes the receipt's logs against the ABI. Per-log failures are
    /// logged and skipped.
    pub fn extract_log_data(
        &self,
        receipt: &ReceiptSummary,
    ) -> Result<Vec<LogData>, crate::error::AbiParseError> {
        let table = build_event_table(&self.abi_json)?;
        let decoded = decode_logs(&table, &receipt.logs);
        Ok(decoded.logs)
    }
}
