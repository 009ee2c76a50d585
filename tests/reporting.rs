//! Integration tests for cost reports and receipt log decoding.

mod common;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{keccak256, Address, B256, U256};
use bigdecimal::BigDecimal;
use common::{
    dec, item_set_log, sample_rates, sample_receipt, transfer_log, BASIC_ABI, TRANSFER_ABI,
};
use eth_currency::logs::{build_event_table, decode_logs};
use eth_currency::rates::default_rates;
use eth_currency::report::{format_balance_sheet, format_logs};
use eth_currency::units::{format_plain, format_usd, Converter};
use eth_currency::{AbiParseError, RawLog, Reporter};

/// A single-event ABI yields exactly one table entry, keyed by the EVM topic.
#[test]
fn transfer_event_table() {
    let table = build_event_table(TRANSFER_ABI).expect("valid ABI");
    let topic = keccak256("Transfer(address,uint256)");

    assert_eq!(table.len(), 1);
    assert_eq!(table.topics().copied().collect::<Vec<_>>(), vec![topic]);
    let entry = table.get(&topic).expect("Transfer registered");
    assert_eq!(entry.name, "Transfer");
    assert_eq!(entry.signature, "Transfer(address,uint256)");
}

/// Only the non-indexed `amount` is decoded from data; the indexed topic
/// does not name an event and is skipped.
#[test]
fn transfer_log_decodes_amount() {
    let table = build_event_table(TRANSFER_ABI).expect("valid ABI");
    let decoded = decode_logs(&table, &[transfer_log(Address::repeat_byte(0x11), 1000)]);

    assert!(decoded.failures.is_empty());
    assert_eq!(decoded.logs.len(), 1);
    assert_eq!(decoded.logs[0].event_name, "Transfer");
    assert_eq!(decoded.logs[0].fields.len(), 1);
    assert_eq!(
        decoded.logs[0].fields.get("amount"),
        Some(&DynSolValue::Uint(U256::from(1000u64), 256))
    );
}

/// Logs of unknown events produce nothing and no error.
#[test]
fn unknown_topic_is_ignored() {
    let table = build_event_table(TRANSFER_ABI).expect("valid ABI");
    let stranger = RawLog {
        topics: vec![keccak256("Approval(address,address,uint256)")],
        data: Default::default(),
    };

    let decoded = decode_logs(&table, &[stranger, RawLog::default()]);
    assert!(decoded.logs.is_empty());
    assert!(decoded.failures.is_empty());
    assert!(decoded.into_result().expect("no failures").is_empty());
}

/// Dynamic types in the payload decode through the runtime ABI.
#[test]
fn item_set_log_decodes_string_and_value() {
    let table = build_event_table(BASIC_ABI).expect("valid ABI");
    let logs = decode_logs(&table, &[item_set_log("adam", 1000)])
        .into_result()
        .expect("decodes");

    assert_eq!(logs.len(), 1);
    assert_eq!(
        logs[0].fields.get("key"),
        Some(&DynSolValue::String("adam".into()))
    );
    let text = format_logs(&logs);
    assert!(text.contains("ItemSet"));
    assert!(text.contains("adam"));
    assert!(text.contains("1000"));
}

/// 100 GWei down to 90 GWei: 10 GWei spent, priced at the derived GWei rate.
#[test]
fn balance_sheet_diff() {
    let converter = Converter::new(default_rates());
    let diff = converter.balance_diff(
        U256::from(100_000_000_000u64),
        U256::from(90_000_000_000u64),
    );

    assert_eq!(format_plain(&diff.before_gwei), "100");
    assert_eq!(format_plain(&diff.after_gwei), "90");
    assert_eq!(format_plain(&diff.diff_gwei), "10");

    let expected = converter.one_gwei_to_usd() * BigDecimal::from(10);
    assert_eq!(diff.diff_usd, expected);
    assert_eq!(diff.diff_usd, dec("0.00001503280164057658"));
    assert_eq!(format_usd(&diff.diff_usd), "0.00");

    let text = format_balance_sheet(&diff);
    assert!(text.contains("balance diff     : 10 GWei\n"));
    assert!(text.contains("balance diff     : 0.00 USD\n"));
}

/// Spending half an ETH at 2000 USD/ETH shows up as 1000 USD.
#[test]
fn balance_sheet_diff_in_dollars() {
    let converter = Converter::new(sample_rates());
    let one_eth = U256::from(1_000_000_000_000_000_000u64);
    let diff = converter.balance_diff(one_eth, one_eth / U256::from(2));

    assert_eq!(format_plain(&diff.diff_gwei), "500000000");
    assert_eq!(diff.diff_usd, dec("1000"));
    assert_eq!(
        diff.diff_usd,
        converter.one_gwei_to_usd() * BigDecimal::from(500_000_000)
    );

    let text = format_balance_sheet(&diff);
    assert!(text.contains("balance diff     : 1000.00 USD\n"));
}

/// Receipt output is followed by the decoded events.
#[test]
fn receipt_report_includes_logs() {
    let reporter = Reporter::new(Converter::new(sample_rates()), BASIC_ABI);
    let receipt = sample_receipt(B256::repeat_byte(1), true, vec![item_set_log("bill", 7)]);

    let text = reporter.fmt_receipt(&receipt);
    let receipt_at = text.find("Receipt Details").expect("receipt block");
    let logs_at = text.find("Logs").expect("logs block");
    assert!(receipt_at < logs_at);
    // 50_000 gas * 20 GWei = 1_000_000 GWei = 0.001 ETH = 2 USD
    assert!(text.contains("final cost       : 1000000 GWei\n"));
    assert!(text.contains("final cost       : 2.00 USD\n"));
    assert!(text.contains("bill"));
}

/// An ABI that is not an interface drops the log block only.
#[test]
fn receipt_report_without_usable_abi() {
    assert!(matches!(
        build_event_table(r#"{"not": "an abi"}"#),
        Err(AbiParseError::NotAnInterface(_))
    ));

    let reporter = Reporter::new(Converter::new(sample_rates()), r#"{"not": "an abi"}"#);
    let receipt = sample_receipt(B256::repeat_byte(2), true, vec![item_set_log("x", 1)]);
    let text = reporter.fmt_receipt(&receipt);

    assert!(text.contains("Receipt Details"));
    assert!(!text.contains("Logs"));
}

/// A transaction report prices the worst case: full gas limit plus value.
#[test]
fn transaction_report_prices_max_cost() {
    let reporter = Reporter::new(Converter::new(sample_rates()), BASIC_ABI);
    let tx = eth_currency::TxSummary {
        hash: B256::repeat_byte(3),
        nonce: 0,
        gas_limit: 100_000,
        gas_price: 10_000_000_000,
        value: U256::from(1_000_000_000_000_000u64),
    };

    let text = reporter.fmt_transaction(&tx);
    // 100_000 * 10 GWei + 1_000_000 GWei = 2_000_000 GWei = 4 USD
    assert!(text.contains("max gas price    : 2000000 GWei\n"));
    assert!(text.contains("max gas price    : 4.00 USD\n"));
    assert!(text.contains("value            : 1000000 GWei\n"));
}
