//! Integration tests for unit conversion precision and rate handling.

mod common;

use bigdecimal::BigDecimal;
use common::{dec, sample_rates};
use eth_currency::rates::default_rates;
use eth_currency::units::{
    eth_to_wei, format_plain, format_usd, gwei_to_wei, wei_to_eth, wei_to_gwei, Converter,
};
use eth_currency::{ExchangeRates, RateOrigin};
use num_bigint::BigInt;

/// Wei → GWei → Wei is the identity, whether or not the amount is a whole
/// number of GWei.
#[test]
fn gwei_round_trip_is_exact() {
    let amounts = [
        BigInt::from(0),
        BigInt::from(1),
        BigInt::from(999_999_999u64),
        BigInt::from(1_000_000_000u64),
        BigInt::from(39_576_000_001u64),
        BigInt::from(10u64).pow(30) + BigInt::from(7),
    ];

    for wei in amounts {
        assert_eq!(gwei_to_wei(&wei_to_gwei(&wei)), wei);
    }
}

/// Wei → ETH → Wei is the identity for values beyond u128.
#[test]
fn eth_round_trip_is_exact_for_large_values() {
    let wei = BigInt::from(u128::MAX) * BigInt::from(1_000u64) + BigInt::from(3);
    assert_eq!(eth_to_wei(&wei_to_eth(&wei)), wei);
}

/// Under an exactly inverted pair, Wei → USD → Wei stays within 1e-6
/// relative error.
///
/// The default snapshot pair is quoted independently per direction and is
/// only consistent to about 8e-6, so it is inverted from its ETH→USD side.
#[test]
fn usd_round_trip_under_inverted_rates() {
    let defaults = default_rates();
    let rates = ExchangeRates::from_eth_to_usd(defaults.eth_to_usd, RateOrigin::Default)
        .expect("non-zero rate");
    let converter = Converter::new(rates);

    let tolerance = dec("0.000001");
    for wei in [
        BigInt::from(21_000u64) * BigInt::from(39_576_000_000u64),
        BigInt::from(10u64).pow(18),
        BigInt::from(123_456_789_012_345_678u64),
    ] {
        let back = converter.usd_to_wei(&converter.wei_to_usd(&wei));
        let diff = BigDecimal::from(&back - &wei).abs();
        let relative = diff / BigDecimal::from(wei.clone());
        assert!(relative < tolerance, "{wei} came back as {back}");
    }
}

/// GWei rates are derived from the base rates, not refreshed separately.
#[test]
fn derived_gwei_rates_follow_base_rates() {
    let converter = Converter::new(sample_rates());
    assert_eq!(format_plain(converter.one_gwei_to_usd()), "0.000002");
    assert_eq!(format_plain(converter.one_usd_to_gwei()), "500000");

    let defaults = Converter::new(default_rates());
    assert_eq!(
        format_plain(defaults.one_gwei_to_usd()),
        "0.000001503280164057658"
    );
    assert_eq!(format_plain(defaults.one_usd_to_gwei()), "665206.530956729");
}

/// The converter reports both base rates unchanged.
#[test]
fn values_returns_base_rates() {
    let converter = Converter::new(default_rates());
    let (eth_to_usd, usd_to_eth) = converter.values();
    assert_eq!(format_plain(eth_to_usd), "1503.280164057658");
    assert_eq!(format_plain(usd_to_eth), "0.000665206530956729");
}

/// USD amounts print with exactly two decimals, half to even.
#[test]
fn usd_formatting_uses_bankers_rounding() {
    let converter = Converter::new(sample_rates());
    // 1_250 GWei * 0.000002 = 0.0025 USD
    assert_eq!(format_usd(&converter.gwei_to_usd(&dec("1250"))), "0.00");
    // 3_750 GWei * 0.000002 = 0.0075 USD
    assert_eq!(format_usd(&converter.gwei_to_usd(&dec("3750"))), "0.01");
    assert_eq!(format_usd(&dec("2.345")), "2.34");
    assert_eq!(format_usd(&dec("2.355")), "2.36");
}

/// Sub-Wei results of a USD conversion are dropped, not rounded up.
#[test]
fn usd_to_wei_truncates() {
    let converter = Converter::new(ExchangeRates {
        eth_to_usd: dec("3"),
        usd_to_eth: dec("0.333333333333333333333"),
        origin: RateOrigin::Live,
    });
    assert_eq!(
        converter.usd_to_wei(&dec("1")),
        BigInt::from(333_333_333_333_333_333u64)
    );
}
