//! Wei / GWei / ETH / USD conversions.
//!
//! All arithmetic is done on [`BigDecimal`] and [`BigInt`]. Scale changes
//! between Wei, GWei and ETH are exact (a shift of the decimal exponent);
//! products with exchange rates are bounded to [`PRECISION`] significant
//! digits, which is a little over 1024 bits of mantissa. Nothing in this
//! module goes through `f64`.

use alloy::primitives::U256;
use bigdecimal::{BigDecimal, RoundingMode};
use num_bigint::{BigInt, Sign};

use crate::types::ExchangeRates;

/// Significant decimal digits kept after every rate multiplication.
pub const PRECISION: u64 = 309;

/// Decimal exponent between Wei and GWei.
const GWEI_SCALE: i64 = 9;

/// Decimal exponent between Wei and ETH.
const ETH_SCALE: i64 = 18;

/// Converts Wei to GWei. Exact.
pub fn wei_to_gwei(amount_wei: &BigInt) -> BigDecimal {
    BigDecimal::new(amount_wei.clone(), GWEI_SCALE)
}

/// Converts GWei to Wei, dropping any fractional Wei (truncates toward zero).
pub fn gwei_to_wei(amount_gwei: &BigDecimal) -> BigInt {
    truncate_scaled(amount_gwei, GWEI_SCALE)
}

/// Converts Wei to ETH. Exact.
pub fn wei_to_eth(amount_wei: &BigInt) -> BigDecimal {
    BigDecimal::new(amount_wei.clone(), ETH_SCALE)
}

/// Converts ETH to Wei, dropping any fractional Wei.
pub fn eth_to_wei(amount_eth: &BigDecimal) -> BigInt {
    truncate_scaled(amount_eth, ETH_SCALE)
}

/// Multiplies by `10^exponent` and drops the fractional part.
fn truncate_scaled(amount: &BigDecimal, exponent: i64) -> BigInt {
    let (digits, scale) = amount.as_bigint_and_exponent();
    // value = digits * 10^-scale; shift by 10^exponent and drop the rest
    let shifted = BigDecimal::new(digits, scale - exponent).with_scale(0);
    let (int_value, _) = shifted.as_bigint_and_exponent();
    int_value
}

/// Widens an unsigned chain integer into a signed arbitrary-precision integer.
pub fn u256_to_bigint(value: U256) -> BigInt {
    BigInt::from_bytes_be(Sign::Plus, &value.to_be_bytes::<32>())
}

/// Narrows back to a chain integer. `None` when negative or wider than 256 bits.
pub fn bigint_to_u256(value: &BigInt) -> Option<U256> {
    let (sign, bytes) = value.to_bytes_be();
    match sign {
        Sign::Minus => None,
        Sign::NoSign => Some(U256::ZERO),
        Sign::Plus => U256::try_from_be_slice(&bytes),
    }
}

/// Renders an amount as a plain decimal string with trailing zeros removed.
///
/// Never switches to exponent notation, so `1 Wei` in GWei prints as
/// `0.000000001`.
pub fn format_plain(amount: &BigDecimal) -> String {
    amount.normalized().to_plain_string()
}

/// Renders a USD amount with exactly two decimals, rounding half to even.
pub fn format_usd(amount_usd: &BigDecimal) -> String {
    amount_usd
        .with_scale_round(2, RoundingMode::HalfEven)
        .to_plain_string()
}

/// Converts between chain units and USD using one fixed pair of rates.
///
/// The GWei rates are derived once from the base rates in [`Converter::new`]
/// and never refreshed independently.
#[derive(Clone, Debug)]
pub struct Converter {
    rates: ExchangeRates,
    one_gwei_to_usd: BigDecimal,
    one_usd_to_gwei: BigDecimal,
}

impl Converter {
    /// Builds a converter and caches the derived GWei rates.
    pub fn new(rates: ExchangeRates) -> Self {
        let one_gwei_to_usd = BigDecimal::new(BigInt::from(1), GWEI_SCALE) * &rates.eth_to_usd;
        let one_usd_to_gwei = BigDecimal::new(BigInt::from(1), -GWEI_SCALE) * &rates.usd_to_eth;

        Self {
            one_gwei_to_usd: one_gwei_to_usd.with_prec(PRECISION),
            one_usd_to_gwei: one_usd_to_gwei.with_prec(PRECISION),
            rates,
        }
    }

    /// Base rates in use.
    pub fn rates(&self) -> &ExchangeRates {
        &self.rates
    }

    /// `(eth_to_usd, usd_to_eth)`.
    pub fn values(&self) -> (&BigDecimal, &BigDecimal) {
        (&self.rates.eth_to_usd, &self.rates.usd_to_eth)
    }

    /// USD value of 1 GWei.
    pub fn one_gwei_to_usd(&self) -> &BigDecimal {
        &self.one_gwei_to_usd
    }

    /// GWei bought by 1 USD.
    pub fn one_usd_to_gwei(&self) -> &BigDecimal {
        &self.one_usd_to_gwei
    }

    /// Converts Wei to USD.
    pub fn wei_to_usd(&self, amount_wei: &BigInt) -> BigDecimal {
        self.gwei_to_usd(&wei_to_gwei(amount_wei))
    }

    /// Converts GWei to USD.
    pub fn gwei_to_usd(&self, amount_gwei: &BigDecimal) -> BigDecimal {
        (amount_gwei * &self.one_gwei_to_usd).with_prec(PRECISION)
    }

    /// Converts USD to GWei.
    pub fn usd_to_gwei(&self, amount_usd: &BigDecimal) -> BigDecimal {
        (amount_usd * &self.one_usd_to_gwei).with_prec(PRECISION)
    }

    /// Converts USD to Wei, truncating fractional Wei.
    pub fn usd_to_wei(&self, amount_usd: &BigDecimal) -> BigInt {
        gwei_to_wei(&self.usd_to_gwei(amount_usd))
    }
}
