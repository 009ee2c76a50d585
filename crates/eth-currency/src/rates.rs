//! # CoinMarketCap Rate Source
//!
//! Fetches the USD price of 1 ETH and the ETH price of 1 USD from the
//! CoinMarketCap `price-conversion` tool endpoint.
//!
//! The two directions are requested independently, as the API quotes them
//! independently; their product is close to, but not exactly, 1.
//!
//! ## Fallback
//!
//! Rate fetching never blocks a chain operation. Without an API key, or when
//! either request fails, [`RateSource::rates_or_default`] returns
//! [`default_rates`] and logs the reason. Only the dollar figures in the
//! reports become approximate.

use std::str::FromStr;
use std::time::Duration;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use num_traits::Zero;
use tracing::{debug, info, warn};

use crate::error::RateFetchError;
use crate::types::{ConversionResponse, ExchangeRates, RateOrigin};
use crate::units::PRECISION;

/// CoinMarketCap pro API base URL.
pub const CMC_BASE_URL: &str = "https://pro-api.coinmarketcap.com";

/// Header carrying the API key.
pub const CMC_HEADER: &str = "X-CMC_PRO_API_KEY";

/// Path of the conversion tool endpoint.
const CONVERSION_PATH: &str = "/v2/tools/price-conversion";

/// USD price of 1 ETH on 2022-08-27.
const DEFAULT_ONE_ETH_TO_USD: &str = "1503.280164057658";

/// ETH price of 1 USD on 2022-08-27.
const DEFAULT_ONE_USD_TO_ETH: &str = "0.000665206530956729";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Date the default rates were captured.
pub fn default_rates_date() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2022, 8, 27)
}

/// The fixed fallback pair. Deterministic; never touches the network.
pub fn default_rates() -> ExchangeRates {
    ExchangeRates {
        eth_to_usd: BigDecimal::from_str(DEFAULT_ONE_ETH_TO_USD).unwrap_or_default(),
        usd_to_eth: BigDecimal::from_str(DEFAULT_ONE_USD_TO_ETH).unwrap_or_default(),
        origin: RateOrigin::Default,
    }
}

impl ExchangeRates {
    /// Builds a consistent pair from a single ETH→USD rate by inverting it.
    ///
    /// Returns `None` for a zero rate.
    pub fn from_eth_to_usd(eth_to_usd: BigDecimal, origin: RateOrigin) -> Option<Self> {
        if eth_to_usd.is_zero() {
            return None;
        }
        let usd_to_eth = (BigDecimal::from(1) / &eth_to_usd).with_prec(PRECISION);
        Some(Self {
            eth_to_usd,
            usd_to_eth,
            origin,
        })
    }
}

/// Explicit configuration for [`RateSource`].
#[derive(Clone, Debug)]
pub struct RateSourceConfig {
    /// CoinMarketCap API key. `None` means "use the defaults".
    pub api_key: Option<String>,
    /// API base URL, without trailing slash.
    pub base_url: String,
    /// Bound on each request and on the pair of requests together.
    pub timeout: Duration,
}

impl Default for RateSourceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: CMC_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RateSourceConfig {
    /// Config for the public endpoint with the given key. Blank keys count as absent.
    pub fn with_api_key(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            ..Self::default()
        }
    }
}

/// Client for the price-conversion API.
pub struct RateSource {
    client: reqwest::Client,
    config: RateSourceConfig,
}

impl RateSource {
    /// Builds the HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`RateFetchError::Request`] if the TLS backend cannot be initialised.
    pub fn new(config: RateSourceConfig) -> Result<Self, RateFetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    /// Whether a live fetch will be attempted.
    pub fn has_api_key(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Fetches both directional rates.
    ///
    /// # Errors
    ///
    /// Fails if no key is configured, if either request fails or times out,
    /// or if either response is not a success.
    #[tracing::instrument(skip_all, fields(base_url = %self.config.base_url))]
    pub async fn fetch_rates(&self) -> Result<ExchangeRates, RateFetchError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(RateFetchError::MissingApiKey)?;

        let both = async {
            tokio::try_join!(
                self.fetch_price(api_key, "ETH", "USD"),
                self.fetch_price(api_key, "USD", "ETH"),
            )
        };

        let (eth_to_usd, usd_to_eth) = tokio::time::timeout(self.config.timeout, both)
            .await
            .map_err(|_| RateFetchError::Timeout(self.config.timeout))??;

        info!(
            eth_to_usd = %eth_to_usd,
            usd_to_eth = %usd_to_eth,
            "fetched live exchange rates"
        );

        Ok(ExchangeRates {
            eth_to_usd,
            usd_to_eth,
            origin: RateOrigin::Live,
        })
    }

    /// Live rates when possible, [`default_rates`] otherwise. Never fails.
    pub async fn rates_or_default(&self) -> ExchangeRates {
        if !self.has_api_key() {
            debug!("no price API key configured, using default rates");
            return default_rates();
        }

        match self.fetch_rates().await {
            Ok(rates) => rates,
            Err(error) => {
                warn!(%error, "price API unavailable, falling back to default rates");
                default_rates()
            }
        }
    }

    /// Price of 1 `from` expressed in `to`.
    async fn fetch_price(
        &self,
        api_key: &str,
        from: &str,
        to: &str,
    ) -> Result<BigDecimal, RateFetchError> {
        let url = format!("{}{}", self.config.base_url, CONVERSION_PATH);

        debug!(from, to, "requesting price conversion");

        let response = self
            .client
            .get(&url)
            .query(&[("amount", "1"), ("symbol", from), ("convert", to)])
            .header(CMC_HEADER, api_key)
            .send()
            .await
            .map_err(|error| self.classify(error))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| self.classify(error))?;

        let parsed = serde_json::from_str::<ConversionResponse>(&body);

        if !status.is_success() {
            let message = parsed
                .ok()
                .and_then(|response| response.status.error_message)
                .filter(|message| !message.is_empty())
                .unwrap_or(body);
            return Err(RateFetchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed = parsed.map_err(|error| RateFetchError::Malformed(error.to_string()))?;
        extract_price(&parsed, to)
    }

    fn classify(&self, error: reqwest::Error) -> RateFetchError {
        if error.is_timeout() {
            RateFetchError::Timeout(self.config.timeout)
        } else {
            RateFetchError::Request(error)
        }
    }
}

/// Reads `data[0].quote.<to>.price` as an exact decimal.
///
/// The price is parsed from its JSON text, so every digit the API sends is
/// kept. The quote key is matched case-insensitively.
fn extract_price(response: &ConversionResponse, to: &str) -> Result<BigDecimal, RateFetchError> {
    if response.status.error_code != 0 {
        let message = response
            .status
            .error_message
            .clone()
            .unwrap_or_else(|| format!("error code {}", response.status.error_code));
        return Err(RateFetchError::Malformed(message));
    }

    let data = response
        .data
        .first()
        .ok_or_else(|| RateFetchError::Malformed("response has no data".to_string()))?;

    let price = data
        .quote
        .iter()
        .find(|(symbol, _)| symbol.eq_ignore_ascii_case(to))
        .and_then(|(_, quote)| quote.price.as_ref())
        .ok_or_else(|| {
            RateFetchError::Malformed(format!("no {to} quote for {}", data.symbol))
        })?;

    let text = price.get().trim_matches('"');
    BigDecimal::from_str(text)
        .map_err(|error| RateFetchError::Malformed(format!("price {text}: {error}")))
}
