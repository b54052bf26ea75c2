//! CoinGecko historical price oracle.
//!
//! Uses the public `/coins/{id}/history?date=dd-mm-yyyy` endpoint, which
//! returns a daily snapshot with `market_data.current_price` keyed by
//! lower-case vs-currency.
//! API documentation: https://www.coingecko.com/api/documentation

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::decimal_from_json;
use crate::errors::MarketDataError;
use crate::provider::{OracleKind, PriceOracle};

const BASE_URL: &str = "https://api.coingecko.com/api/v3";
const PROVIDER_ID: &str = "COINGECKO";

/// Ticker to CoinGecko coin id for the assets we commonly hold.
const DEFAULT_COIN_IDS: &[(&str, &str)] = &[
    ("AAVE", "aave"),
    ("BAT", "basic-attention-token"),
    ("BTC", "bitcoin"),
    ("COMP", "compound-governance-token"),
    ("DAI", "dai"),
    ("ETH", "ethereum"),
    ("GEN", "daostack"),
    ("LINK", "chainlink"),
    ("MATIC", "matic-network"),
    ("MKR", "maker"),
    ("REP", "augur"),
    ("SAI", "sai"),
    ("SNT", "status"),
    ("SNX", "havven"),
    ("UNI", "uniswap"),
    ("USDC", "usd-coin"),
    ("USDT", "tether"),
    ("WBTC", "wrapped-bitcoin"),
    ("WETH", "weth"),
    ("YFI", "yearn-finance"),
];

/// Units CoinGecko accepts as `vs_currency`.
const SUPPORTED_UNITS: &[&str] = &[
    "BTC", "ETH", "USD", "EUR", "GBP", "INR", "CAD", "JPY", "CNY", "AUD", "CHF",
];

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    market_data: Option<HistoryMarketData>,
}

#[derive(Debug, Deserialize)]
struct HistoryMarketData {
    #[serde(default)]
    current_price: HashMap<String, Value>,
}

/// CoinGecko oracle.
///
/// Only knows the coins in its id table; fiat assets are expected to be
/// asked for in inverted form by the caller (price of the unit in the fiat).
pub struct CoinGeckoOracle {
    client: Client,
    base_url: String,
    coin_ids: HashMap<String, String>,
}

impl Default for CoinGeckoOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl CoinGeckoOracle {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        let coin_ids = DEFAULT_COIN_IDS
            .iter()
            .map(|(ticker, id)| (ticker.to_string(), id.to_string()))
            .collect();

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            coin_ids,
        }
    }

    /// Registers (or overrides) the coin id used for a ticker.
    pub fn with_coin_id(mut self, ticker: &str, coin_id: &str) -> Self {
        self.coin_ids
            .insert(ticker.to_uppercase(), coin_id.to_string());
        self
    }

    fn coin_id(&self, asset: &str) -> Option<&str> {
        self.coin_ids
            .get(asset)
            .or_else(|| self.coin_ids.get(&asset.to_uppercase()))
            .map(String::as_str)
    }

    fn history_url(&self, coin_id: &str, date: NaiveDate) -> String {
        format!(
            "{}/coins/{}/history?date={}&localization=false",
            self.base_url,
            coin_id,
            date.format("%d-%m-%Y")
        )
    }

    async fn fetch(&self, url: &str) -> Result<HistoryResponse, MarketDataError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                MarketDataError::from_message(PROVIDER_ID, format!("Request failed: {}", e))
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MarketDataError::NoDataForDate(url.to_string()));
        }
        if !status.is_success() {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        response
            .json::<HistoryResponse>()
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse response: {}", e),
            })
    }
}

fn price_from_history(response: &HistoryResponse, unit: &str) -> Option<Decimal> {
    let prices = &response.market_data.as_ref()?.current_price;
    let price = decimal_from_json(prices.get(&unit.to_lowercase())?)?;
    (price > Decimal::ZERO).then_some(price)
}

#[async_trait]
impl PriceOracle for CoinGeckoOracle {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn kind(&self) -> OracleKind {
        OracleKind::History
    }

    fn supports(&self, _date: NaiveDate, asset: &str, unit: &str) -> bool {
        self.coin_id(asset).is_some() && SUPPORTED_UNITS.contains(&unit.to_uppercase().as_str())
    }

    async fn fetch_price(
        &self,
        date: NaiveDate,
        asset: &str,
        unit: &str,
    ) -> Result<Option<Decimal>, MarketDataError> {
        let Some(coin_id) = self.coin_id(asset) else {
            warn!("Asset \"{}\" is not available on CoinGecko", asset);
            return Ok(None);
        };

        let url = self.history_url(coin_id, date);
        info!("Fetching {} price of {} on {} from {}", unit, asset, date, url);

        let response = match self.fetch(&url).await {
            Ok(response) => response,
            Err(MarketDataError::NoDataForDate(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let price = price_from_history(&response, unit);
        match price {
            Some(p) => debug!("CoinGecko: 1 {} = {} {} on {}", asset, p, unit, date),
            None => warn!("Could not fetch {} price from CoinGecko on {}", asset, date),
        }
        Ok(price)
    }
}
