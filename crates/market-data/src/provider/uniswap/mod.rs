//! Uniswap exchange-history oracle.
//!
//! Reads V1 exchange snapshots and V2 pair reserves from the public subgraphs.
//! Availability depends on the day being asked about:
//!
//! - before V1 launched there is no price at all
//! - between the V1 and V2 launches only ETH-denominated V1 prices exist
//! - afterwards ETH-denominated prices try V1 then V2, other units use V2

mod models;

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use self::models::{GraphResponse, V1Data, V2Data};
use super::decimal_from_json;
use crate::errors::MarketDataError;
use crate::provider::{OracleKind, PriceOracle};

const PROVIDER_ID: &str = "UNISWAP";
const V1_SUBGRAPH_URL: &str = "https://api.thegraph.com/subgraphs/name/graphprotocol/uniswap";
const V2_SUBGRAPH_URL: &str = "https://api.thegraph.com/subgraphs/name/uniswap/uniswap-v2";
const ETH: &str = "ETH";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UniswapVersion {
    V1,
    V2,
}

impl UniswapVersion {
    pub fn launch_date(&self) -> NaiveDate {
        match self {
            Self::V1 => NaiveDate::from_ymd_opt(2018, 11, 2),
            Self::V2 => NaiveDate::from_ymd_opt(2020, 5, 4),
        }
        .unwrap_or_default()
    }
}

/// A single exchange (V1) or pair (V2) contract.
///
/// V1 exchanges always trade `token` against ETH, so `quote` is "ETH" there.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniswapMarket {
    pub version: UniswapVersion,
    pub address: String,
    pub token: String,
    pub quote: String,
}

impl UniswapMarket {
    pub fn v1(token: &str, address: &str) -> Self {
        Self {
            version: UniswapVersion::V1,
            address: address.to_lowercase(),
            token: token.to_string(),
            quote: ETH.to_string(),
        }
    }

    pub fn v2(token: &str, quote: &str, address: &str) -> Self {
        Self {
            version: UniswapVersion::V2,
            address: address.to_lowercase(),
            token: token.to_string(),
            quote: quote.to_string(),
        }
    }

    fn trades(&self, a: &str, b: &str) -> bool {
        (self.token == a && self.quote == b) || (self.token == b && self.quote == a)
    }
}

pub fn default_markets() -> Vec<UniswapMarket> {
    vec![
        UniswapMarket::v1("DAI", "0x2a1530C4C41db0B0b2bB646CB5Eb1A67b7158667"),
        UniswapMarket::v2("DAI", ETH, "0xA478c2975Ab1Ea89e8196811F51A7B7Ade33eB11"),
        UniswapMarket::v2("USDC", ETH, "0xB4e16d0168e52d35CaCD2c6185b44281Ec28C9Dc"),
        UniswapMarket::v2("UNI", ETH, "0xd3d2E2692501A5c9Ca623199D38826e513033a17"),
    ]
}

/// Which market versions may be consulted for `unit` on `date`, in order.
pub fn eligible_versions(date: NaiveDate, unit: &str) -> Vec<UniswapVersion> {
    if date < UniswapVersion::V1.launch_date() {
        vec![]
    } else if date < UniswapVersion::V2.launch_date() {
        if unit == ETH {
            vec![UniswapVersion::V1]
        } else {
            vec![]
        }
    } else if unit == ETH {
        vec![UniswapVersion::V1, UniswapVersion::V2]
    } else {
        vec![UniswapVersion::V2]
    }
}

/// First instant after `date`, as unix seconds. Snapshots taken before it
/// belong to that day or earlier.
fn end_of_day_timestamp(date: NaiveDate) -> i64 {
    date.succ_opt()
        .unwrap_or(date)
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

pub struct UniswapOracle {
    client: Client,
    markets: Vec<UniswapMarket>,
    v1_url: String,
    v2_url: String,
}

impl Default for UniswapOracle {
    fn default() -> Self {
        Self::new(default_markets())
    }
}

impl UniswapOracle {
    pub fn new(markets: Vec<UniswapMarket>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            markets,
            v1_url: V1_SUBGRAPH_URL.to_string(),
            v2_url: V2_SUBGRAPH_URL.to_string(),
        }
    }

    pub fn with_subgraph_urls(mut self, v1_url: impl Into<String>, v2_url: impl Into<String>) -> Self {
        self.v1_url = v1_url.into();
        self.v2_url = v2_url.into();
        self
    }

    fn find_market(&self, version: UniswapVersion, asset: &str, unit: &str) -> Option<&UniswapMarket> {
        self.markets
            .iter()
            .find(|m| m.version == version && m.trades(asset, unit))
    }

    async fn query<T: DeserializeOwned>(&self, url: &str, query: String) -> Result<Option<T>, MarketDataError> {
        let response = self
            .client
            .post(url)
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(|e| {
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
        if !status.is_success() {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        let body: GraphResponse<T> = response.json().await.map_err(|e| MarketDataError::ProviderError {
            provider: PROVIDER_ID.to_string(),
            message: format!("Failed to parse response: {}", e),
        })?;

        if !body.errors.is_empty() {
            let message = body
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(MarketDataError::from_message(PROVIDER_ID, message));
        }
        Ok(body.data)
    }

    async fn fetch_v1(&self, market: &UniswapMarket, date: NaiveDate) -> Result<Option<Decimal>, MarketDataError> {
        info!(
            "Fetching ETH price of {} on {} from UniswapV1 market {}",
            market.token, date, market.address
        );
        let query = format!(
            r#"{{
  exchangeHistoricalDatas(
    where: {{ timestamp_lt: {}, exchangeAddress: "{}" }},
    first: 1,
    orderBy: timestamp,
    orderDirection: desc
  ) {{
    timestamp
    price
  }}
}}"#,
            end_of_day_timestamp(date),
            market.address
        );
        let data: Option<V1Data> = self.query(&self.v1_url, query).await?;
        Ok(data.and_then(|d| v1_eth_price(&d)))
    }

    async fn fetch_v2(
        &self,
        market: &UniswapMarket,
        date: NaiveDate,
        asset: &str,
        unit: &str,
    ) -> Result<Option<Decimal>, MarketDataError> {
        info!(
            "Fetching {} price of {} on {} from UniswapV2 market {}",
            unit, asset, date, market.address
        );
        let query = format!(
            r#"{{
  pairDayDatas(
    where: {{ pairAddress: "{}", date_lt: {} }},
    first: 1,
    orderBy: date,
    orderDirection: desc
  ) {{
    reserve0
    reserve1
    token0 {{ symbol }}
    token1 {{ symbol }}
  }}
}}"#,
            market.address,
            end_of_day_timestamp(date)
        );
        let data: Option<V2Data> = self.query(&self.v2_url, query).await?;
        Ok(data.and_then(|d| v2_price(&d, asset, unit)))
    }
}

/// ETH per token from the latest V1 snapshot.
fn v1_eth_price(data: &V1Data) -> Option<Decimal> {
    let tokens_per_eth = decimal_from_json(&data.exchange_historical_datas.first()?.price)?;
    if tokens_per_eth <= Decimal::ZERO {
        return None;
    }
    Decimal::ONE.checked_div(tokens_per_eth)
}

/// Unit per asset from the latest V2 reserves. WETH reserves count as ETH.
fn v2_price(data: &V2Data, asset: &str, unit: &str) -> Option<Decimal> {
    let day = data.pair_day_datas.first()?;
    let symbol = |s: &str| if s == "WETH" { ETH.to_string() } else { s.to_string() };
    let reserve0 = decimal_from_json(&day.reserve0)?;
    let reserve1 = decimal_from_json(&day.reserve1)?;
    let (asset_reserve, unit_reserve) = match (symbol(&day.token0.symbol), symbol(&day.token1.symbol)) {
        (t0, t1) if t0 == asset && t1 == unit => (reserve0, reserve1),
        (t0, t1) if t0 == unit && t1 == asset => (reserve1, reserve0),
        _ => return None,
    };
    if asset_reserve <= Decimal::ZERO || unit_reserve <= Decimal::ZERO {
        return None;
    }
    unit_reserve.checked_div(asset_reserve)
}

#[async_trait]
impl PriceOracle for UniswapOracle {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn kind(&self) -> OracleKind {
        OracleKind::Amm
    }

    fn supports(&self, date: NaiveDate, asset: &str, unit: &str) -> bool {
        eligible_versions(date, unit)
            .into_iter()
            .any(|v| self.find_market(v, asset, unit).is_some())
    }

    async fn fetch_price(
        &self,
        date: NaiveDate,
        asset: &str,
        unit: &str,
    ) -> Result<Option<Decimal>, MarketDataError> {
        if asset == unit {
            return Ok(Some(Decimal::ONE));
        }
        for version in eligible_versions(date, unit) {
            let Some(market) = self.find_market(version, asset, unit) else {
                debug!("No Uniswap {:?} market for {}-{}", version, asset, unit);
                continue;
            };
            let price = match version {
                UniswapVersion::V1 if market.token == asset => self.fetch_v1(market, date).await?,
                UniswapVersion::V1 => self
                    .fetch_v1(market, date)
                    .await?
                    .and_then(|p| Decimal::ONE.checked_div(p)),
                UniswapVersion::V2 => self.fetch_v2(market, date, asset, unit).await?,
            };
            if let Some(price) = price.filter(|p| *p > Decimal::ZERO) {
                return Ok(Some(price));
            }
        }
        warn!("Could not fetch {} price of {} from Uniswap on {}", unit, asset, date);
        Ok(None)
    }
}
