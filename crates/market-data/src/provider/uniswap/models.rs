//! Subgraph response structures.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub(crate) struct GraphResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct V1Data {
    #[serde(default)]
    pub exchange_historical_datas: Vec<V1HistoricalData>,
}

/// One V1 exchange snapshot. `price` is tokens per ETH.
#[derive(Debug, Deserialize)]
pub(crate) struct V1HistoricalData {
    #[allow(dead_code)]
    pub timestamp: Value,
    pub price: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct V2Data {
    #[serde(default)]
    pub pair_day_datas: Vec<V2PairDayData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct V2PairDayData {
    pub reserve0: Value,
    pub reserve1: Value,
    pub token0: V2Token,
    pub token1: V2Token,
}

#[derive(Debug, Deserialize)]
pub(crate) struct V2Token {
    pub symbol: String,
}
