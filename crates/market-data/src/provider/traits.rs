//! Price oracle trait definitions.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::errors::MarketDataError;

/// Broad family of an oracle, used to gate which oracle may answer which query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OracleKind {
    /// On-chain exchange history. Only consulted when both the asset and the
    /// unit are chain-native tokens.
    Amm,
    /// Aggregated market history covering fiat and most listed tokens.
    History,
}

/// Trait for historical price sources.
///
/// An oracle answers "what was one `asset` worth in `unit` on `date`".
/// `Ok(None)` means the oracle simply has no price; errors are reserved for
/// failed requests so the caller can decide whether to retry.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Constant identifier like "COINGECKO", used in logs.
    fn id(&self) -> &'static str;

    fn kind(&self) -> OracleKind;

    /// Cheap pre-check that avoids a network round trip for pairs the oracle
    /// can never serve.
    fn supports(&self, _date: NaiveDate, _asset: &str, _unit: &str) -> bool {
        true
    }

    async fn fetch_price(
        &self,
        date: NaiveDate,
        asset: &str,
        unit: &str,
    ) -> Result<Option<Decimal>, MarketDataError>;
}
