use async_trait::async_trait;

use super::prices_model::PricesJson;
use crate::errors::Result;

/// Persistence hook for the price table.
///
/// The resolver calls `save` with the full table after every price it learns
/// from an oracle, so nothing fetched over the network is lost if the run
/// stops early.
#[async_trait]
pub trait PriceStore: Send + Sync {
    async fn save(&self, prices: &PricesJson) -> Result<()>;
}
