use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use valuemachine_core::{PriceStore, PricesJson};

pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Keeps the price table in a JSON file, rewritten on every save.
pub struct JsonFilePriceStore {
    path: PathBuf,
}

impl JsonFilePriceStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl PriceStore for JsonFilePriceStore {
    async fn save(&self, prices: &PricesJson) -> valuemachine_core::Result<()> {
        let json = serde_json::to_string_pretty(prices)?;
        tokio::fs::write(&self.path, json).await?;
        tracing::debug!("Saved {} days of prices to {}", prices.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_price_store_writes_readable_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.json");
        let store = JsonFilePriceStore::new(path.clone());

        let mut prices = PricesJson::new();
        prices
            .entry("2021-03-01".to_string())
            .or_default()
            .entry("ETH".to_string())
            .or_default()
            .insert("DAI".to_string(), "0.0005".to_string());
        store.save(&prices).await.unwrap();

        let loaded: PricesJson = read_json(&path).unwrap();
        assert_eq!(loaded, prices);
    }
}
