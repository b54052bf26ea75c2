//! Chunk ledger domain models.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::LedgerError;
use crate::utils::decimal_serde::exact_decimal;

/// Index of a chunk. Unique and increasing across the whole ledger.
pub type ChunkIndex = u64;

/// A lot of one asset with a single provenance.
///
/// A negative quantity is debt: the account owes that much of the asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetChunk {
    pub index: ChunkIndex,
    pub asset: String,
    #[serde(with = "exact_decimal")]
    pub quantity: Decimal,
    pub receive_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispose_date: Option<DateTime<Utc>>,
    /// Chunks this one was obtained in exchange for.
    #[serde(default)]
    pub sources: Vec<ChunkIndex>,
    /// Provenance has not been traced since the chunk appeared.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unsecured: bool,
}

impl AssetChunk {
    pub fn is_debt(&self) -> bool {
        self.quantity < Decimal::ZERO
    }

    /// Copy of this chunk holding a different quantity.
    pub fn with_quantity(&self, quantity: Decimal) -> Self {
        Self {
            quantity,
            ..self.clone()
        }
    }
}

/// Serializable state of the ledger at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub last_updated: DateTime<Utc>,
    /// Account -> chunks held, oldest first.
    #[serde(default)]
    pub accounts: BTreeMap<String, Vec<AssetChunk>>,
    /// Disposed chunks, in disposal order.
    #[serde(default)]
    pub history: Vec<AssetChunk>,
    /// Index the next minted chunk will get.
    #[serde(default)]
    pub next_chunk_index: ChunkIndex,
}

impl Default for LedgerSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerSnapshot {
    pub fn new() -> Self {
        Self {
            last_updated: DateTime::<Utc>::default(),
            accounts: BTreeMap::new(),
            history: Vec::new(),
            next_chunk_index: 0,
        }
    }

    pub fn chunks(&self) -> impl Iterator<Item = &AssetChunk> {
        self.accounts.values().flatten().chain(self.history.iter())
    }

    /// Sum of every chunk of `asset` held by `account`, debt included.
    pub fn balance(&self, account: &str, asset: &str) -> Decimal {
        self.accounts
            .get(account)
            .map(|chunks| {
                chunks
                    .iter()
                    .filter(|c| c.asset == asset)
                    .map(|c| c.quantity)
                    .sum()
            })
            .unwrap_or(Decimal::ZERO)
    }

    /// Checks the structural invariants a loaded snapshot must satisfy.
    pub fn validate(&self) -> Result<(), LedgerError> {
        let mut seen: HashSet<ChunkIndex> = HashSet::new();
        for chunk in self.chunks() {
            if !seen.insert(chunk.index) {
                return Err(LedgerError::InvalidSnapshot(format!(
                    "chunk #{} appears more than once",
                    chunk.index
                )));
            }
            if chunk.index >= self.next_chunk_index {
                return Err(LedgerError::InvalidSnapshot(format!(
                    "chunk #{} is not below next index {}",
                    chunk.index, self.next_chunk_index
                )));
            }
            if chunk.quantity.is_zero() {
                return Err(LedgerError::InvalidSnapshot(format!(
                    "chunk #{} holds nothing",
                    chunk.index
                )));
            }
        }

        for chunk in &self.history {
            if chunk.dispose_date.is_none() {
                return Err(LedgerError::InvalidSnapshot(format!(
                    "archived chunk #{} has no dispose date",
                    chunk.index
                )));
            }
        }

        for (account, chunks) in &self.accounts {
            let mut indebted: HashSet<&str> = HashSet::new();
            let mut holding: HashSet<&str> = HashSet::new();
            for chunk in chunks {
                if chunk.dispose_date.is_some() {
                    return Err(LedgerError::InvalidSnapshot(format!(
                        "{} holds disposed chunk #{}",
                        account, chunk.index
                    )));
                }
                if chunk.is_debt() {
                    indebted.insert(&chunk.asset);
                } else {
                    holding.insert(&chunk.asset);
                }
            }
            if let Some(asset) = indebted.intersection(&holding).next() {
                return Err(LedgerError::InvalidSnapshot(format!(
                    "{} holds both credit and debt in {}",
                    account, asset
                )));
            }
        }
        Ok(())
    }
}
