use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::ChunkIndex;

/// Realized gain or loss on one disposed chunk, valued in a single unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapitalGain {
    pub chunk: ChunkIndex,
    pub asset: String,
    pub quantity: Decimal,
    pub unit: String,
    pub receive_date: DateTime<Utc>,
    pub dispose_date: DateTime<Utc>,
    /// Value of the chunk when it was received.
    pub cost: Decimal,
    /// Value of the chunk when it was disposed.
    pub proceeds: Decimal,
    pub gain: Decimal,
    pub long_term: bool,
}
