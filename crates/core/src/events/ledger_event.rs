//! Events describing what a transaction did to the ledger.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::ChunkIndex;
use crate::transactions::TransferCategory;

/// Asset -> quantity.
pub type Balances = BTreeMap<String, Decimal>;

/// Account -> asset -> quantity.
pub type AccountBalances = BTreeMap<String, Balances>;

/// Facts emitted by the executor, in the order they happened.
///
/// Every variant carries the balances of the accounts it touched before and
/// after the change, restricted to the assets involved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A single transfer changed one or two accounts.
    #[serde(rename_all = "camelCase")]
    Transfer {
        date: DateTime<Utc>,
        description: String,
        category: TransferCategory,
        asset: String,
        quantity: Decimal,
        from: String,
        to: String,
        #[serde(default)]
        chunks: Vec<ChunkIndex>,
        #[serde(default)]
        tags: Vec<String>,
        old_balances: AccountBalances,
        new_balances: AccountBalances,
    },

    /// Assets were exchanged for other assets.
    #[serde(rename_all = "camelCase")]
    Trade {
        date: DateTime<Utc>,
        description: String,
        account: String,
        counterparty: String,
        outputs: Balances,
        inputs: Balances,
        spent_chunks: Vec<ChunkIndex>,
        received_chunks: Vec<ChunkIndex>,
        #[serde(default)]
        tags: Vec<String>,
        old_balances: AccountBalances,
        new_balances: AccountBalances,
    },

    /// Value moved between accounts governed by different jurisdictions.
    #[serde(rename_all = "camelCase")]
    JurisdictionChange {
        date: DateTime<Utc>,
        description: String,
        asset: String,
        quantity: Decimal,
        from: String,
        to: String,
        old_jurisdiction: String,
        new_jurisdiction: String,
        moved_chunks: Vec<ChunkIndex>,
        /// Moved chunks whose provenance has not been traced yet.
        insecure_chunks: Vec<ChunkIndex>,
        #[serde(default)]
        tags: Vec<String>,
        old_balances: AccountBalances,
        new_balances: AccountBalances,
    },
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Transfer { .. } => "Transfer",
            Self::Trade { .. } => "Trade",
            Self::JurisdictionChange { .. } => "JurisdictionChange",
        }
    }

    pub fn date(&self) -> DateTime<Utc> {
        match self {
            Self::Transfer { date, .. }
            | Self::Trade { date, .. }
            | Self::JurisdictionChange { date, .. } => *date,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Transfer { description, .. }
            | Self::Trade { description, .. }
            | Self::JurisdictionChange { description, .. } => description,
        }
    }

    pub fn new_balances(&self) -> &AccountBalances {
        match self {
            Self::Transfer { new_balances, .. }
            | Self::Trade { new_balances, .. }
            | Self::JurisdictionChange { new_balances, .. } => new_balances,
        }
    }
}
