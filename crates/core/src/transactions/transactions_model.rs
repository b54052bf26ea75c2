//! Transaction and transfer models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::utils::decimal_serde::exact_decimal;

/// What a transfer does to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferCategory {
    /// Plain movement between two accounts.
    Transfer,
    Income,
    Expense,
    Deposit,
    Withdraw,
    Borrow,
    Repay,
    SwapIn,
    SwapOut,
    /// Movement between two accounts of the same owner.
    Internal,
}

impl TransferCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transfer => "Transfer",
            Self::Income => "Income",
            Self::Expense => "Expense",
            Self::Deposit => "Deposit",
            Self::Withdraw => "Withdraw",
            Self::Borrow => "Borrow",
            Self::Repay => "Repay",
            Self::SwapIn => "SwapIn",
            Self::SwapOut => "SwapOut",
            Self::Internal => "Internal",
        }
    }

    pub fn is_swap(&self) -> bool {
        matches!(self, Self::SwapIn | Self::SwapOut)
    }

    /// New value entering the ledger from outside.
    pub fn mints(&self) -> bool {
        matches!(self, Self::Income | Self::Borrow | Self::SwapIn)
    }

    /// Value leaving the ledger for good.
    pub fn burns(&self) -> bool {
        matches!(self, Self::Expense | Self::Repay | Self::SwapOut)
    }

    /// Value moving between two accounts, possibly across jurisdictions.
    pub fn moves(&self) -> bool {
        matches!(
            self,
            Self::Transfer | Self::Internal | Self::Deposit | Self::Withdraw
        )
    }
}

impl fmt::Display for TransferCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Transfer" => Ok(Self::Transfer),
            "Income" => Ok(Self::Income),
            "Expense" => Ok(Self::Expense),
            "Deposit" => Ok(Self::Deposit),
            "Withdraw" => Ok(Self::Withdraw),
            "Borrow" => Ok(Self::Borrow),
            "Repay" => Ok(Self::Repay),
            "SwapIn" => Ok(Self::SwapIn),
            "SwapOut" => Ok(Self::SwapOut),
            "Internal" => Ok(Self::Internal),
            other => Err(ValidationError::InvalidInput(format!(
                "Unknown transfer category: {}",
                other
            ))),
        }
    }
}

/// A single movement of one asset between two accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub asset: String,
    #[serde(with = "exact_decimal")]
    pub quantity: Decimal,
    pub from: String,
    pub to: String,
    pub category: TransferCategory,
    /// Processing order within the transaction.
    #[serde(default)]
    pub index: u32,
    /// Network fee paid for the transaction itself.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fee: bool,
}

impl Transfer {
    pub fn new(category: TransferCategory, asset: &str, quantity: Decimal, from: &str, to: &str) -> Self {
        Self {
            asset: asset.to_string(),
            quantity,
            from: from.to_string(),
            to: to.to_string(),
            category,
            index: 0,
            fee: false,
        }
    }

    pub fn with_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    pub fn as_fee(mut self) -> Self {
        self.fee = true;
        self
    }
}

/// A dated bundle of transfers applied to the ledger atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub transfers: Vec<Transfer>,
}

impl Transaction {
    pub fn new(date: DateTime<Utc>, transfers: Vec<Transfer>) -> Self {
        Self {
            date,
            hash: None,
            sources: Vec::new(),
            tags: Vec::new(),
            description: String::new(),
            transfers,
        }
    }

    /// Transfers in processing order. Ties keep their original position.
    pub fn sorted_transfers(&self) -> Vec<&Transfer> {
        let mut transfers: Vec<&Transfer> = self.transfers.iter().collect();
        transfers.sort_by_key(|t| t.index);
        transfers
    }

    /// Distinct assets touched, in order of first appearance.
    pub fn assets(&self) -> Vec<String> {
        let mut assets: Vec<String> = Vec::new();
        for transfer in &self.transfers {
            if !assets.contains(&transfer.asset) {
                assets.push(transfer.asset.clone());
            }
        }
        assets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_transfer_quantity_is_read_exactly() {
        let json = r#"{"date":"2021-03-01T00:00:00Z","transfers":[
            {"asset":"SHIB","quantity":"9876543210.987654321098765432","from":"0xa","to":"0xb","category":"Transfer","index":1},
            {"asset":"ETH","quantity":"0.1","from":"0xa","to":"Ethereum","category":"Expense","fee":true}
        ]}"#;
        let transaction: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(transaction.transfers[0].quantity, dec!(9876543210.987654321098765432));
        assert!(transaction.transfers[1].fee);
        assert_eq!(transaction.sorted_transfers()[0].asset, "ETH");
        assert_eq!(transaction.assets(), vec!["SHIB", "ETH"]);
    }

    #[test]
    fn test_transfer_quantity_that_would_round_is_rejected() {
        let json = r#"{"asset":"SHIB","quantity":"98765432109876.98765432109876543","from":"0xa","to":"0xb","category":"Transfer"}"#;
        assert!(serde_json::from_str::<Transfer>(json).is_err());
    }
}
