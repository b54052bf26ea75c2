//! Runtime knobs shared by the ledger, executor and price resolver.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use valuemachine_market_data::RetryPolicy;

use crate::constants::{
    CHAIN_NATIVE_ASSETS, DEFAULT_OPAQUE_INTEREST_BEARERS, DEFAULT_RETRY_RATE_LIMIT_DELAY_MS,
    DEFAULT_RETRY_TIMEOUT_DELAY_MS, DEFAULT_UNIT, ETH_EQUIVALENTS, FEE_SINKS, FIAT_CURRENCIES,
};

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValueMachineConfig {
    /// Default unit of account for prices.
    pub unit: String,
    /// Account-name prefixes whose shortfalls are treated as accrued interest
    /// instead of debt.
    pub opaque_interest_bearers: Vec<String>,
    pub chain_native_assets: Vec<String>,
    pub fiat_currencies: Vec<String>,
    pub eth_equivalents: Vec<String>,
    pub fee_sinks: Vec<String>,
    pub retry_timeout_delay_ms: u64,
    pub retry_rate_limit_delay_ms: u64,
}

impl Default for ValueMachineConfig {
    fn default() -> Self {
        Self {
            unit: DEFAULT_UNIT.to_string(),
            opaque_interest_bearers: owned(DEFAULT_OPAQUE_INTEREST_BEARERS),
            chain_native_assets: owned(CHAIN_NATIVE_ASSETS),
            fiat_currencies: owned(FIAT_CURRENCIES),
            eth_equivalents: owned(ETH_EQUIVALENTS),
            fee_sinks: owned(FEE_SINKS),
            retry_timeout_delay_ms: DEFAULT_RETRY_TIMEOUT_DELAY_MS,
            retry_rate_limit_delay_ms: DEFAULT_RETRY_RATE_LIMIT_DELAY_MS,
        }
    }
}

impl ValueMachineConfig {
    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = unit.to_string();
        self
    }

    /// The configured prefix `account` accrues opaque interest under, if any.
    pub fn opaque_interest_source(&self, account: &str) -> Option<&str> {
        self.opaque_interest_bearers
            .iter()
            .find(|prefix| account.starts_with(prefix.as_str()))
            .map(String::as_str)
    }

    pub fn is_opaque_interest_bearer(&self, account: &str) -> bool {
        self.opaque_interest_source(account).is_some()
    }

    pub fn is_chain_native(&self, asset: &str) -> bool {
        self.chain_native_assets.iter().any(|a| a == asset)
    }

    pub fn is_fiat(&self, asset: &str) -> bool {
        self.fiat_currencies.iter().any(|a| a == asset)
    }

    pub fn is_fee_sink(&self, account: &str) -> bool {
        self.fee_sinks.iter().any(|a| a == account)
    }

    /// Maps ETH look-alikes to the canonical ETH ticker.
    pub fn format_unit<'a>(&'a self, unit: &'a str) -> &'a str {
        if self.eth_equivalents.iter().any(|e| e == unit) {
            self.eth_equivalents.first().map(String::as_str).unwrap_or(unit)
        } else {
            unit
        }
    }

    /// Identical tickers, or two members of the ETH-equivalent set.
    pub fn are_equivalent(&self, a: &str, b: &str) -> bool {
        let is_eth = |asset: &str| self.eth_equivalents.iter().any(|e| e == asset);
        a == b || (is_eth(a) && is_eth(b))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_millis(self.retry_timeout_delay_ms),
            Duration::from_millis(self.retry_rate_limit_delay_ms),
        )
    }
}
