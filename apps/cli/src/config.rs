use std::path::PathBuf;

use anyhow::Context;
use valuemachine_core::ValueMachineConfig;

use crate::store::read_json;

pub struct Config {
    pub config_path: Option<PathBuf>,
    pub address_book_path: PathBuf,
    pub transactions_path: PathBuf,
    pub ledger_path: Option<PathBuf>,
    pub prices_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub unit: String,
    pub offline: bool,
    pub retry_timeout_delay_ms: Option<u64>,
    pub retry_rate_limit_delay_ms: Option<u64>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config_path = std::env::var("VM_CONFIG").ok().map(PathBuf::from);
        let address_book_path = std::env::var("VM_ADDRESS_BOOK")
            .unwrap_or_else(|_| "./address-book.json".into())
            .into();
        let transactions_path = std::env::var("VM_TRANSACTIONS")
            .unwrap_or_else(|_| "./transactions.json".into())
            .into();
        let ledger_path = std::env::var("VM_LEDGER").ok().map(PathBuf::from);
        let prices_path = std::env::var("VM_PRICES").ok().map(PathBuf::from);
        let output_dir = std::env::var("VM_OUTPUT_DIR")
            .unwrap_or_else(|_| "./out".into())
            .into();
        let unit = std::env::var("VM_UNIT").unwrap_or_else(|_| "ETH".into());
        let offline = std::env::var("VM_OFFLINE")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let retry_timeout_delay_ms = optional_millis("VM_RETRY_TIMEOUT_MS")?;
        let retry_rate_limit_delay_ms = optional_millis("VM_RETRY_RATE_LIMIT_MS")?;
        Ok(Self {
            config_path,
            address_book_path,
            transactions_path,
            ledger_path,
            prices_path,
            output_dir,
            unit,
            offline,
            retry_timeout_delay_ms,
            retry_rate_limit_delay_ms,
        })
    }

    /// Settings from `VM_CONFIG` (if any) with the environment's unit and
    /// retry delays on top.
    pub fn value_machine_config(&self) -> anyhow::Result<ValueMachineConfig> {
        let base = match &self.config_path {
            Some(path) => read_json::<ValueMachineConfig>(path)?,
            None => ValueMachineConfig::default(),
        };
        let mut config = base.with_unit(&self.unit);
        if let Some(ms) = self.retry_timeout_delay_ms {
            config.retry_timeout_delay_ms = ms;
        }
        if let Some(ms) = self.retry_rate_limit_delay_ms {
            config.retry_rate_limit_delay_ms = ms;
        }
        Ok(config)
    }
}

fn optional_millis(name: &str) -> anyhow::Result<Option<u64>> {
    match std::env::var(name) {
        Ok(raw) => {
            let ms = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: {:?}", name, raw))?;
            Ok(Some(ms))
        }
        Err(_) => Ok(None),
    }
}
