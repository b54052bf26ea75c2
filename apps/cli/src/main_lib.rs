use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use valuemachine_core::{
    derive_capital_gains, AddressBookJson, Event, InMemoryAddressBook, LedgerSnapshot, PriceResolver,
    PricesJson, Transaction, TransactionExecutor,
};
use valuemachine_market_data::provider::uniswap::default_markets;
use valuemachine_market_data::{CoinGeckoOracle, UniswapOracle};

use crate::config::Config;
use crate::store::{read_json, write_json, JsonFilePriceStore};

pub fn init_tracing() {
    let log_format = std::env::var("VM_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

/// Counts reported at the end of a run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub transactions: usize,
    pub events: usize,
    pub gains: usize,
}

/// Replays every transaction newer than the loaded snapshot, then writes
/// `ledger.json`, `events.json`, `prices.json` and `gains.json` to the output
/// directory.
///
/// A fatal executor error stops the run after writing the ledger as it stood
/// before the failing transaction, together with the events emitted so far.
pub async fn run(config: &Config) -> anyhow::Result<RunSummary> {
    let vm_config = Arc::new(config.value_machine_config()?);
    let entries: AddressBookJson = read_json(&config.address_book_path)?;
    let address_book = Arc::new(InMemoryAddressBook::new(entries));

    let mut transactions: Vec<Transaction> = read_json(&config.transactions_path)?;
    transactions.sort_by_key(|t| t.date);

    let mut snapshot = match &config.ledger_path {
        Some(path) if path.exists() => read_json::<LedgerSnapshot>(path)?,
        _ => LedgerSnapshot::new(),
    };
    snapshot
        .validate()
        .context("Refusing to continue from an invalid ledger snapshot")?;

    let prices: PricesJson = match &config.prices_path {
        Some(path) if path.exists() => read_json(path)?,
        _ => PricesJson::new(),
    };

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create {}", config.output_dir.display()))?;
    let ledger_out = config.output_dir.join("ledger.json");
    let events_out = config.output_dir.join("events.json");
    let prices_out = config.output_dir.join("prices.json");
    let gains_out = config.output_dir.join("gains.json");

    let mut resolver = PriceResolver::from_json(&prices, vm_config.clone())
        .with_store(Arc::new(JsonFilePriceStore::new(prices_out.clone())));
    if config.offline {
        info!("Offline mode, prices come from the price table and observed trades only");
    } else {
        resolver = resolver
            .with_oracle(Arc::new(UniswapOracle::new(default_markets())))
            .with_oracle(Arc::new(CoinGeckoOracle::new()));
    }

    let executor = TransactionExecutor::new(address_book, vm_config.clone());
    let pending: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| t.date > snapshot.last_updated)
        .collect();
    if pending.len() < transactions.len() {
        info!(
            "Skipping {} transactions already in the ledger (last updated {})",
            transactions.len() - pending.len(),
            snapshot.last_updated
        );
    }

    let mut events: Vec<Event> = Vec::new();
    for transaction in &pending {
        match executor.execute(&snapshot, transaction) {
            Ok((next, mut emitted)) => {
                snapshot = next;
                events.append(&mut emitted);
            }
            Err(e) => {
                error!("Failed to process transaction from {}: {}", transaction.date, e);
                write_json(&ledger_out, &snapshot)?;
                write_json(&events_out, &events)?;
                return Err(e).with_context(|| {
                    format!(
                        "Stopped at transaction {} ({}), last good ledger written to {}",
                        transaction.hash.as_deref().unwrap_or("without hash"),
                        transaction.date,
                        ledger_out.display()
                    )
                });
            }
        }
        if let Err(e) = resolver.sync_transaction(transaction, &vm_config.unit).await {
            warn!("Could not sync prices for transaction from {}: {}", transaction.date, e);
        }
    }
    if let Err(e) = resolver.sync_chunks(&snapshot.history, &vm_config.unit).await {
        warn!("Could not sync prices for disposed chunks: {}", e);
    }

    write_json(&ledger_out, &snapshot)?;
    write_json(&events_out, &events)?;
    write_json(&prices_out, &resolver.to_json())?;

    let gains = derive_capital_gains(&snapshot.history, &resolver, &vm_config.unit)
        .context("Capital gains need a price for every disposed chunk")?;
    write_json(&gains_out, &gains)?;

    Ok(RunSummary {
        transactions: pending.len(),
        events: events.len(),
        gains: gains.len(),
    })
}
