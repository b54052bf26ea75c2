use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use valuemachine_market_data::{MarketDataError, OracleKind, PriceOracle, RetryClass, RetryPolicy};

use super::pathfinder::find_path;
use super::prices_model::{PricesJson, RateEntry, RateTable};
use super::prices_traits::PriceStore;
use super::swap_rates::infer_swap_rates;
use crate::config::ValueMachineConfig;
use crate::constants::PRICE_DECIMALS;
use crate::errors::{PriceError, Result, ValidationError};
use crate::ledger::AssetChunk;
use crate::transactions::{AssetAmounts, TradeSummary, Transaction};
use crate::utils::decimal_utils::{format_price, parse_decimal, parse_exact_decimal, truncate_fraction, truncate_price};
use crate::utils::time_utils::{parse_day, AsDay};

/// Date-keyed exchange-rate graph.
///
/// Answers "what was one `asset` worth in `unit` on a given day" from rates
/// merged in from elsewhere, inferred from trades, or fetched from oracles.
/// Rates are stored in one direction only; lookups invert and chain them as
/// needed.
pub struct PriceResolver {
    rates: BTreeMap<NaiveDate, RateTable>,
    config: Arc<ValueMachineConfig>,
    oracles: Vec<Arc<dyn PriceOracle>>,
    retry: RetryPolicy,
    store: Option<Arc<dyn PriceStore>>,
}

impl PriceResolver {
    pub fn new(config: Arc<ValueMachineConfig>) -> Self {
        let retry = config.retry_policy();
        Self {
            rates: BTreeMap::new(),
            config,
            oracles: Vec::new(),
            retry,
            store: None,
        }
    }

    /// Resolver seeded with a previously saved price table.
    pub fn from_json(json: &PricesJson, config: Arc<ValueMachineConfig>) -> Self {
        let mut resolver = Self::new(config);
        let loaded = resolver.merge(json);
        info!("Loaded {} prices across {} days", loaded, resolver.rates.len());
        resolver
    }

    /// Oracles are consulted in the order they are added.
    pub fn with_oracle(mut self, oracle: Arc<dyn PriceOracle>) -> Self {
        self.oracles.push(oracle);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn PriceStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &ValueMachineConfig {
        &self.config
    }

    pub fn to_json(&self) -> PricesJson {
        let mut json = PricesJson::new();
        for (date, table) in &self.rates {
            let day = json.entry(date.format("%Y-%m-%d").to_string()).or_default();
            for entry in table.entries() {
                day.entry(entry.unit.clone())
                    .or_default()
                    .insert(entry.asset.clone(), format_price(entry.rate));
            }
        }
        json
    }

    /// Deep-merges an external price table, overwriting rates it repeats.
    ///
    /// Malformed dates and rates are dropped with a warning. Returns the
    /// number of rates accepted.
    pub fn merge(&mut self, json: &PricesJson) -> usize {
        let mut accepted = 0;
        for (raw_date, units) in json {
            let Some(date) = parse_day(raw_date) else {
                warn!("Dropping prices under malformed date {:?}", raw_date);
                continue;
            };
            for (unit, assets) in units {
                for (asset, raw_rate) in assets {
                    match parse_rate(raw_rate) {
                        Some(rate) if self.store_rate(date, unit, asset, rate) => accepted += 1,
                        _ => warn!(
                            "Dropping invalid {} price for {} on {}: {:?}",
                            unit, asset, raw_date, raw_rate
                        ),
                    }
                }
            }
        }
        debug!("Merged {} prices", accepted);
        accepted
    }

    /// Records that one `asset` was worth `rate` `unit` on `date`.
    pub fn set_price(&mut self, date: impl AsDay, asset: &str, unit: &str, rate: Decimal) -> Result<()> {
        let date = date.as_day();
        if stored_rate(rate).is_none() {
            return Err(PriceError::InvalidPrice {
                date: date.to_string(),
                asset: asset.to_string(),
                unit: unit.to_string(),
                value: rate.to_string(),
            }
            .into());
        }
        debug!("Setting {} price of {} on {}: {}", unit, asset, date, rate);
        self.store_rate(date, unit, asset, rate);
        Ok(())
    }

    /// Inserts a rate under canonical tickers. Returns false when nothing
    /// positive survives truncation or both sides are the same asset.
    fn store_rate(&mut self, date: NaiveDate, unit: &str, asset: &str, rate: Decimal) -> bool {
        let unit = self.config.format_unit(unit);
        let asset = self.config.format_unit(asset);
        match stored_rate(rate) {
            Some(rate) if unit != asset => {
                self.rates.entry(date).or_default().insert(unit, asset, rate);
                true
            }
            _ => false,
        }
    }

    /// Stored rate of `asset` in `unit`, or the reciprocal of the reverse pair.
    pub fn get_rate(&self, date: impl AsDay, asset: &str, unit: &str) -> Option<Decimal> {
        let table = self.rates.get(&date.as_day())?;
        Self::direct_rate(table, self.config.format_unit(asset), self.config.format_unit(unit))
    }

    fn direct_rate(table: &RateTable, asset: &str, unit: &str) -> Option<Decimal> {
        if let Some(rate) = table.get(unit, asset) {
            return Some(rate);
        }
        table
            .get(asset, unit)
            .and_then(|inverse| Decimal::ONE.checked_div(inverse))
    }

    /// Value of one `asset` in `unit` on `date`, chaining rates through
    /// intermediate assets when no direct rate is known.
    ///
    /// Returns `None` when the two assets are not connected on that day.
    pub fn get_price(&self, date: impl AsDay, asset: &str, unit: &str) -> Option<Decimal> {
        let date = date.as_day();
        let asset = self.config.format_unit(asset);
        let unit = self.config.format_unit(unit);
        if self.config.are_equivalent(asset, unit) {
            return Some(Decimal::ONE);
        }
        let table = self.rates.get(&date)?;
        if let Some(rate) = Self::direct_rate(table, asset, unit) {
            return stored_rate(rate);
        }

        debug!("No direct {} rate for {} on {}, searching for a path", unit, asset, date);
        let path = find_path(table, unit, asset);
        if path.is_empty() {
            return None;
        }
        let mut price = Decimal::ONE;
        for step in path.windows(2) {
            let rate = match table.get(&step[0], &step[1]) {
                Some(rate) => rate,
                None => Decimal::ONE.checked_div(table.get(&step[1], &step[0])?)?,
            };
            price = price.checked_mul(rate)?;
        }
        stored_rate(price)
    }

    /// Like [`get_price`](Self::get_price), falling back to the closest day
    /// that has a price when `date` has none.
    pub fn get_nearest(&self, date: impl AsDay, asset: &str, unit: &str) -> Option<Decimal> {
        let date = date.as_day();
        if let Some(price) = self.get_price(date, asset, unit) {
            return Some(price);
        }
        let mut candidates: Vec<NaiveDate> = self.rates.keys().copied().filter(|d| *d != date).collect();
        candidates.sort_by_key(|d| (*d - date).num_days().abs());
        candidates.into_iter().find_map(|candidate| {
            let price = self.get_price(candidate, asset, unit)?;
            debug!("Using {} price of {} from {} for {}", unit, asset, candidate, date);
            Some(price)
        })
    }

    /// Learns the rates implied by a transaction's swaps.
    pub fn sync_swap_prices(&mut self, transaction: &Transaction) -> Vec<RateEntry> {
        let summary = TradeSummary::from_transfers(&transaction.transfers);
        self.learn_trade(transaction.date.as_day(), &summary)
    }

    fn learn_trade(&mut self, date: NaiveDate, summary: &TradeSummary) -> Vec<RateEntry> {
        if summary.is_empty() {
            return Vec::new();
        }
        info!("Calculating prices on {} from swap: {}", date, summary);
        let mut learned = Vec::new();
        for rate in infer_swap_rates(summary) {
            if !self.store_rate(date, &rate.unit, &rate.asset, rate.rate) {
                warn!("Skipping unusable swap rate of {} in {}: {}", rate.asset, rate.unit, rate.rate);
                continue;
            }
            learned.push(rate);
        }
        learned
    }

    /// Price from the graph, or from the oracles if the graph has none.
    ///
    /// Fetched prices are stored and handed to the price store before this
    /// returns.
    pub async fn sync_price(&mut self, date: impl AsDay, asset: &str, unit: &str) -> Result<Option<Decimal>> {
        let date = date.as_day();
        let unit = self.config.format_unit(unit).to_string();
        if let Some(price) = self.get_price(date, asset, &unit) {
            return Ok(Some(price));
        }

        match self.query_oracles(date, asset, &unit).await? {
            Some(price) => {
                self.set_price(date, asset, &unit, price)?;
                let synced = self.get_price(date, asset, &unit);
                info!(
                    "Synced price on {}: 1 {} = {} {}",
                    date,
                    asset,
                    synced.map(format_price).unwrap_or_default(),
                    unit
                );
                self.persist().await?;
                Ok(synced)
            }
            None => {
                warn!("Could not find a {} price for {} on {}", unit, asset, date);
                Ok(None)
            }
        }
    }

    async fn query_oracles(&self, date: NaiveDate, asset: &str, unit: &str) -> Result<Option<Decimal>> {
        for oracle in &self.oracles {
            let (query_asset, query_unit, inverted) = match oracle.kind() {
                OracleKind::Amm => {
                    if !self.config.is_chain_native(asset) || !self.config.is_chain_native(unit) {
                        continue;
                    }
                    (asset, unit, false)
                }
                // History oracles index fiat by asset, so ask the other way round.
                OracleKind::History if self.config.is_fiat(asset) && !self.config.is_fiat(unit) => {
                    (unit, asset, true)
                }
                OracleKind::History => (asset, unit, false),
            };
            if !oracle.supports(date, query_asset, query_unit) {
                debug!("{} does not serve {}/{} on {}", oracle.id(), query_asset, query_unit, date);
                continue;
            }

            let fetched = self
                .retry
                .retry_once(oracle.id(), || oracle.fetch_price(date, query_asset, query_unit))
                .await;
            match fetched {
                Ok(Some(price)) if price > Decimal::ZERO => {
                    let price = if inverted {
                        Decimal::ONE.checked_div(price)
                    } else {
                        Some(price)
                    };
                    let Some(price) = price.and_then(stored_rate) else {
                        debug!("{} price of {} in {} is too small to store", oracle.id(), asset, unit);
                        continue;
                    };
                    debug!("{} priced {} at {} {} on {}", oracle.id(), asset, price, unit, date);
                    return Ok(Some(price));
                }
                Ok(_) => debug!("{} has no {} price for {} on {}", oracle.id(), query_unit, query_asset, date),
                Err(error) => self.handle_oracle_error(oracle.id(), error)?,
            }
        }
        Ok(None)
    }

    fn handle_oracle_error(&self, oracle: &str, error: MarketDataError) -> Result<()> {
        match error.retry_class() {
            RetryClass::Never => {
                debug!("{} cannot answer: {}", oracle, error);
                Ok(())
            }
            RetryClass::NextProvider => {
                warn!("{} failed, trying the next oracle: {}", oracle, error);
                Ok(())
            }
            RetryClass::WithBackoff => Err(error.into()),
        }
    }

    async fn persist(&self) -> Result<()> {
        if let Some(store) = &self.store {
            store.save(&self.to_json()).await?;
        }
        Ok(())
    }

    /// Learns swap rates from `transaction` and syncs the `unit` price of every
    /// asset it touches. Returns the prices relevant to this transaction.
    pub async fn sync_transaction(&mut self, transaction: &Transaction, unit: &str) -> Result<PricesJson> {
        let date = transaction.date.as_day();
        let mut relevant = PricesJson::new();
        for rate in self.sync_swap_prices(transaction) {
            insert_json(&mut relevant, date, &rate.unit, &rate.asset, rate.rate);
        }
        let unit = self.config.format_unit(unit).to_string();
        for asset in transaction.assets() {
            if self.config.are_equivalent(&asset, &unit) {
                continue;
            }
            if let Some(price) = self.sync_price(date, &asset, &unit).await? {
                insert_json(&mut relevant, date, &unit, &asset, price);
            }
        }
        Ok(relevant)
    }

    /// Learns the rates implied by trades recorded in `chunks`, then syncs the
    /// `unit` price of every chunk on the days it was received and disposed.
    ///
    /// A chunk counts as traded away when another chunk in the set lists it as
    /// a source, and as bought when it has sources of its own.
    pub async fn sync_chunks(&mut self, chunks: &[AssetChunk], unit: &str) -> Result<PricesJson> {
        let mut relevant = PricesJson::new();
        let spent: Vec<_> = chunks.iter().flat_map(|c| c.sources.iter().copied()).collect();

        let mut trade_dates: Vec<DateTime<Utc>> = Vec::new();
        for chunk in chunks.iter().filter(|c| c.quantity > Decimal::ZERO) {
            if let Some(disposed) = chunk.dispose_date.filter(|_| spent.contains(&chunk.index)) {
                trade_dates.push(disposed);
            }
            if !chunk.sources.is_empty() {
                trade_dates.push(chunk.receive_date);
            }
        }
        trade_dates.sort();
        trade_dates.dedup();

        for when in trade_dates {
            let mut outgoing = AssetAmounts::new();
            let mut incoming = AssetAmounts::new();
            for chunk in chunks.iter().filter(|c| c.quantity > Decimal::ZERO) {
                if chunk.dispose_date == Some(when) && spent.contains(&chunk.index) {
                    outgoing.push((chunk.asset.clone(), chunk.quantity));
                }
                if chunk.receive_date == when && !chunk.sources.is_empty() {
                    incoming.push((chunk.asset.clone(), chunk.quantity));
                }
            }
            let summary = TradeSummary::from_amounts(outgoing, incoming);
            let date = when.as_day();
            for rate in self.learn_trade(date, &summary) {
                insert_json(&mut relevant, date, &rate.unit, &rate.asset, rate.rate);
            }
        }

        let unit = self.config.format_unit(unit).to_string();
        for chunk in chunks {
            if self.config.are_equivalent(&chunk.asset, &unit) {
                continue;
            }
            let dates = [Some(chunk.receive_date), chunk.dispose_date];
            for date in dates.into_iter().flatten() {
                if let Some(price) = self.sync_price(date, &chunk.asset, &unit).await? {
                    insert_json(&mut relevant, date.as_day(), &unit, &chunk.asset, price);
                }
            }
        }
        Ok(relevant)
    }
}

/// Reads a stored rate, ignoring digits past the ones kept anyway.
fn parse_rate(raw: &str) -> Option<Decimal> {
    let text = truncate_fraction(raw, PRICE_DECIMALS as usize);
    match parse_exact_decimal(text) {
        Ok(rate) => Some(rate),
        Err(ValidationError::InexactDecimal(_)) => {
            warn!("Rounding rate {} to 28 significant digits", raw);
            parse_decimal(text).ok()
        }
        Err(_) => None,
    }
}

/// Truncated form of a rate, or `None` when nothing positive survives truncation.
fn stored_rate(rate: Decimal) -> Option<Decimal> {
    Some(truncate_price(rate)).filter(|rate| *rate > Decimal::ZERO)
}

fn insert_json(json: &mut PricesJson, date: NaiveDate, unit: &str, asset: &str, rate: Decimal) {
    json.entry(date.format("%Y-%m-%d").to_string())
        .or_default()
        .entry(unit.to_string())
        .or_default()
        .insert(asset.to_string(), format_price(rate));
}
