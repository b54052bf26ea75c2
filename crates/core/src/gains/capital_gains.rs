use chrono::{DateTime, Utc};
use log::{debug, info};
use rust_decimal::Decimal;

use super::gains_model::CapitalGain;
use crate::constants::LONG_TERM_HOLDING_DAYS;
use crate::errors::{PriceError, Result};
use crate::ledger::AssetChunk;
use crate::prices::PriceResolver;
use crate::utils::time_utils::AsDay;

/// Realized gains of every disposed chunk in `history`, valued in `unit`.
///
/// Debt, chunks still held, and chunks of the unit itself are skipped. A
/// chunk whose price is unknown on either end fails the whole derivation
/// rather than being reported at a made-up value.
pub fn derive_capital_gains(
    history: &[AssetChunk],
    resolver: &PriceResolver,
    unit: &str,
) -> Result<Vec<CapitalGain>> {
    let unit = resolver.config().format_unit(unit).to_string();
    let mut gains = Vec::new();
    for chunk in history {
        let Some(dispose_date) = chunk.dispose_date else {
            continue;
        };
        if chunk.is_debt() || resolver.config().are_equivalent(&chunk.asset, &unit) {
            continue;
        }

        let price_on = |date: DateTime<Utc>| {
            resolver
                .get_price(date, &chunk.asset, &unit)
                .ok_or_else(|| PriceError::MissingPrice {
                    date: date.as_day(),
                    asset: chunk.asset.clone(),
                    unit: unit.clone(),
                })
        };
        let cost = chunk.quantity * price_on(chunk.receive_date)?;
        let proceeds = chunk.quantity * price_on(dispose_date)?;
        let held_days = (dispose_date - chunk.receive_date).num_days();

        debug!(
            "Chunk #{} of {} {}: cost {} proceeds {} {}",
            chunk.index, chunk.quantity, chunk.asset, cost, proceeds, unit
        );
        gains.push(CapitalGain {
            chunk: chunk.index,
            asset: chunk.asset.clone(),
            quantity: chunk.quantity,
            unit: unit.clone(),
            receive_date: chunk.receive_date,
            dispose_date,
            cost,
            proceeds,
            gain: proceeds - cost,
            long_term: held_days > LONG_TERM_HOLDING_DAYS,
        });
    }

    gains.sort_by_key(|g| (g.dispose_date, g.chunk));
    let total: Decimal = gains.iter().map(|g| g.gain).sum();
    info!("Derived {} capital gains totalling {} {}", gains.len(), total, unit);
    Ok(gains)
}
