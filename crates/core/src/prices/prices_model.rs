use std::collections::BTreeMap;

use rust_decimal::Decimal;

/// Serialized price table: `date -> unit -> asset -> rate`, where one `asset`
/// is worth `rate` of `unit` on that calendar day (`YYYY-MM-DD`).
pub type PricesJson = BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>;

/// One stored exchange rate: 1 `asset` = `rate` `unit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateEntry {
    pub unit: String,
    pub asset: String,
    pub rate: Decimal,
}

impl RateEntry {
    pub fn new(unit: &str, asset: &str, rate: Decimal) -> Self {
        Self {
            unit: unit.to_string(),
            asset: asset.to_string(),
            rate,
        }
    }
}

/// Rates known on a single day, kept in the order they were learned.
///
/// Only the stored direction of a pair is kept; readers invert as needed.
/// Insertion order drives neighbor discovery in [`find_path`], so replaying
/// the same merges always yields the same paths.
///
/// [`find_path`]: super::find_path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateTable {
    entries: Vec<RateEntry>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored rate of `asset` in `unit`, without trying the reverse pair.
    pub fn get(&self, unit: &str, asset: &str) -> Option<Decimal> {
        self.entries
            .iter()
            .find(|e| e.unit == unit && e.asset == asset)
            .map(|e| e.rate)
    }

    /// Adds or replaces a rate in place. Returns `true` if the table changed.
    pub fn insert(&mut self, unit: &str, asset: &str, rate: Decimal) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|e| e.unit == unit && e.asset == asset)
        {
            Some(existing) if existing.rate == rate => false,
            Some(existing) => {
                existing.rate = rate;
                true
            }
            None => {
                self.entries.push(RateEntry::new(unit, asset, rate));
                true
            }
        }
    }

    /// Assets sharing a rate with `node`, deduplicated in discovery order.
    pub fn neighbors(&self, node: &str) -> Vec<&str> {
        let mut found: Vec<&str> = Vec::new();
        for entry in &self.entries {
            let neighbor = if entry.asset == node {
                entry.unit.as_str()
            } else if entry.unit == node {
                entry.asset.as_str()
            } else {
                continue;
            };
            if !found.contains(&neighbor) {
                found.push(neighbor);
            }
        }
        found
    }

    /// Every asset appearing on either side of a rate.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .flat_map(|e| [e.asset.as_str(), e.unit.as_str()])
    }

    pub fn entries(&self) -> &[RateEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
