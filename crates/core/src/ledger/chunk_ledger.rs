//! Working session over a ledger snapshot.
//!
//! A [`ChunkLedger`] clones the snapshot it is opened on and mutates the copy,
//! so a failed transaction never leaves a half-applied state behind.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use rust_decimal::Decimal;

use super::chunk_model::{AssetChunk, ChunkIndex, LedgerSnapshot};
use crate::address_book::AddressBook;
use crate::config::ValueMachineConfig;
use crate::errors::LedgerError;
use crate::events::{AccountBalances, Balances, Event};
use crate::transactions::TransferCategory;
use crate::utils::decimal_utils::display_quantity;

pub struct ChunkLedger<'a> {
    snapshot: LedgerSnapshot,
    address_book: &'a dyn AddressBook,
    config: &'a ValueMachineConfig,
    date: DateTime<Utc>,
}

impl<'a> ChunkLedger<'a> {
    pub fn new(
        snapshot: &LedgerSnapshot,
        address_book: &'a dyn AddressBook,
        config: &'a ValueMachineConfig,
    ) -> Self {
        Self {
            snapshot: snapshot.clone(),
            address_book,
            config,
            date: snapshot.last_updated,
        }
    }

    /// Date stamped on chunks disposed from now on.
    pub fn set_date(&mut self, date: DateTime<Utc>) {
        self.date = date;
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn snapshot(&self) -> &LedgerSnapshot {
        &self.snapshot
    }

    /// Records that the ledger is up to date as of `date`.
    pub fn touch(&mut self, date: DateTime<Utc>) {
        self.snapshot.last_updated = date;
    }

    pub fn into_snapshot(self) -> LedgerSnapshot {
        self.snapshot
    }

    /// Whether inventory is kept for this account.
    pub fn is_tracked(&self, account: &str) -> bool {
        self.snapshot.accounts.contains_key(account) || self.address_book.is_self(account)
    }

    pub fn create_account(&mut self, account: &str) {
        if !self.snapshot.accounts.contains_key(account) {
            debug!("Tracking new account {}", account);
            self.snapshot.accounts.insert(account.to_string(), Vec::new());
        }
    }

    pub fn get_accounts(&self) -> Vec<String> {
        self.snapshot.accounts.keys().cloned().collect()
    }

    fn inventory_mut(&mut self, account: &str) -> &mut Vec<AssetChunk> {
        self.snapshot.accounts.entry(account.to_string()).or_default()
    }

    /// Creates a chunk with the next free index. The chunk is not placed
    /// anywhere yet.
    pub fn mint_chunk(
        &mut self,
        asset: &str,
        quantity: Decimal,
        receive_date: DateTime<Utc>,
        sources: Vec<ChunkIndex>,
    ) -> AssetChunk {
        let index = self.snapshot.next_chunk_index;
        self.snapshot.next_chunk_index += 1;
        AssetChunk {
            index,
            asset: asset.to_string(),
            quantity,
            receive_date,
            dispose_date: None,
            sources,
            unsecured: false,
        }
    }

    /// Archives a chunk that left the ledger.
    pub fn dispose_chunk(&mut self, mut chunk: AssetChunk) {
        if chunk.dispose_date.is_none() {
            chunk.dispose_date = Some(self.date);
        }
        debug!(
            "Disposing chunk #{} of {} {}",
            chunk.index, chunk.quantity, chunk.asset
        );
        self.snapshot.history.push(chunk);
    }

    /// Gives a chunk to an account.
    ///
    /// Untracked accounts dispose of what they receive. Positive chunks first
    /// pay down any debt the account owes in that asset, oldest debt first.
    pub fn put_chunk(&mut self, chunk: AssetChunk, account: &str) {
        if !self.is_tracked(account) {
            self.dispose_chunk(chunk);
            return;
        }
        if chunk.is_debt() {
            self.inventory_mut(account).push(chunk);
            return;
        }

        let asset = chunk.asset.clone();
        let mut incoming = chunk.quantity;
        let mut repaid: Vec<AssetChunk> = Vec::new();
        let inventory = self.inventory_mut(account);
        while incoming > Decimal::ZERO {
            let Some(position) = inventory.iter().position(|c| c.asset == asset && c.is_debt()) else {
                break;
            };
            let owed = -inventory[position].quantity;
            if incoming >= owed {
                incoming -= owed;
                repaid.push(inventory.remove(position));
            } else {
                let remaining = inventory[position].with_quantity(incoming - owed);
                inventory[position] = remaining;
                incoming = Decimal::ZERO;
            }
        }
        if incoming > Decimal::ZERO {
            inventory.push(chunk.with_quantity(incoming));
        }

        for debt in repaid {
            debug!("{} repaid debt chunk #{} in {}", account, debt.index, asset);
            self.dispose_chunk(debt);
        }
    }

    /// Removes the oldest chunk of `asset` from the account.
    fn take_oldest(&mut self, account: &str, asset: &str) -> Option<(usize, AssetChunk)> {
        let inventory = self.snapshot.accounts.get_mut(account)?;
        let position = inventory.iter().position(|c| c.asset == asset)?;
        Some((position, inventory.remove(position)))
    }

    fn restore(&mut self, account: &str, position: usize, chunk: AssetChunk) {
        let inventory = self.inventory_mut(account);
        let position = position.min(inventory.len());
        inventory.insert(position, chunk);
    }

    /// Withdraws `quantity` of `asset` from an account, oldest chunks first.
    ///
    /// The last chunk is split if only part of it is needed. A shortfall is
    /// covered by minting the missing amount and recording matching debt in
    /// the account, except for opaque interest bearers where the shortfall is
    /// treated as accrued interest and reported through `events`.
    pub fn get_chunks(
        &mut self,
        account: &str,
        asset: &str,
        quantity: Decimal,
        date: DateTime<Utc>,
        events: &mut Vec<Event>,
    ) -> Vec<AssetChunk> {
        if quantity <= Decimal::ZERO {
            return Vec::new();
        }
        if !self.is_tracked(account) {
            debug!("{} {} appeared from untracked account {}", quantity, asset, account);
            return vec![self.mint_chunk(asset, quantity, date, Vec::new())];
        }
        self.create_account(account);

        let starting_balance = self.get_balance(account, asset);
        let mut output = Vec::new();
        let mut togo = quantity;
        while togo > Decimal::ZERO {
            match self.take_oldest(account, asset) {
                None => {
                    output.push(self.cover_shortfall(account, asset, togo, starting_balance, date, events));
                    togo = Decimal::ZERO;
                }
                Some((position, chunk)) if chunk.is_debt() => {
                    self.restore(account, position, chunk);
                    output.push(self.cover_shortfall(account, asset, togo, starting_balance, date, events));
                    togo = Decimal::ZERO;
                }
                Some((position, chunk)) if chunk.quantity > togo => {
                    let mut taken = self.mint_chunk(asset, togo, chunk.receive_date, chunk.sources.clone());
                    taken.unsecured = chunk.unsecured;
                    let remainder = chunk.with_quantity(chunk.quantity - togo);
                    self.restore(account, position, remainder);
                    output.push(taken);
                    togo = Decimal::ZERO;
                }
                Some((_, chunk)) => {
                    togo -= chunk.quantity;
                    output.push(chunk);
                }
            }
        }
        output
    }

    fn cover_shortfall(
        &mut self,
        account: &str,
        asset: &str,
        shortfall: Decimal,
        starting_balance: Decimal,
        date: DateTime<Utc>,
        events: &mut Vec<Event>,
    ) -> AssetChunk {
        if let Some(source) = self.config.opaque_interest_source(account).map(str::to_string) {
            let interest = self.mint_chunk(asset, shortfall, date, Vec::new());
            debug!(
                "{} accrued {} {} of interest from {}",
                account, shortfall, asset, source
            );
            let balances = |quantity: Decimal| -> AccountBalances {
                BTreeMap::from([(account.to_string(), Balances::from([(asset.to_string(), quantity)]))])
            };
            events.push(Event::Transfer {
                date,
                description: format!(
                    "{} received {} {} of interest from {}",
                    self.address_book.get_name(account),
                    display_quantity(shortfall),
                    asset,
                    source
                ),
                category: TransferCategory::Income,
                asset: asset.to_string(),
                quantity: shortfall,
                from: source,
                to: account.to_string(),
                chunks: vec![interest.index],
                tags: Vec::new(),
                old_balances: balances(starting_balance),
                new_balances: balances(starting_balance + shortfall),
            });
            return interest;
        }

        warn!(
            "{} is short {} {}, recording it as debt",
            account, shortfall, asset
        );
        let loan = self.mint_chunk(asset, shortfall, date, Vec::new());
        let debt = self.mint_chunk(asset, -shortfall, date, Vec::new());
        self.inventory_mut(account).push(debt);
        loan
    }

    /// Sum of the positive chunks of `asset` held by the account.
    pub fn get_available(&self, account: &str, asset: &str) -> Decimal {
        self.snapshot
            .accounts
            .get(account)
            .map(|chunks| {
                chunks
                    .iter()
                    .filter(|c| c.asset == asset && !c.is_debt())
                    .map(|c| c.quantity)
                    .sum()
            })
            .unwrap_or(Decimal::ZERO)
    }

    /// Like [`get_chunks`](Self::get_chunks) but refuses to create debt.
    ///
    /// Opaque interest bearers and untracked accounts never run short, so
    /// they are passed straight through.
    pub fn try_get_chunks(
        &mut self,
        account: &str,
        asset: &str,
        quantity: Decimal,
        date: DateTime<Utc>,
        events: &mut Vec<Event>,
    ) -> Result<Vec<AssetChunk>, LedgerError> {
        if self.is_tracked(account) && !self.config.is_opaque_interest_bearer(account) {
            let available = self.get_available(account, asset);
            if available < quantity {
                return Err(LedgerError::InsufficientInventory {
                    account: account.to_string(),
                    asset: asset.to_string(),
                    requested: quantity,
                    available,
                });
            }
        }
        Ok(self.get_chunks(account, asset, quantity, date, events))
    }

    fn find_archived(&self, index: ChunkIndex) -> Option<&AssetChunk> {
        self.snapshot.history.iter().find(|c| c.index == index)
    }

    /// Looks a chunk up by index, held chunks first.
    pub fn get_chunk(&self, index: ChunkIndex) -> Option<&AssetChunk> {
        self.snapshot
            .accounts
            .values()
            .flatten()
            .find(|c| c.index == index)
            .or_else(|| self.find_archived(index))
    }

    /// Traces the provenance of a chunk through the archive and marks the
    /// held copy as secured. Returns the chunk followed by every ancestor
    /// found, depth first.
    pub fn secure_chunk(&mut self, chunk: &AssetChunk) -> Vec<AssetChunk> {
        let mut provenance = vec![chunk.clone()];
        let mut visited: HashSet<ChunkIndex> = HashSet::from([chunk.index]);
        let mut pending: Vec<ChunkIndex> = chunk.sources.iter().rev().copied().collect();
        while let Some(index) = pending.pop() {
            if !visited.insert(index) {
                continue;
            }
            match self.find_archived(index) {
                Some(source) => {
                    pending.extend(source.sources.iter().rev().copied());
                    provenance.push(source.clone());
                }
                None => debug!("Source chunk #{} of #{} is not archived", index, chunk.index),
            }
        }

        for inventory in self.snapshot.accounts.values_mut() {
            if let Some(held) = inventory.iter_mut().find(|c| c.index == chunk.index) {
                if held.unsecured {
                    *held = AssetChunk {
                        unsecured: false,
                        ..held.clone()
                    };
                }
            }
        }
        provenance
    }

    /// Flags chunks held by the account as untraced, e.g. after they crossed
    /// into another jurisdiction.
    pub fn mark_unsecured(&mut self, account: &str, indexes: &[ChunkIndex]) {
        if let Some(inventory) = self.snapshot.accounts.get_mut(account) {
            for chunk in inventory.iter_mut().filter(|c| indexes.contains(&c.index)) {
                chunk.unsecured = true;
            }
        }
    }

    pub fn get_balance(&self, account: &str, asset: &str) -> Decimal {
        self.snapshot.balance(account, asset)
    }

    /// Per-account balances of every asset held or owed.
    pub fn get_all_balances(&self) -> AccountBalances {
        let mut all = AccountBalances::new();
        for (account, chunks) in &self.snapshot.accounts {
            let balances = all.entry(account.clone()).or_default();
            for chunk in chunks {
                *balances.entry(chunk.asset.clone()).or_insert(Decimal::ZERO) += chunk.quantity;
            }
        }
        all
    }

    /// Balances of the given accounts restricted to the given assets.
    /// Untracked accounts are left out.
    pub fn get_balances_of(&self, accounts: &[&str], assets: &[&str]) -> AccountBalances {
        let mut selected = AccountBalances::new();
        for account in accounts {
            if !self.is_tracked(account) {
                continue;
            }
            let balances = selected.entry(account.to_string()).or_default();
            for asset in assets {
                balances.insert(asset.to_string(), self.get_balance(account, asset));
            }
        }
        selected
    }

    /// Sum over all accounts, netting debt against holdings.
    pub fn get_net_worth(&self) -> Balances {
        let mut net = Balances::new();
        for chunk in self.snapshot.accounts.values().flatten() {
            *net.entry(chunk.asset.clone()).or_insert(Decimal::ZERO) += chunk.quantity;
        }
        net.retain(|_, quantity| !quantity.is_zero());
        net
    }
}
