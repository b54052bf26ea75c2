use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use rust_decimal::Decimal;

use crate::address_book::{is_hex_address, AddressBook};
use crate::config::ValueMachineConfig;
use crate::errors::{LedgerError, Result, ValidationError};
use crate::events::{AccountBalances, Balances, Event, EventSink, NoOpEventSink};
use crate::ledger::{AssetChunk, ChunkIndex, ChunkLedger, LedgerSnapshot};
use crate::transactions::{TradeShape, TradeSummary, Transaction, Transfer, TransferCategory};
use crate::utils::decimal_utils::display_quantity;

/// How a withdrawal reacts to missing inventory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Withdrawal {
    /// Fail with `InsufficientInventory` so the transfer can be deferred.
    Strict,
    /// Cover any shortfall with debt.
    AllowDebt,
}

/// Applies transactions to ledger snapshots.
///
/// Each call works on a copy of the given snapshot and returns the updated
/// copy together with the events it produced. On error the input snapshot is
/// untouched and the partially updated copy is dropped.
#[derive(Clone)]
pub struct TransactionExecutor {
    address_book: Arc<dyn AddressBook>,
    config: Arc<ValueMachineConfig>,
    event_sink: Arc<dyn EventSink>,
}

impl TransactionExecutor {
    pub fn new(address_book: Arc<dyn AddressBook>, config: Arc<ValueMachineConfig>) -> Self {
        Self {
            address_book,
            config,
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Events of every successfully executed transaction are also handed to
    /// `sink`.
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    pub fn execute(
        &self,
        snapshot: &LedgerSnapshot,
        transaction: &Transaction,
    ) -> Result<(LedgerSnapshot, Vec<Event>)> {
        debug!(
            "Processing transaction from {}: {}",
            transaction.date, transaction.description
        );

        let transfers = transaction.sorted_transfers();
        for transfer in &transfers {
            if transfer.quantity < Decimal::ZERO {
                return Err(ValidationError::InvalidInput(format!(
                    "negative quantity {} {} in transfer #{}",
                    transfer.quantity, transfer.asset, transfer.index
                ))
                .into());
            }
        }

        let mut ledger = ChunkLedger::new(snapshot, self.address_book.as_ref(), self.config.as_ref());
        ledger.set_date(transaction.date);
        let mut events: Vec<Event> = Vec::new();

        for transfer in transfers.iter().filter(|t| {
            matches!(t.category, TransferCategory::Deposit | TransferCategory::Internal)
        }) {
            ledger.create_account(&transfer.to);
        }

        let (swaps, mut simple): (Vec<&Transfer>, Vec<&Transfer>) =
            transfers.iter().copied().partition(|t| t.category.is_swap());
        let swaps_out: Vec<&Transfer> = swaps
            .iter()
            .copied()
            .filter(|t| t.category == TransferCategory::SwapOut)
            .collect();
        let swaps_in: Vec<&Transfer> = swaps
            .iter()
            .copied()
            .filter(|t| t.category == TransferCategory::SwapIn)
            .collect();

        let mut retry_queue: Vec<&Transfer> = Vec::new();
        if !swaps_out.is_empty() && !swaps_in.is_empty() {
            let summary = TradeSummary::from_swaps(&swaps_out, &swaps_in);
            match summary.shape() {
                TradeShape::Unsupported { outputs, inputs } => {
                    warn!(
                        "Unsupported trade of {} assets for {} assets, deferring its transfers",
                        outputs, inputs
                    );
                    retry_queue.extend(swaps.iter().copied());
                }
                TradeShape::Empty => {
                    debug!("Swaps cancel each other out, nothing to trade");
                }
                _ => self.execute_trade(&mut ledger, transaction, &swaps_out, &swaps_in, &summary, &mut events)?,
            }
        } else if !swaps.is_empty() {
            warn!(
                "Found {} swap transfers without a matching side, treating them as plain transfers",
                swaps.len()
            );
            simple.extend(swaps.iter().copied());
            simple.sort_by_key(|t| t.index);
        }

        for transfer in simple {
            match self.execute_transfer(&mut ledger, transaction, transfer, Withdrawal::Strict, &mut events) {
                Ok(()) => {}
                Err(e) if e.is_recoverable() => {
                    debug!("Deferring transfer #{}: {}", transfer.index, e);
                    retry_queue.push(transfer);
                }
                Err(e) => return Err(e),
            }
        }

        for transfer in retry_queue {
            debug!(
                "Retrying {} of {} {}",
                transfer.category, transfer.quantity, transfer.asset
            );
            self.execute_transfer(&mut ledger, transaction, transfer, Withdrawal::AllowDebt, &mut events)?;
        }

        ledger.touch(transaction.date);
        self.event_sink.emit_batch(events.clone());
        Ok((ledger.into_snapshot(), events))
    }

    #[allow(clippy::too_many_arguments)]
    fn withdraw(
        &self,
        ledger: &mut ChunkLedger,
        account: &str,
        asset: &str,
        quantity: Decimal,
        date: DateTime<Utc>,
        mode: Withdrawal,
        events: &mut Vec<Event>,
    ) -> Result<Vec<AssetChunk>> {
        let chunks = match mode {
            Withdrawal::Strict => ledger.try_get_chunks(account, asset, quantity, date, events)?,
            Withdrawal::AllowDebt => ledger.get_chunks(account, asset, quantity, date, events),
        };
        if let Some(debt) = chunks.iter().find(|c| c.is_debt()) {
            return Err(LedgerError::UnexpectedDebt {
                account: account.to_string(),
                asset: debt.asset.clone(),
                quantity: debt.quantity,
                index: debt.index,
            }
            .into());
        }
        Ok(chunks)
    }

    fn execute_transfer(
        &self,
        ledger: &mut ChunkLedger,
        transaction: &Transaction,
        transfer: &Transfer,
        mode: Withdrawal,
        events: &mut Vec<Event>,
    ) -> Result<()> {
        let Transfer {
            asset,
            quantity,
            from,
            to,
            category,
            ..
        } = transfer;
        let quantity = *quantity;
        if quantity.is_zero() {
            warn!("Skipping zero-quantity {} of {}", category, asset);
            return Ok(());
        }

        let accounts = [from.as_str(), to.as_str()];
        let old_balances = ledger.get_balances_of(&accounts, &[asset.as_str()]);
        let date = transaction.date;

        let chunks: Vec<AssetChunk> = if category.mints() {
            let chunk = ledger.mint_chunk(asset, quantity, date, Vec::new());
            ledger.put_chunk(chunk.clone(), to);
            vec![chunk]
        } else if category.burns() {
            let chunks = self.withdraw(ledger, from, asset, quantity, date, mode, events)?;
            for chunk in &chunks {
                ledger.dispose_chunk(chunk.clone());
            }
            chunks
        } else {
            let chunks = self.withdraw(ledger, from, asset, quantity, date, mode, events)?;
            for chunk in &chunks {
                ledger.put_chunk(chunk.clone(), to);
            }
            chunks
        };
        let moved: Vec<ChunkIndex> = chunks.iter().map(|c| c.index).collect();

        // Noise changes the ledger but is never reported.
        if self.is_noise(transfer) {
            return Ok(());
        }
        events.push(Event::Transfer {
            date,
            description: self.describe_transfer(transfer),
            category: *category,
            asset: asset.clone(),
            quantity,
            from: from.clone(),
            to: to.clone(),
            chunks: moved,
            tags: transaction.tags.clone(),
            old_balances: old_balances.clone(),
            new_balances: ledger.get_balances_of(&accounts, &[asset.as_str()]),
        });

        if let Some(event) =
            self.jurisdiction_change(ledger, transaction, asset, quantity, from, to, &chunks, old_balances)
        {
            events.push(event);
        }
        Ok(())
    }

    fn execute_trade(
        &self,
        ledger: &mut ChunkLedger,
        transaction: &Transaction,
        swaps_out: &[&Transfer],
        swaps_in: &[&Transfer],
        summary: &TradeSummary,
        events: &mut Vec<Event>,
    ) -> Result<()> {
        let first_in = swaps_in[0];
        let first_out = swaps_out[0];
        let account = if first_in.to.is_empty() {
            first_out.from.as_str()
        } else {
            first_in.to.as_str()
        };
        let counterparty = if first_out.to.is_empty() {
            first_in.from.as_str()
        } else {
            first_out.to.as_str()
        };
        if !first_out.from.is_empty() && first_out.from != account {
            warn!(
                "Trade beneficiary is ambiguous: swaps in go to {} but swaps out come from {}, booking it to {}",
                first_in.to, first_out.from, account
            );
        }

        let date = transaction.date;
        let assets: Vec<&str> = summary
            .outputs
            .iter()
            .chain(summary.inputs.iter())
            .map(|(asset, _)| asset.as_str())
            .collect();
        let old_balances = ledger.get_balances_of(&[account], &assets);

        let mut spent: Vec<ChunkIndex> = Vec::new();
        for (asset, quantity) in &summary.outputs {
            let chunks = self.withdraw(ledger, account, asset, *quantity, date, Withdrawal::AllowDebt, events)?;
            for chunk in chunks {
                spent.push(chunk.index);
                ledger.put_chunk(chunk, counterparty);
            }
        }

        let mut received: Vec<AssetChunk> = Vec::new();
        for (asset, quantity) in &summary.inputs {
            let chunk = ledger.mint_chunk(asset, *quantity, date, spent.clone());
            ledger.put_chunk(chunk.clone(), account);
            received.push(chunk);
        }

        events.push(Event::Trade {
            date,
            description: summary.to_string(),
            account: account.to_string(),
            counterparty: counterparty.to_string(),
            outputs: summary.outputs.iter().cloned().collect::<Balances>(),
            inputs: summary.inputs.iter().cloned().collect::<Balances>(),
            spent_chunks: spent,
            received_chunks: received.iter().map(|c| c.index).collect(),
            tags: transaction.tags.clone(),
            old_balances: old_balances.clone(),
            new_balances: ledger.get_balances_of(&[account], &assets),
        });

        for chunk in &received {
            let in_balances = ledger.get_balances_of(&[account], &[chunk.asset.as_str()]);
            if let Some(event) = self.jurisdiction_change(
                ledger,
                transaction,
                &chunk.asset,
                chunk.quantity,
                counterparty,
                account,
                std::slice::from_ref(chunk),
                in_balances,
            ) {
                events.push(event);
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn jurisdiction_change(
        &self,
        ledger: &mut ChunkLedger,
        transaction: &Transaction,
        asset: &str,
        quantity: Decimal,
        from: &str,
        to: &str,
        chunks: &[AssetChunk],
        old_balances: AccountBalances,
    ) -> Option<Event> {
        let old_jurisdiction = self.address_book.get_jurisdiction(from);
        let new_jurisdiction = self.address_book.get_jurisdiction(to);
        if old_jurisdiction == new_jurisdiction {
            return None;
        }

        let moved_chunks: Vec<ChunkIndex> = chunks.iter().map(|c| c.index).collect();
        let insecure_chunks: Vec<ChunkIndex> = chunks.iter().filter(|c| c.unsecured).map(|c| c.index).collect();
        if !insecure_chunks.is_empty() {
            warn!(
                "{} chunks moving from {} to {} were never secured",
                insecure_chunks.len(),
                old_jurisdiction,
                new_jurisdiction
            );
        }
        ledger.mark_unsecured(to, &moved_chunks);

        Some(Event::JurisdictionChange {
            date: transaction.date,
            description: format!(
                "{} {} moved jurisdictions from {} to {}",
                display_quantity(quantity),
                asset,
                old_jurisdiction,
                new_jurisdiction
            ),
            asset: asset.to_string(),
            quantity,
            from: from.to_string(),
            to: to.to_string(),
            old_jurisdiction,
            new_jurisdiction,
            moved_chunks,
            insecure_chunks,
            tags: transaction.tags.clone(),
            old_balances,
            new_balances: ledger.get_balances_of(&[from, to], &[asset]),
        })
    }

    /// Transfers reported too often to be worth an event: network fees and
    /// shuffles between two plain addresses.
    fn is_noise(&self, transfer: &Transfer) -> bool {
        match transfer.category {
            TransferCategory::Expense => transfer.fee || self.config.is_fee_sink(&transfer.to),
            TransferCategory::Internal => is_hex_address(&transfer.from) && is_hex_address(&transfer.to),
            _ => false,
        }
    }

    fn describe_transfer(&self, transfer: &Transfer) -> String {
        let mut description = format!(
            "{} of {} {}",
            transfer.category,
            display_quantity(transfer.quantity),
            transfer.asset
        );
        let category = transfer.category;
        if category.burns() || category.moves() {
            description.push_str(&format!(" from {}", self.address_book.get_name(&transfer.from)));
        }
        if category.mints() || category.moves() {
            description.push_str(&format!(" to {}", self.address_book.get_name(&transfer.to)));
        }
        description
    }
}
