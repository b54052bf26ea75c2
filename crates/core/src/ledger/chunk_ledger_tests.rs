#[cfg(test)]
mod tests {
    use crate::address_book::{AddressCategory, AddressEntry, InMemoryAddressBook};
    use crate::config::ValueMachineConfig;
    use crate::errors::LedgerError;
    use crate::events::Event;
    use crate::ledger::{ChunkLedger, LedgerSnapshot};
    use crate::transactions::TransferCategory;
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    const ALICE: &str = "0x1111111111111111111111111111111111111111";
    const BOB: &str = "0x2222222222222222222222222222222222222222";
    const STRANGER: &str = "0x9999999999999999999999999999999999999999";

    fn address_book() -> InMemoryAddressBook {
        InMemoryAddressBook::new(vec![
            AddressEntry::new(ALICE, AddressCategory::SelfOwned, "alice"),
            AddressEntry::new(BOB, AddressCategory::SelfOwned, "bob"),
        ])
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, d, 0, 0, 0).unwrap()
    }

    fn deposit(ledger: &mut ChunkLedger, account: &str, asset: &str, quantity: Decimal, date: DateTime<Utc>) {
        let chunk = ledger.mint_chunk(asset, quantity, date, vec![]);
        ledger.put_chunk(chunk, account);
    }

    fn quantities(ledger: &ChunkLedger, account: &str) -> Vec<Decimal> {
        ledger.snapshot().accounts[account].iter().map(|c| c.quantity).collect()
    }

    #[test]
    fn test_partial_withdrawal_keeps_receive_date() {
        let book = address_book();
        let config = ValueMachineConfig::default();
        let mut ledger = ChunkLedger::new(&LedgerSnapshot::new(), &book, &config);
        let mut events = Vec::new();

        deposit(&mut ledger, ALICE, "TEST", dec!(100), day(1));
        let chunks = ledger.get_chunks(ALICE, "TEST", dec!(3.14), day(2), &mut events);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].quantity, dec!(3.14));
        assert_eq!(chunks[0].receive_date, day(1));
        assert_eq!(ledger.get_balance(ALICE, "TEST"), dec!(96.86));
        assert!(events.is_empty());
    }

    #[test]
    fn test_withdrawal_is_fifo() {
        let book = address_book();
        let config = ValueMachineConfig::default();
        let mut ledger = ChunkLedger::new(&LedgerSnapshot::new(), &book, &config);
        let mut events = Vec::new();

        deposit(&mut ledger, ALICE, "TEST", dec!(3), day(1));
        deposit(&mut ledger, ALICE, "TEST", dec!(5), day(2));
        deposit(&mut ledger, ALICE, "TEST", dec!(2), day(3));

        let chunks = ledger.get_chunks(ALICE, "TEST", dec!(5), day(4), &mut events);
        let taken: Vec<Decimal> = chunks.iter().map(|c| c.quantity).collect();
        assert_eq!(taken, vec![dec!(3), dec!(2)]);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[1].receive_date, day(2));
        assert_eq!(quantities(&ledger, ALICE), vec![dec!(3), dec!(2)]);
        assert_eq!(ledger.snapshot().accounts[ALICE][0].index, 1);
    }

    #[test]
    fn test_split_gives_taken_piece_a_fresh_index() {
        let book = address_book();
        let config = ValueMachineConfig::default();
        let mut ledger = ChunkLedger::new(&LedgerSnapshot::new(), &book, &config);
        let mut events = Vec::new();

        deposit(&mut ledger, ALICE, "TEST", dec!(3), day(1));
        deposit(&mut ledger, ALICE, "TEST", dec!(5), day(2));
        deposit(&mut ledger, ALICE, "TEST", dec!(2), day(3));

        let chunks = ledger.get_chunks(ALICE, "TEST", dec!(4), day(4), &mut events);
        let taken: Vec<Decimal> = chunks.iter().map(|c| c.quantity).collect();
        assert_eq!(taken, vec![dec!(3), dec!(1)]);
        assert_eq!(chunks[1].index, 3);
        assert_eq!(quantities(&ledger, ALICE), vec![dec!(4), dec!(2)]);
    }

    #[test]
    fn test_shortfall_creates_debt() {
        let book = address_book();
        let config = ValueMachineConfig::default();
        let mut ledger = ChunkLedger::new(&LedgerSnapshot::new(), &book, &config);
        let mut events = Vec::new();

        deposit(&mut ledger, ALICE, "ETH", dec!(0.5), day(1));
        let chunks = ledger.get_chunks(ALICE, "ETH", dec!(2), day(2), &mut events);

        let taken: Vec<Decimal> = chunks.iter().map(|c| c.quantity).collect();
        assert_eq!(taken, vec![dec!(0.5), dec!(1.5)]);
        assert_eq!(quantities(&ledger, ALICE), vec![dec!(-1.5)]);
        assert_eq!(ledger.get_balance(ALICE, "ETH"), dec!(-1.5));
    }

    #[test]
    fn test_withdrawing_from_debt_adds_more_debt() {
        let book = address_book();
        let config = ValueMachineConfig::default();
        let mut ledger = ChunkLedger::new(&LedgerSnapshot::new(), &book, &config);
        let mut events = Vec::new();

        ledger.get_chunks(ALICE, "ETH", dec!(1), day(1), &mut events);
        ledger.get_chunks(ALICE, "ETH", dec!(2), day(2), &mut events);
        assert_eq!(quantities(&ledger, ALICE), vec![dec!(-1), dec!(-2)]);
        assert_eq!(ledger.get_balance(ALICE, "ETH"), dec!(-3));
    }

    #[test]
    fn test_small_deposit_shrinks_debt() {
        let book = address_book();
        let config = ValueMachineConfig::default();
        let mut ledger = ChunkLedger::new(&LedgerSnapshot::new(), &book, &config);
        let mut events = Vec::new();

        ledger.get_chunks(ALICE, "ETH", dec!(1), day(1), &mut events);
        deposit(&mut ledger, ALICE, "ETH", dec!(0.4), day(2));

        assert_eq!(quantities(&ledger, ALICE), vec![dec!(-0.6)]);
        assert!(ledger.snapshot().history.is_empty());
    }

    #[test]
    fn test_exact_deposit_clears_debt() {
        let book = address_book();
        let config = ValueMachineConfig::default();
        let mut ledger = ChunkLedger::new(&LedgerSnapshot::new(), &book, &config);
        let mut events = Vec::new();

        ledger.get_chunks(ALICE, "ETH", dec!(1), day(1), &mut events);
        ledger.set_date(day(2));
        deposit(&mut ledger, ALICE, "ETH", dec!(1), day(2));

        assert!(quantities(&ledger, ALICE).is_empty());
        let archived = &ledger.snapshot().history;
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].quantity, dec!(-1));
        assert_eq!(archived[0].dispose_date, Some(day(2)));
    }

    #[test]
    fn test_large_deposit_leaves_credit() {
        let book = address_book();
        let config = ValueMachineConfig::default();
        let mut ledger = ChunkLedger::new(&LedgerSnapshot::new(), &book, &config);
        let mut events = Vec::new();

        ledger.get_chunks(ALICE, "ETH", dec!(1), day(1), &mut events);
        ledger.get_chunks(ALICE, "ETH", dec!(2), day(1), &mut events);
        deposit(&mut ledger, ALICE, "ETH", dec!(1.5), day(2));
        assert_eq!(quantities(&ledger, ALICE), vec![dec!(-1.5)]);

        deposit(&mut ledger, ALICE, "ETH", dec!(2), day(3));
        assert_eq!(quantities(&ledger, ALICE), vec![dec!(0.5)]);
        assert_eq!(ledger.snapshot().accounts[ALICE][0].receive_date, day(3));
        assert_eq!(ledger.snapshot().history.len(), 2);
    }

    #[test]
    fn test_opaque_interest_bearer_accrues_instead_of_borrowing() {
        let book = address_book();
        let config = ValueMachineConfig::default();
        let mut ledger = ChunkLedger::new(&LedgerSnapshot::new(), &book, &config);
        let mut events = Vec::new();
        let dsr = format!("Maker-DSR-{}", ALICE);

        ledger.create_account(&dsr);
        deposit(&mut ledger, &dsr, "DAI", dec!(100), day(1));
        let chunks = ledger.get_chunks(&dsr, "DAI", dec!(101.5), day(30), &mut events);

        assert_eq!(chunks.iter().map(|c| c.quantity).sum::<Decimal>(), dec!(101.5));
        assert!(quantities(&ledger, &dsr).is_empty());
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::Transfer {
                category,
                quantity,
                from,
                to,
                new_balances,
                ..
            } => {
                assert_eq!(*category, TransferCategory::Income);
                assert_eq!(*quantity, dec!(1.5));
                assert_eq!(from, "Maker-DSR");
                assert_eq!(to, &dsr);
                assert_eq!(new_balances[&dsr]["DAI"], dec!(101.5));
            }
            other => panic!("Expected interest income, got {:?}", other),
        }
    }

    #[test]
    fn test_try_get_chunks_refuses_to_borrow() {
        let book = address_book();
        let config = ValueMachineConfig::default();
        let mut ledger = ChunkLedger::new(&LedgerSnapshot::new(), &book, &config);
        let mut events = Vec::new();

        deposit(&mut ledger, ALICE, "ETH", dec!(1), day(1));
        let result = ledger.try_get_chunks(ALICE, "ETH", dec!(1.5), day(2), &mut events);
        match result {
            Err(LedgerError::InsufficientInventory {
                requested, available, ..
            }) => {
                assert_eq!(requested, dec!(1.5));
                assert_eq!(available, dec!(1));
            }
            other => panic!("Expected InsufficientInventory, got {:?}", other),
        }
        assert_eq!(ledger.get_balance(ALICE, "ETH"), dec!(1));

        let ok = ledger.try_get_chunks(ALICE, "ETH", dec!(1), day(2), &mut events).unwrap();
        assert_eq!(ok.len(), 1);
    }

    #[test]
    fn test_untracked_accounts() {
        let book = address_book();
        let config = ValueMachineConfig::default();
        let mut ledger = ChunkLedger::new(&LedgerSnapshot::new(), &book, &config);
        let mut events = Vec::new();
        ledger.set_date(day(5));

        let chunks = ledger.get_chunks(STRANGER, "ETH", dec!(2), day(5), &mut events);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].quantity, dec!(2));
        assert!(!ledger.is_tracked(STRANGER));

        ledger.put_chunk(chunks[0].clone(), STRANGER);
        assert_eq!(ledger.snapshot().history.len(), 1);
        assert_eq!(ledger.snapshot().history[0].dispose_date, Some(day(5)));
        assert!(ledger.get_accounts().is_empty());
    }

    #[test]
    fn test_secure_chunk_traces_sources() {
        let book = address_book();
        let config = ValueMachineConfig::default();
        let mut ledger = ChunkLedger::new(&LedgerSnapshot::new(), &book, &config);
        let mut events = Vec::new();

        deposit(&mut ledger, ALICE, "ETH", dec!(1), day(1));
        let spent = ledger.get_chunks(ALICE, "ETH", dec!(1), day(2), &mut events);
        let spent_index = spent[0].index;
        ledger.dispose_chunk(spent[0].clone());

        let bought = ledger.mint_chunk("UNI", dec!(50), day(2), vec![spent_index]);
        let bought_index = bought.index;
        ledger.put_chunk(bought, ALICE);
        ledger.mark_unsecured(ALICE, &[bought_index]);
        assert!(ledger.get_chunk(bought_index).unwrap().unsecured);

        let held = ledger.get_chunk(bought_index).unwrap().clone();
        let provenance = ledger.secure_chunk(&held);
        let traced: Vec<u64> = provenance.iter().map(|c| c.index).collect();
        assert_eq!(traced, vec![bought_index, spent_index]);
        assert!(!ledger.get_chunk(bought_index).unwrap().unsecured);
    }

    #[test]
    fn test_balances_and_net_worth() {
        let book = address_book();
        let config = ValueMachineConfig::default();
        let mut ledger = ChunkLedger::new(&LedgerSnapshot::new(), &book, &config);
        let mut events = Vec::new();

        deposit(&mut ledger, ALICE, "ETH", dec!(2), day(1));
        deposit(&mut ledger, ALICE, "DAI", dec!(100), day(1));
        ledger.get_chunks(BOB, "ETH", dec!(0.5), day(2), &mut events);

        let all = ledger.get_all_balances();
        assert_eq!(all[ALICE]["ETH"], dec!(2));
        assert_eq!(all[BOB]["ETH"], dec!(-0.5));

        let net = ledger.get_net_worth();
        assert_eq!(net["ETH"], dec!(1.5));
        assert_eq!(net["DAI"], dec!(100));

        let some = ledger.get_balances_of(&[ALICE, STRANGER], &["ETH"]);
        assert_eq!(some.len(), 1);
        assert_eq!(some[ALICE].len(), 1);
    }

    #[test]
    fn test_session_does_not_touch_source_snapshot() {
        let book = address_book();
        let config = ValueMachineConfig::default();
        let original = LedgerSnapshot::new();
        let mut ledger = ChunkLedger::new(&original, &book, &config);

        deposit(&mut ledger, ALICE, "ETH", dec!(1), day(1));
        ledger.touch(day(1));
        let updated = ledger.into_snapshot();

        assert!(original.accounts.is_empty());
        assert_eq!(updated.last_updated, day(1));
        assert_eq!(updated.next_chunk_index, 1);
        assert!(updated.validate().is_ok());
    }
}
