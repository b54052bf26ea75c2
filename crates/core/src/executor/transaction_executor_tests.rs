#[cfg(test)]
mod tests {
    use crate::address_book::{AddressCategory, AddressEntry, InMemoryAddressBook};
    use crate::config::ValueMachineConfig;
    use crate::errors::Error;
    use crate::events::{CollectingEventSink, Event};
    use crate::executor::TransactionExecutor;
    use crate::ledger::LedgerSnapshot;
    use crate::transactions::{Transaction, Transfer, TransferCategory};
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    use TransferCategory::{Deposit, Expense, Income, Internal, SwapIn, SwapOut, Withdraw};

    const ALICE: &str = "0x1111111111111111111111111111111111111111";
    const BOB: &str = "0x2222222222222222222222222222222222222222";
    const UNISWAP: &str = "0x7a250d5630b4cf539739df2c5dacb4c659f2488d";
    const EMPLOYER: &str = "0x3333333333333333333333333333333333333333";
    const SHOP: &str = "0x4444444444444444444444444444444444444444";

    fn executor() -> TransactionExecutor {
        let book = InMemoryAddressBook::new(vec![
            AddressEntry::new(ALICE, AddressCategory::SelfOwned, "alice"),
            AddressEntry::new(BOB, AddressCategory::SelfOwned, "bob"),
            AddressEntry::new(UNISWAP, AddressCategory::Defi, "UniswapRouter"),
        ]);
        TransactionExecutor::new(Arc::new(book), Arc::new(ValueMachineConfig::default()))
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 3, d, 10, 0, 0).unwrap()
    }

    fn transfer(category: TransferCategory, asset: &str, quantity: Decimal, from: &str, to: &str, index: u32) -> Transfer {
        Transfer::new(category, asset, quantity, from, to).with_index(index)
    }

    fn funded(executor: &TransactionExecutor, asset: &str, quantity: Decimal) -> LedgerSnapshot {
        let income = Transaction::new(day(1), vec![transfer(Income, asset, quantity, EMPLOYER, ALICE, 0)]);
        executor.execute(&LedgerSnapshot::new(), &income).unwrap().0
    }

    fn chunk_quantities(snapshot: &LedgerSnapshot, account: &str, asset: &str) -> Vec<Decimal> {
        snapshot.accounts[account]
            .iter()
            .filter(|c| c.asset == asset)
            .map(|c| c.quantity)
            .collect()
    }

    fn transfer_categories(events: &[Event]) -> Vec<TransferCategory> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::Transfer { category, .. } => Some(*category),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_trade_with_shortfall_creates_debt_then_income_repays_it() {
        let executor = executor();
        let start = funded(&executor, "ETH", dec!(2.00));

        let trade = Transaction::new(
            day(2),
            vec![
                transfer(Expense, "ETH", dec!(0.1), ALICE, "Ethereum", 0).as_fee(),
                transfer(SwapOut, "ETH", dec!(3.0), ALICE, UNISWAP, 1),
                transfer(SwapIn, "UNI", dec!(50), UNISWAP, ALICE, 2),
            ],
        );
        let (after_trade, events) = executor.execute(&start, &trade).unwrap();

        match &events[0] {
            Event::Trade {
                account,
                outputs,
                inputs,
                new_balances,
                ..
            } => {
                assert_eq!(account, ALICE);
                assert_eq!(outputs["ETH"], dec!(3.0));
                assert_eq!(inputs["UNI"], dec!(50));
                assert_eq!(new_balances[ALICE]["ETH"], dec!(-1.0));
                assert_eq!(new_balances[ALICE]["UNI"], dec!(50));
            }
            other => panic!("Expected a trade, got {:?}", other),
        }
        assert!(transfer_categories(&events).is_empty(), "fees are not reported");
        assert_eq!(events.len(), 1, "fee to Ethereum is not a jurisdiction change");
        assert_eq!(chunk_quantities(&after_trade, ALICE, "ETH"), vec![dec!(-1.0), dec!(-0.1)]);
        assert_eq!(after_trade.balance(ALICE, "UNI"), dec!(50));
        assert_eq!(after_trade.last_updated, day(2));

        let payday = Transaction::new(day(3), vec![transfer(Income, "ETH", dec!(1.1), EMPLOYER, ALICE, 0)]);
        let (repaid, _) = executor.execute(&after_trade, &payday).unwrap();
        assert!(chunk_quantities(&repaid, ALICE, "ETH").is_empty());
        assert_eq!(repaid.balance(ALICE, "ETH"), Decimal::ZERO);
        assert!(repaid.validate().is_ok());
    }

    #[test]
    fn test_traded_chunks_point_at_what_was_spent() {
        let executor = executor();
        let start = funded(&executor, "ETH", dec!(1));
        let trade = Transaction::new(
            day(2),
            vec![
                transfer(SwapOut, "ETH", dec!(1), ALICE, UNISWAP, 0),
                transfer(SwapIn, "DAI", dec!(1500), UNISWAP, ALICE, 1),
            ],
        );
        let (after, events) = executor.execute(&start, &trade).unwrap();

        let spent = match &events[0] {
            Event::Trade { spent_chunks, .. } => spent_chunks.clone(),
            other => panic!("Expected a trade, got {:?}", other),
        };
        let dai = &after.accounts[ALICE][0];
        assert_eq!(dai.asset, "DAI");
        assert_eq!(dai.sources, spent);
        assert!(after.history.iter().any(|c| spent.contains(&c.index)));
    }

    #[test]
    fn test_refund_is_netted_out_of_trade() {
        let executor = executor();
        let start = funded(&executor, "ETH", dec!(1));
        let trade = Transaction::new(
            day(2),
            vec![
                transfer(SwapOut, "ETH", dec!(1), ALICE, UNISWAP, 0),
                transfer(SwapIn, "ETH", dec!(0.2), UNISWAP, ALICE, 1),
                transfer(SwapIn, "DAI", dec!(100), UNISWAP, ALICE, 2),
            ],
        );
        let (after, events) = executor.execute(&start, &trade).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(after.balance(ALICE, "ETH"), dec!(0.2));
        assert_eq!(after.balance(ALICE, "DAI"), dec!(100));
        assert_eq!(events[0].description(), "Traded 0.8 ETH for 100.0 DAI");
    }

    #[test]
    fn test_expense_before_funding_income_is_retried() {
        let executor = executor();
        let tx = Transaction::new(
            day(2),
            vec![
                transfer(Expense, "DAI", dec!(10), ALICE, SHOP, 0),
                transfer(Income, "DAI", dec!(10), EMPLOYER, ALICE, 1),
            ],
        );
        let (after, events) = executor.execute(&LedgerSnapshot::new(), &tx).unwrap();

        assert_eq!(after.balance(ALICE, "DAI"), Decimal::ZERO);
        assert!(after.accounts[ALICE].iter().all(|c| !c.is_debt()));
        assert_eq!(transfer_categories(&events), vec![Income, Expense]);
    }

    #[test]
    fn test_deposit_bootstraps_exchange_account_and_changes_jurisdiction() {
        let executor = executor();
        let start = funded(&executor, "ETH", dec!(1));
        let tx = Transaction::new(
            day(2),
            vec![transfer(Deposit, "ETH", dec!(0.75), ALICE, "Coinbase-account", 0)],
        );
        let (after, events) = executor.execute(&start, &tx).unwrap();

        assert_eq!(after.balance("Coinbase-account", "ETH"), dec!(0.75));
        assert_eq!(after.balance(ALICE, "ETH"), dec!(0.25));
        assert_eq!(events.len(), 2);
        match &events[1] {
            Event::JurisdictionChange {
                old_jurisdiction,
                new_jurisdiction,
                moved_chunks,
                insecure_chunks,
                new_balances,
                ..
            } => {
                assert_eq!(old_jurisdiction, "Ethereum");
                assert_eq!(new_jurisdiction, "Coinbase");
                assert_eq!(moved_chunks.len(), 1);
                assert!(insecure_chunks.is_empty());
                assert_eq!(new_balances["Coinbase-account"]["ETH"], dec!(0.75));
            }
            other => panic!("Expected a jurisdiction change, got {:?}", other),
        }
        assert!(after.accounts["Coinbase-account"][0].unsecured);
    }

    #[test]
    fn test_income_and_expense_across_jurisdictions_are_reported() {
        let executor = executor();
        let start = funded(&executor, "ETH", dec!(1));
        let deposit = Transaction::new(
            day(2),
            vec![transfer(Deposit, "ETH", dec!(1), ALICE, "Coinbase-account", 0)],
        );
        let (opened, _) = executor.execute(&start, &deposit).unwrap();

        let income = Transaction::new(
            day(3),
            vec![transfer(Income, "ETH", dec!(2), EMPLOYER, "Coinbase-account", 0)],
        );
        let (earned, events) = executor.execute(&opened, &income).unwrap();
        assert_eq!(earned.balance("Coinbase-account", "ETH"), dec!(3));
        assert_eq!(events.len(), 2);
        match &events[1] {
            Event::JurisdictionChange {
                old_jurisdiction,
                new_jurisdiction,
                ..
            } => {
                assert_eq!(old_jurisdiction, "Ethereum");
                assert_eq!(new_jurisdiction, "Coinbase");
            }
            other => panic!("Expected a jurisdiction change, got {:?}", other),
        }

        let expense = Transaction::new(
            day(4),
            vec![transfer(Expense, "ETH", dec!(0.5), "Coinbase-account", SHOP, 0)],
        );
        let (after, events) = executor.execute(&earned, &expense).unwrap();
        assert_eq!(after.balance("Coinbase-account", "ETH"), dec!(2.5));
        let changes: Vec<(String, String)> = events
            .iter()
            .filter_map(|e| match e {
                Event::JurisdictionChange {
                    old_jurisdiction,
                    new_jurisdiction,
                    ..
                } => Some((old_jurisdiction.clone(), new_jurisdiction.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(changes, vec![("Coinbase".to_string(), "Ethereum".to_string())]);
    }

    #[test]
    fn test_self_transfers_conserve_balances() {
        let executor = executor();
        let start = funded(&executor, "ETH", dec!(5));
        let total_before: Decimal = [ALICE, BOB].iter().map(|a| start.balance(a, "ETH")).sum();

        let tx = Transaction::new(
            day(2),
            vec![
                transfer(TransferCategory::Transfer, "ETH", dec!(2), ALICE, BOB, 0),
                transfer(TransferCategory::Transfer, "ETH", dec!(0.5), BOB, ALICE, 1),
            ],
        );
        let (after, events) = executor.execute(&start, &tx).unwrap();
        let total_after: Decimal = [ALICE, BOB].iter().map(|a| after.balance(a, "ETH")).sum();

        assert_eq!(total_before, total_after);
        assert_eq!(after.balance(BOB, "ETH"), dec!(1.5));
        assert!(events.iter().all(|e| e.event_type() == "Transfer"));
    }

    #[test]
    fn test_internal_transfer_between_addresses_is_silent() {
        let executor = executor();
        let start = funded(&executor, "ETH", dec!(1));
        let tx = Transaction::new(day(2), vec![transfer(Internal, "ETH", dec!(1), ALICE, BOB, 0)]);
        let (after, events) = executor.execute(&start, &tx).unwrap();
        assert!(events.is_empty());
        assert_eq!(after.balance(BOB, "ETH"), dec!(1));
    }

    #[test]
    fn test_unsupported_trade_falls_back_to_plain_transfers() {
        let executor = executor();
        let mut start = funded(&executor, "ETH", dec!(1));
        let more = Transaction::new(day(1), vec![transfer(Income, "DAI", dec!(10), EMPLOYER, ALICE, 0)]);
        start = executor.execute(&start, &more).unwrap().0;

        let tx = Transaction::new(
            day(2),
            vec![
                transfer(SwapOut, "ETH", dec!(1), ALICE, UNISWAP, 0),
                transfer(SwapOut, "DAI", dec!(10), ALICE, UNISWAP, 1),
                transfer(SwapIn, "MKR", dec!(1), UNISWAP, ALICE, 2),
                transfer(SwapIn, "UNI", dec!(3), UNISWAP, ALICE, 3),
            ],
        );
        let (after, events) = executor.execute(&start, &tx).unwrap();
        assert!(events.iter().all(|e| e.event_type() == "Transfer"));
        assert_eq!(transfer_categories(&events), vec![SwapOut, SwapOut, SwapIn, SwapIn]);
        assert_eq!(after.balance(ALICE, "ETH"), Decimal::ZERO);
        assert_eq!(after.balance(ALICE, "MKR"), dec!(1));
        assert_eq!(after.balance(ALICE, "UNI"), dec!(3));
    }

    #[test]
    fn test_unmatched_swap_is_a_plain_transfer() {
        let executor = executor();
        let tx = Transaction::new(day(2), vec![transfer(SwapIn, "UNI", dec!(3), UNISWAP, ALICE, 0)]);
        let (after, events) = executor.execute(&LedgerSnapshot::new(), &tx).unwrap();
        assert_eq!(after.balance(ALICE, "UNI"), dec!(3));
        assert_eq!(transfer_categories(&events), vec![SwapIn]);
    }

    #[test]
    fn test_opaque_interest_is_reported_as_income() {
        let executor = executor();
        let dsr = format!("Maker-DSR-{}", ALICE);
        let start = funded(&executor, "DAI", dec!(100));

        let deposit = Transaction::new(day(2), vec![transfer(Deposit, "DAI", dec!(100), ALICE, &dsr, 0)]);
        let (saving, _) = executor.execute(&start, &deposit).unwrap();

        let withdraw = Transaction::new(day(20), vec![transfer(Withdraw, "DAI", dec!(101), &dsr, ALICE, 0)]);
        let (after, events) = executor.execute(&saving, &withdraw).unwrap();

        assert_eq!(after.balance(ALICE, "DAI"), dec!(101));
        assert_eq!(after.balance(&dsr, "DAI"), Decimal::ZERO);
        assert_eq!(transfer_categories(&events), vec![Income, Withdraw]);
    }

    #[test]
    fn test_negative_quantity_is_rejected() {
        let executor = executor();
        let start = funded(&executor, "ETH", dec!(1));
        let tx = Transaction::new(day(2), vec![transfer(TransferCategory::Transfer, "ETH", dec!(-1), ALICE, BOB, 0)]);
        let result = executor.execute(&start, &tx);
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(start.balance(ALICE, "ETH"), dec!(1));
    }

    #[test]
    fn test_event_sink_receives_events() {
        let sink = Arc::new(CollectingEventSink::new());
        let executor = executor().with_event_sink(sink.clone());
        let tx = Transaction::new(day(1), vec![transfer(Income, "ETH", dec!(1), EMPLOYER, ALICE, 0)]);
        let (_, events) = executor.execute(&LedgerSnapshot::new(), &tx).unwrap();
        assert_eq!(sink.events(), events);
        assert_eq!(events[0].description(), "Income of 1.0 ETH to alice");
    }
}
