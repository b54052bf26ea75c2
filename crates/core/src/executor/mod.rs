//! Transaction executor - applies transactions to the chunk ledger.

mod transaction_executor;

pub use transaction_executor::*;

#[cfg(test)]
mod transaction_executor_tests;
