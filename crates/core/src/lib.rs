//! Value Machine Core - chunk ledger, transaction executor and price resolver.
//!
//! This crate turns a chronological stream of categorized transfers into a
//! ledger of cost-basis chunks per account plus a stream of accounting events,
//! and values those chunks through a date-keyed exchange-rate graph. It does no
//! I/O of its own apart from the price oracles it is handed.

pub mod address_book;
pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod executor;
pub mod gains;
pub mod ledger;
pub mod prices;
pub mod transactions;
pub mod utils;

pub use address_book::*;
pub use config::ValueMachineConfig;
pub use events::*;
pub use executor::TransactionExecutor;
pub use gains::{derive_capital_gains, CapitalGain};
pub use ledger::*;
pub use prices::*;
pub use transactions::*;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
