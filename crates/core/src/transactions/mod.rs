//! Transactions - dated bundles of categorized transfers.

mod trade;
mod transactions_model;

pub use trade::*;
pub use transactions_model::*;
