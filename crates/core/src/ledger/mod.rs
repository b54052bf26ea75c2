//! Chunk ledger - per-account inventories of asset chunks with debt.

mod chunk_ledger;
mod chunk_model;

pub use chunk_ledger::*;
pub use chunk_model::*;

#[cfg(test)]
mod chunk_ledger_tests;
