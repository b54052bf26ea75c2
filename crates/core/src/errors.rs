//! Core error types for the value machine.
//!
//! Ledger shortfalls are the one recoverable failure: the executor catches
//! [`LedgerError::InsufficientInventory`] and retries the transfer later.
//! Everything else aborts the transaction being processed.

use chrono::{NaiveDate, ParseError as ChronoParseError};
use rust_decimal::Decimal;
use thiserror::Error;

use valuemachine_market_data::MarketDataError;

use crate::ledger::ChunkIndex;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the value machine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Ledger operation failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Price lookup failed: {0}")]
    Price(#[from] PriceError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Market data operation failed: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("Failed to persist prices: {0}")]
    Store(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// True for failures the executor may defer to its retry pass.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Ledger(LedgerError::InsufficientInventory { .. }))
    }
}

/// Errors raised by chunk bookkeeping.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Insufficient {asset} in account {account}: requested {requested}, available {available}")]
    InsufficientInventory {
        account: String,
        asset: String,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Account {account} handed out debt chunk #{index} ({quantity} {asset}) where an asset was expected")]
    UnexpectedDebt {
        account: String,
        asset: String,
        quantity: Decimal,
        index: ChunkIndex,
    },

    #[error("Chunk #{0} not found")]
    ChunkNotFound(ChunkIndex),

    #[error("Invalid ledger snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Errors raised while resolving prices.
#[derive(Error, Debug)]
pub enum PriceError {
    #[error("No {unit} price for {asset} on {date}")]
    MissingPrice {
        date: NaiveDate,
        asset: String,
        unit: String,
    },

    #[error("Invalid {unit} price for {asset} on {date}: {value}")]
    InvalidPrice {
        date: String,
        asset: String,
        unit: String,
        value: String,
    },
}

/// Validation errors for user input and data parsing.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Decimal {0} has more than 28 significant digits and cannot be stored exactly")]
    InexactDecimal(String),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(#[from] ChronoParseError),
}

// === From implementations for common error types ===

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(ValidationError::DateTimeParse(err))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
