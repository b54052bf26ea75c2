//! Valuemachine Market Data Crate
//!
//! Historical price oracles for the value machine.
//!
//! # Overview
//!
//! Each oracle answers a single question: what was one unit of an asset worth,
//! in some other unit, on a given calendar day. The core crate decides which
//! oracle to ask and caches whatever comes back.
//!
//! ```text
//! +------------------+     +------------------+
//! |  PriceResolver   | --> |   RetryPolicy    |  (one retry on timeout / 429)
//! +------------------+     +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |   PriceOracle    |  (CoinGecko, Uniswap)
//!                          +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`PriceOracle`] - Trait implemented by every price source
//! - [`OracleKind`] - AMM history vs. aggregated market history
//! - [`MarketDataError`] - Oracle failures, classified by [`RetryClass`]

pub mod errors;
pub mod provider;

pub use errors::{MarketDataError, RetryClass, RetryPolicy};
pub use provider::{
    CoinGeckoOracle, OracleKind, PriceOracle, UniswapMarket, UniswapOracle, UniswapVersion,
};
