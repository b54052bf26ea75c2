/// Default unit of account.
pub const DEFAULT_UNIT: &str = "ETH";

/// Assets priced 1:1 against each other. The first entry is canonical.
pub const ETH_EQUIVALENTS: &[&str] = &["ETH", "WETH"];

/// Tokens that live on-chain and can be priced from exchange history.
pub const CHAIN_NATIVE_ASSETS: &[&str] = &[
    "AAVE", "BAT", "COMP", "DAI", "ETH", "GEN", "LINK", "MKR", "PETH", "REP", "SAI", "SNT", "SNX",
    "UNI", "USDC", "USDT", "WBTC", "WETH", "YFI",
];

pub const FIAT_CURRENCIES: &[&str] = &["AUD", "CAD", "CHF", "CNY", "EUR", "GBP", "INR", "JPY", "USD"];

/// Blockchain names that transaction fees are paid to.
pub const FEE_SINKS: &[&str] = &["Ethereum", "Polygon", "Arbitrum", "Optimism", "Bitcoin"];

/// Accounts whose balance grows without any visible transfer.
pub const DEFAULT_OPAQUE_INTEREST_BEARERS: &[&str] = &["Maker-DSR"];

/// Digits kept after the decimal point for every stored or returned price.
pub const PRICE_DECIMALS: u32 = 18;

/// Holding periods longer than this many days count as long term.
pub const LONG_TERM_HOLDING_DAYS: i64 = 365;

pub const DEFAULT_RETRY_TIMEOUT_DELAY_MS: u64 = 1_000;

pub const DEFAULT_RETRY_RATE_LIMIT_DELAY_MS: u64 = 8_000;
