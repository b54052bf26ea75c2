//! Price oracle implementations.
//!
//! - [`CoinGeckoOracle`]: daily market history for listed coins
//! - [`UniswapOracle`]: exchange history read from the Uniswap subgraphs

pub mod coingecko;
mod traits;
pub mod uniswap;

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

pub use coingecko::CoinGeckoOracle;
pub use traits::{OracleKind, PriceOracle};
pub use uniswap::{UniswapMarket, UniswapOracle, UniswapVersion};

/// Reads a decimal out of a JSON number or numeric string without a float
/// round trip for strings. Scientific notation is accepted.
pub(crate) fn decimal_from_json(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    if text.contains(['e', 'E']) {
        Decimal::from_scientific(&text).ok()
    } else {
        Decimal::from_str(&text).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_decimal_from_json() {
        assert_eq!(decimal_from_json(&json!(1234.5)), Some(dec!(1234.5)));
        assert_eq!(decimal_from_json(&json!("0.000123")), Some(dec!(0.000123)));
        assert_eq!(decimal_from_json(&json!("1.5e-5")), Some(dec!(0.000015)));
        assert_eq!(decimal_from_json(&json!(7)), Some(dec!(7)));
        assert_eq!(decimal_from_json(&json!("abc")), None);
        assert_eq!(decimal_from_json(&json!(null)), None);
    }
}
