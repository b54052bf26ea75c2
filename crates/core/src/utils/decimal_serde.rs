use rust_decimal::Decimal;
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serializer};

use super::decimal_utils::parse_exact_decimal;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDecimal {
    Text(String),
    Integer(i64),
    Float(f64),
}

// Serializes as a decimal string; refuses inputs a Decimal would round.
pub mod exact_decimal {
    use super::*;

    pub fn serialize<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = match RawDecimal::deserialize(deserializer)? {
            RawDecimal::Text(text) => text,
            RawDecimal::Integer(n) => return Ok(Decimal::from(n)),
            RawDecimal::Float(f) => f.to_string(),
        };
        parse_exact_decimal(&text).map_err(D::Error::custom)
    }
}
