use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::constants::PRICE_DECIMALS;
use crate::errors::ValidationError;

/// Truncates toward zero to [`PRICE_DECIMALS`] places and strips trailing zeros.
pub fn truncate_price(value: Decimal) -> Decimal {
    value
        .round_dp_with_strategy(PRICE_DECIMALS, RoundingStrategy::ToZero)
        .normalize()
}

/// Canonical string form of a price: truncated to 18 decimals, trailing zeros
/// stripped but at least one fractional digit kept ("2" becomes "2.0").
pub fn format_price(value: Decimal) -> String {
    let truncated = truncate_price(value);
    if truncated.scale() == 0 {
        format!("{}.0", truncated)
    } else {
        truncated.to_string()
    }
}

/// Parses a decimal string, accepting scientific notation.
pub fn parse_decimal(value: &str) -> Result<Decimal, rust_decimal::Error> {
    let value = value.trim();
    if value.contains(['e', 'E']) {
        Decimal::from_scientific(value)
    } else {
        Decimal::from_str(value)
    }
}

/// Parses a decimal string, failing instead of rounding when it carries more
/// digits than a [`Decimal`] can hold.
pub fn parse_exact_decimal(value: &str) -> Result<Decimal, ValidationError> {
    let parsed = parse_decimal(value)?;
    if significant_digits(value) != significant_digits(&parsed.to_string()) {
        return Err(ValidationError::InexactDecimal(value.trim().to_string()));
    }
    Ok(parsed)
}

/// Mantissa digits with sign, point, exponent and outer zeros removed.
fn significant_digits(value: &str) -> String {
    let mantissa = value.split(['e', 'E']).next().unwrap_or_default();
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    digits.trim_start_matches('0').trim_end_matches('0').to_string()
}

/// Cuts a plain decimal string to `places` fractional digits without parsing
/// it, so overlong inputs can still be read exactly.
pub fn truncate_fraction(value: &str, places: usize) -> &str {
    let value = value.trim();
    if value.contains(['e', 'E']) {
        return value;
    }
    match value.find('.') {
        Some(point) if value.len() > point + 1 + places => &value[..point + 1 + places],
        _ => value,
    }
}

/// Rounds a quantity for human-readable descriptions, keeping more digits
/// the smaller the magnitude.
pub fn display_quantity(value: Decimal) -> String {
    let magnitude = value.abs();
    let places = if magnitude >= Decimal::ONE {
        2
    } else if magnitude >= Decimal::new(1, 2) {
        4
    } else if magnitude >= Decimal::new(1, 4) {
        6
    } else {
        PRICE_DECIMALS
    };
    let rounded = value.round_dp(places).normalize();
    if rounded.scale() == 0 {
        format!("{}.0", rounded)
    } else {
        rounded.to_string()
    }
}
