//! Exchange rates implied by observed trades.

use log::warn;
use rust_decimal::Decimal;

use super::prices_model::RateEntry;
use crate::transactions::{AssetAmounts, TradeShape, TradeSummary};

/// Rates implied by a netted trade, assuming both sides had equal value.
///
/// - One for one: each asset priced in the other.
/// - Two for one (or one for two): the two assets on the paired side are
///   assumed to be worth the same, so they are priced against each other and
///   the lone asset is worth twice either of them.
///
/// Other shapes yield nothing.
pub fn infer_swap_rates(summary: &TradeSummary) -> Vec<RateEntry> {
    let mut rates = Vec::new();
    match summary.shape() {
        TradeShape::Empty => {}
        TradeShape::OneForOne => {
            let (out_asset, out_amount) = &summary.outputs[0];
            let (in_asset, in_amount) = &summary.inputs[0];
            push_ratio(&mut rates, out_asset, *out_amount, in_asset, *in_amount);
            push_ratio(&mut rates, in_asset, *in_amount, out_asset, *out_amount);
        }
        TradeShape::TwoForOne => push_pair_rates(&mut rates, &summary.outputs, &summary.inputs[0]),
        TradeShape::OneForTwo => push_pair_rates(&mut rates, &summary.inputs, &summary.outputs[0]),
        TradeShape::Unsupported { .. } => {
            warn!("Unable to get prices from swap: {}", summary);
        }
    }
    rates
}

/// Rates between two equal-value assets in `pair` and the `single` asset
/// exchanged for both.
fn push_pair_rates(rates: &mut Vec<RateEntry>, pair: &AssetAmounts, single: &(String, Decimal)) {
    let (first, first_amount) = &pair[0];
    let (second, second_amount) = &pair[1];
    let (lone, lone_amount) = single;
    push_ratio(rates, first, *first_amount, second, *second_amount);
    push_ratio(rates, second, *second_amount, first, *first_amount);
    push_ratio(rates, second, *second_amount * Decimal::TWO, lone, *lone_amount);
    push_ratio(rates, first, *first_amount * Decimal::TWO, lone, *lone_amount);
}

/// Records `unit_amount / asset_amount` as the `unit` price of `asset`.
fn push_ratio(rates: &mut Vec<RateEntry>, unit: &str, unit_amount: Decimal, asset: &str, asset_amount: Decimal) {
    match unit_amount.checked_div(asset_amount) {
        Some(rate) if rate > Decimal::ZERO => rates.push(RateEntry::new(unit, asset, rate)),
        _ => warn!(
            "Skipping unusable swap rate of {} {} for {} {}",
            unit_amount, unit, asset_amount, asset
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn summary(outputs: &[(&str, Decimal)], inputs: &[(&str, Decimal)]) -> TradeSummary {
        let owned = |side: &[(&str, Decimal)]| side.iter().map(|(a, q)| (a.to_string(), *q)).collect();
        TradeSummary::from_amounts(owned(outputs), owned(inputs))
    }

    #[test]
    fn test_one_for_one() {
        let rates = infer_swap_rates(&summary(&[("ETH", dec!(3))], &[("UNI", dec!(50))]));
        assert_eq!(
            rates,
            vec![
                RateEntry::new("ETH", "UNI", dec!(0.06)),
                RateEntry::new("UNI", "ETH", dec!(50) / dec!(3)),
            ]
        );
    }

    #[test]
    fn test_two_for_one_liquidity_deposit() {
        let rates = infer_swap_rates(&summary(
            &[("ETH", dec!(1)), ("DAI", dec!(2000))],
            &[("UNI-V2", dec!(40))],
        ));
        assert_eq!(rates.len(), 4);
        assert!(rates.contains(&RateEntry::new("ETH", "DAI", dec!(0.0005))));
        assert!(rates.contains(&RateEntry::new("DAI", "ETH", dec!(2000))));
        assert!(rates.contains(&RateEntry::new("DAI", "UNI-V2", dec!(100))));
        assert!(rates.contains(&RateEntry::new("ETH", "UNI-V2", dec!(0.05))));
    }

    #[test]
    fn test_one_for_two_liquidity_withdrawal() {
        let rates = infer_swap_rates(&summary(
            &[("UNI-V2", dec!(40))],
            &[("ETH", dec!(1)), ("DAI", dec!(2000))],
        ));
        assert!(rates.contains(&RateEntry::new("DAI", "UNI-V2", dec!(100))));
        assert!(rates.contains(&RateEntry::new("ETH", "UNI-V2", dec!(0.05))));
    }

    #[test]
    fn test_unsupported_and_empty_shapes_infer_nothing() {
        let two_for_two = summary(
            &[("ETH", dec!(1)), ("DAI", dec!(10))],
            &[("MKR", dec!(1)), ("UNI", dec!(3))],
        );
        assert!(infer_swap_rates(&two_for_two).is_empty());
        assert!(infer_swap_rates(&summary(&[], &[])).is_empty());
    }

    #[test]
    fn test_refunds_are_netted_before_inference() {
        let rates = infer_swap_rates(&summary(
            &[("ETH", dec!(1))],
            &[("ETH", dec!(0.2)), ("DAI", dec!(1600))],
        ));
        assert_eq!(rates[0], RateEntry::new("ETH", "DAI", dec!(0.0005)));
    }
}
