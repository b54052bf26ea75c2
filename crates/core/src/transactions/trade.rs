//! Netting of swap transfers into a trade summary.

use std::fmt;

use log::warn;
use rust_decimal::Decimal;

use super::transactions_model::{Transfer, TransferCategory};
use crate::utils::decimal_utils::display_quantity;

/// Asset amounts in first-seen order.
pub type AssetAmounts = Vec<(String, Decimal)>;

/// Trade shapes the executor and price inference know how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeShape {
    /// Nothing moved.
    Empty,
    OneForOne,
    /// Two assets out, one in (e.g. adding liquidity).
    TwoForOne,
    /// One asset out, two in (e.g. removing liquidity).
    OneForTwo,
    Unsupported { outputs: usize, inputs: usize },
}

/// Net assets leaving (`outputs`) and entering (`inputs`) the trading account.
///
/// Refunds are netted: an asset that appears on both sides only counts on the
/// side it ends up on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeSummary {
    pub outputs: AssetAmounts,
    pub inputs: AssetAmounts,
}

fn accumulate(amounts: &mut AssetAmounts, asset: &str, quantity: Decimal) {
    match amounts.iter_mut().find(|(a, _)| a.as_str() == asset) {
        Some((_, total)) => *total += quantity,
        None => amounts.push((asset.to_string(), quantity)),
    }
}

impl TradeSummary {
    /// Nets raw outgoing and incoming amounts.
    pub fn from_amounts(outgoing: AssetAmounts, incoming: AssetAmounts) -> Self {
        let mut gross_in = AssetAmounts::new();
        for (asset, quantity) in incoming {
            accumulate(&mut gross_in, &asset, quantity);
        }

        let mut outputs = AssetAmounts::new();
        for (asset, quantity) in outgoing {
            accumulate(&mut outputs, &asset, quantity);
        }

        let mut inputs = AssetAmounts::new();
        for (asset, received) in gross_in {
            match outputs.iter_mut().find(|(a, _)| *a == asset) {
                Some((_, sent)) => *sent -= received,
                None => inputs.push((asset, received)),
            }
        }

        // A refund larger than what was sent flips the asset to the in side.
        let mut netted_outputs = AssetAmounts::new();
        for (asset, net) in outputs {
            if net > Decimal::ZERO {
                netted_outputs.push((asset, net));
            } else if net < Decimal::ZERO {
                warn!("Refund of {} exceeds amount sent, treating {} as received", asset, -net);
                inputs.push((asset, -net));
            }
        }

        Self {
            outputs: netted_outputs,
            inputs,
        }
    }

    pub fn from_swaps(swaps_out: &[&Transfer], swaps_in: &[&Transfer]) -> Self {
        Self::from_amounts(
            swaps_out.iter().map(|t| (t.asset.clone(), t.quantity)).collect(),
            swaps_in.iter().map(|t| (t.asset.clone(), t.quantity)).collect(),
        )
    }

    /// Summary of the swap transfers in `transfers`, ignoring everything else.
    pub fn from_transfers(transfers: &[Transfer]) -> Self {
        let swaps_out: Vec<&Transfer> = transfers
            .iter()
            .filter(|t| t.category == TransferCategory::SwapOut)
            .collect();
        let swaps_in: Vec<&Transfer> = transfers
            .iter()
            .filter(|t| t.category == TransferCategory::SwapIn)
            .collect();
        Self::from_swaps(&swaps_out, &swaps_in)
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty() && self.inputs.is_empty()
    }

    pub fn shape(&self) -> TradeShape {
        match (self.outputs.len(), self.inputs.len()) {
            (0, 0) => TradeShape::Empty,
            (1, 1) => TradeShape::OneForOne,
            (2, 1) => TradeShape::TwoForOne,
            (1, 2) => TradeShape::OneForTwo,
            (outputs, inputs) => TradeShape::Unsupported { outputs, inputs },
        }
    }
}

fn describe_side(amounts: &AssetAmounts) -> String {
    amounts
        .iter()
        .map(|(asset, quantity)| format!("{} {}", display_quantity(*quantity), asset))
        .collect::<Vec<_>>()
        .join(" and ")
}

impl fmt::Display for TradeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Traded {} for {}",
            describe_side(&self.outputs),
            describe_side(&self.inputs)
        )
    }
}
