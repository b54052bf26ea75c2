mod capital_gains;
mod gains_model;

pub use capital_gains::derive_capital_gains;
pub use gains_model::CapitalGain;
