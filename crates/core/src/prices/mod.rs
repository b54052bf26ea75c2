mod pathfinder;
mod price_resolver;
mod prices_model;
mod prices_traits;
mod swap_rates;


pub use pathfinder::find_path;
pub use price_resolver::PriceResolver;
pub use prices_model::{PricesJson, RateEntry, RateTable};
pub use prices_traits::PriceStore;
pub use swap_rates::infer_swap_rates;
