//! Address book - classifies the accounts that appear in transfers.

mod in_memory;
mod address_book_model;
mod address_book_traits;

pub use in_memory::*;
pub use address_book_model::*;
pub use address_book_traits::*;
