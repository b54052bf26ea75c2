//! Address classification contract consumed by the ledger and executor.

use super::address_book_model::{infer_jurisdiction, AddressCategory, AddressEntry};

/// Classifies account identifiers.
///
/// The ledger only asks questions of the address book; it never mutates it.
pub trait AddressBook: Send + Sync {
    /// Whether the address belongs to the ledger owner.
    fn is_self(&self, address: &str) -> bool;

    /// Display name, falling back to an abbreviated address.
    fn get_name(&self, address: &str) -> String;

    fn is_category(&self, category: AddressCategory, address: &str) -> bool;

    /// Builds an entry for an address that is not in the book yet.
    fn new_address(&self, address: &str, category: AddressCategory, name: &str) -> AddressEntry {
        AddressEntry::new(address, category, name)
    }

    /// Legal or custodial domain the address lives in.
    fn get_jurisdiction(&self, address: &str) -> String {
        infer_jurisdiction(address)
    }
}
