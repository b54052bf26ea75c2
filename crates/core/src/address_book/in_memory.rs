use std::collections::HashMap;

use log::debug;

use super::address_book_model::{abbreviate, infer_jurisdiction, AddressBookJson, AddressCategory, AddressEntry};
use super::address_book_traits::AddressBook;

/// Address book backed by a list of entries. Lookups ignore case.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAddressBook {
    entries: Vec<AddressEntry>,
    index: HashMap<String, usize>,
}

impl InMemoryAddressBook {
    pub fn new(entries: AddressBookJson) -> Self {
        let mut book = Self::default();
        for entry in entries {
            book.add(entry);
        }
        book
    }

    /// Adds an entry, replacing any previous entry for the same address.
    pub fn add(&mut self, entry: AddressEntry) {
        let key = entry.address.to_lowercase();
        match self.index.get(&key) {
            Some(&position) => {
                debug!("Replacing address book entry for {}", entry.address);
                self.entries[position] = entry;
            }
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn get(&self, address: &str) -> Option<&AddressEntry> {
        self.index
            .get(&address.to_lowercase())
            .and_then(|&position| self.entries.get(position))
    }

    pub fn entries(&self) -> &[AddressEntry] {
        &self.entries
    }

    pub fn to_json(&self) -> AddressBookJson {
        self.entries.clone()
    }
}

impl AddressBook for InMemoryAddressBook {
    fn is_self(&self, address: &str) -> bool {
        self.is_category(AddressCategory::SelfOwned, address)
    }

    fn get_name(&self, address: &str) -> String {
        self.get(address)
            .map(|entry| entry.name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| abbreviate(address))
    }

    fn is_category(&self, category: AddressCategory, address: &str) -> bool {
        self.get(address).is_some_and(|entry| entry.category == category)
    }

    fn get_jurisdiction(&self, address: &str) -> String {
        self.get(address)
            .and_then(|entry| entry.jurisdiction.clone())
            .unwrap_or_else(|| infer_jurisdiction(address))
    }
}
