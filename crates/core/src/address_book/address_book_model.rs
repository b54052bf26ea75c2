//! Address book domain models.

use serde::{Deserialize, Serialize};

/// Jurisdiction reported when nothing better is known.
pub const UNKNOWN_JURISDICTION: &str = "Unknown";

/// Jurisdiction of plain hex addresses.
pub const ETHEREUM_JURISDICTION: &str = "Ethereum";

/// How an address relates to the ledger owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressCategory {
    /// Owned by the user; its inventory is tracked.
    #[serde(rename = "Self")]
    SelfOwned,
    Exchange,
    Defi,
    Token,
    Public,
    Private,
}

impl AddressCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfOwned => "Self",
            Self::Exchange => "Exchange",
            Self::Defi => "Defi",
            Self::Token => "Token",
            Self::Public => "Public",
            Self::Private => "Private",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressEntry {
    pub address: String,
    pub category: AddressCategory,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
}

impl AddressEntry {
    pub fn new(address: &str, category: AddressCategory, name: &str) -> Self {
        Self {
            address: address.to_string(),
            category,
            name: name.to_string(),
            jurisdiction: None,
        }
    }

    pub fn with_jurisdiction(mut self, jurisdiction: &str) -> Self {
        self.jurisdiction = Some(jurisdiction.to_string());
        self
    }
}

/// Serialized form of an address book: a flat list of entries.
pub type AddressBookJson = Vec<AddressEntry>;

/// `0x` followed by 40 hex digits.
pub fn is_hex_address(value: &str) -> bool {
    value.len() == 42
        && value.starts_with("0x")
        && value[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Jurisdiction derived from the shape of an account name alone.
///
/// `Coinbase-account` belongs to `Coinbase`, hex addresses (or app accounts
/// scoped to one, like `Maker-DSR-0x…`) belong to Ethereum.
pub fn infer_jurisdiction(address: &str) -> String {
    if let Some(source) = address.strip_suffix("-account") {
        return source.to_string();
    }
    let tail = address.rsplit('-').next().unwrap_or(address);
    if is_hex_address(tail) {
        return ETHEREUM_JURISDICTION.to_string();
    }
    UNKNOWN_JURISDICTION.to_string()
}

/// `0x1234..abcd` style label for addresses without a name.
pub fn abbreviate(address: &str) -> String {
    if is_hex_address(address) {
        format!("{}..{}", &address[..6], &address[38..])
    } else {
        address.to_string()
    }
}
