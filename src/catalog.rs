//! Item definitions and the built-in catalog
//!
//! Every store/retrieve form in the UI is backed by one `ItemDefinition`.
//! The catalog only names things; it holds no secrets.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::traits::ItemCatalog;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Item name must not be empty")]
    EmptyItemName,
}

/// Non-empty item name, the second half of a secret's remote key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemName(String);

impl ItemName {
    pub fn new(name: impl Into<String>) -> Result<Self, CatalogError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CatalogError::EmptyItemName);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ItemName {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ItemName> for String {
    fn from(name: ItemName) -> Self {
        name.0
    }
}

impl fmt::Display for ItemName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Accounts,
    Documents,
    Passwords,
    PaymentCards,
}

impl Category {
    /// Placeholder shown in the value input for items of this category
    pub fn value_placeholder(&self) -> &'static str {
        match self {
            Category::Accounts => "Enter Password",
            Category::Documents => "Enter Details",
            Category::Passwords => "Enter Password or generate one",
            Category::PaymentCards => "Enter Card Number",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub name: ItemName,
    pub category: Category,
    pub value_placeholder: String,
}

impl ItemDefinition {
    pub fn new(name: impl Into<String>, category: Category) -> Result<Self, CatalogError> {
        Ok(Self {
            name: ItemName::new(name)?,
            category,
            value_placeholder: category.value_placeholder().to_string(),
        })
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.value_placeholder = placeholder.into();
        self
    }
}

const ACCOUNTS: &[&str] = &[
    "Google", "Facebook", "Microsoft", "Paypal", "Amazon", "Instagram", "Dropbox",
];
const DOCUMENTS: &[&str] = &[
    "Driving License", "PAN Card", "Aadhaar Card", "Election Card", "College ID-Card",
];
const PASSWORDS: &[&str] = &["Password"];
const PAYMENT_CARDS: &[&str] = &["Visa", "MasterCard", "Amex", "American Express", "ATM Card"];

/// Fixed, in-memory catalog
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    items: Vec<ItemDefinition>,
}

impl StaticCatalog {
    pub fn new(items: Vec<ItemDefinition>) -> Self {
        Self { items }
    }

    /// The items the lock box ships with
    pub fn builtin() -> Self {
        let groups = [
            (Category::Accounts, ACCOUNTS),
            (Category::Documents, DOCUMENTS),
            (Category::Passwords, PASSWORDS),
            (Category::PaymentCards, PAYMENT_CARDS),
        ];

        let items = groups
            .iter()
            .flat_map(|(category, names)| {
                names.iter().map(move |name| ItemDefinition {
                    name: ItemName(name.to_string()),
                    category: *category,
                    value_placeholder: category.value_placeholder().to_string(),
                })
            })
            .collect();

        Self { items }
    }
}

impl ItemCatalog for StaticCatalog {
    fn items(&self) -> Vec<ItemDefinition> {
        self.items.clone()
    }
}
