//! Item catalog trait

use crate::catalog::{Category, ItemDefinition};

/// Source of the items a user can store secrets against
///
/// Production: the built-in static list
/// Testing: any hand-built list
pub trait ItemCatalog: Send + Sync {
    /// All items, in display order
    fn items(&self) -> Vec<ItemDefinition>;

    /// Items belonging to one category
    fn items_in(&self, category: Category) -> Vec<ItemDefinition> {
        self.items()
            .into_iter()
            .filter(|item| item.category == category)
            .collect()
    }

    /// Look up an item by exact name
    fn find(&self, name: &str) -> Option<ItemDefinition> {
        self.items().into_iter().find(|item| item.name.as_str() == name)
    }
}
