//! Item catalog and alias table
//!
//! Both are eagerly materialized hash indexes. A catalog miss is not an
//! error: lookups return [`DisplayName::Unknown`] carrying the raw id so
//! ranking output can still be rendered.

use crate::ItemId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Human-readable name of an item, or the raw id when the catalog has none
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DisplayName {
    Known(String),
    Unknown(ItemId),
}

impl DisplayName {
    pub fn is_known(&self) -> bool {
        matches!(self, DisplayName::Known(_))
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayName::Known(name) => f.write_str(name),
            DisplayName::Unknown(id) => write!(f, "{}", id),
        }
    }
}

/// Read-only `item id -> display name` mapping
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    names: HashMap<ItemId, String>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a name, replacing any earlier one for the same id
    pub fn insert(&mut self, item_id: ItemId, name: impl Into<String>) {
        self.names.insert(item_id, name.into());
    }

    pub fn get(&self, item_id: ItemId) -> Option<&str> {
        self.names.get(&item_id).map(String::as_str)
    }

    pub fn display_name(&self, item_id: ItemId) -> DisplayName {
        match self.names.get(&item_id) {
            Some(name) => DisplayName::Known(name.clone()),
            None => DisplayName::Unknown(item_id),
        }
    }

    pub fn contains(&self, item_id: ItemId) -> bool {
        self.names.contains_key(&item_id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<(ItemId, String)> for ItemCatalog {
    fn from_iter<I: IntoIterator<Item = (ItemId, String)>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

/// Mapping from misspelled / duplicate item ids to their canonical id
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    canonical: HashMap<ItemId, ItemId>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alias: ItemId, canonical: ItemId) {
        self.canonical.insert(alias, canonical);
    }

    /// Canonical id for `item_id`; single hop, ids without an alias map to themselves
    pub fn resolve(&self, item_id: ItemId) -> ItemId {
        self.canonical.get(&item_id).copied().unwrap_or(item_id)
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}

impl FromIterator<(ItemId, ItemId)> for AliasTable {
    fn from_iter<I: IntoIterator<Item = (ItemId, ItemId)>>(iter: I) -> Self {
        Self {
            canonical: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_lookup() {
        let catalog: ItemCatalog = vec![(1, "Aerosmith".to_string())].into_iter().collect();

        assert_eq!(
            catalog.display_name(1),
            DisplayName::Known("Aerosmith".to_string())
        );
        assert_eq!(catalog.display_name(2), DisplayName::Unknown(2));
        assert_eq!(catalog.display_name(2).to_string(), "2");
        assert!(!catalog.display_name(2).is_known());
    }

    #[test]
    fn test_alias_resolution_is_single_hop() {
        let aliases: AliasTable = vec![(5, 6), (6, 7)].into_iter().collect();
        assert_eq!(aliases.resolve(5), 6);
        assert_eq!(aliases.resolve(6), 7);
        assert_eq!(aliases.resolve(8), 8);
    }

    #[test]
    fn test_later_insert_wins() {
        let mut catalog = ItemCatalog::new();
        catalog.insert(3, "Old");
        catalog.insert(3, "New");
        assert_eq!(catalog.get(3), Some("New"));
        assert_eq!(catalog.len(), 1);
    }
}
