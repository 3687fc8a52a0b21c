//! Menu repository: the read-only `items` catalog.

use serde::Deserialize;

use pizzeria_core::{ItemType, MenuItemId, Price};

use super::{RepositoryError, decode_all};
use crate::backend::{Table, TableStore};
use crate::models::menu::MenuItem;

/// `items` row. Every catalog column is nullable in the schema.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemRow {
    id: MenuItemId,
    #[serde(default)]
    heading: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    ingredients: Option<String>,
    #[serde(default)]
    item_type: Option<String>,
    #[serde(default)]
    price: Option<Price>,
    #[serde(default)]
    src: Option<String>,
    #[serde(default)]
    weight: Option<f64>,
}

impl ItemRow {
    /// Convert to a catalog entry, or say why the row is unusable.
    fn into_menu_item(self) -> Result<MenuItem, String> {
        let item_type = match self.item_type.as_deref() {
            Some(raw) => raw.parse::<ItemType>()?,
            None => return Err("missing itemType".to_string()),
        };
        let heading = self
            .heading
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| "missing heading".to_string())?;
        let price = self.price.ok_or_else(|| "missing price".to_string())?;

        Ok(MenuItem {
            id: self.id,
            heading,
            description: self.description.unwrap_or_default(),
            ingredients: self.ingredients.unwrap_or_default(),
            item_type,
            price,
            src: self.src.unwrap_or_default(),
            weight: self.weight.unwrap_or_default(),
        })
    }
}

/// Repository for the menu catalog.
pub struct MenuRepository<'a> {
    store: &'a dyn TableStore,
}

impl<'a> MenuRepository<'a> {
    /// Create a new menu repository.
    #[must_use]
    pub const fn new(store: &'a dyn TableStore) -> Self {
        Self { store }
    }

    /// Every usable catalog item, in store order.
    ///
    /// Rows without a known item type, a heading or a price cannot be shown
    /// or added to the cart; they are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a row is not an object
    /// with a numeric id.
    pub async fn list_all(&self) -> Result<Vec<MenuItem>, RepositoryError> {
        let rows = self.store.select(Table::Items, &[]).await?;
        let rows: Vec<ItemRow> = decode_all(Table::Items, rows)?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id;
                row.into_menu_item()
                    .map_err(|reason| {
                        tracing::warn!(item_id = %id, %reason, "Skipping menu item");
                    })
                    .ok()
            })
            .collect())
    }
}
