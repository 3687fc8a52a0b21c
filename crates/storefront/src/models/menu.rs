//! Menu catalog types.

use serde::{Deserialize, Serialize};

use pizzeria_core::{ItemType, MenuItemId, Price};

/// A read-only catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub heading: String,
    pub description: String,
    pub ingredients: String,
    pub item_type: ItemType,
    pub price: Price,
    /// Image reference.
    pub src: String,
    /// Weight in grams (pizzas, snacks) or volume in ml (drinks).
    pub weight: f64,
}

/// The catalog partitioned by item type, each section in backend order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Menu {
    pub pizzas: Vec<MenuItem>,
    pub drinks: Vec<MenuItem>,
    pub snacks: Vec<MenuItem>,
}

impl Menu {
    /// Partition items by type.
    #[must_use]
    pub fn from_items(items: impl IntoIterator<Item = MenuItem>) -> Self {
        let mut menu = Self::default();
        for item in items {
            match item.item_type {
                ItemType::Pizza => menu.pizzas.push(item),
                ItemType::Drink => menu.drinks.push(item),
                ItemType::Snack => menu.snacks.push(item),
            }
        }
        menu
    }

    /// Items of one type.
    #[must_use]
    pub fn section(&self, item_type: ItemType) -> &[MenuItem] {
        match item_type {
            ItemType::Pizza => &self.pizzas,
            ItemType::Drink => &self.drinks,
            ItemType::Snack => &self.snacks,
        }
    }

    /// Find an item by heading across all sections.
    #[must_use]
    pub fn find(&self, heading: &str) -> Option<&MenuItem> {
        self.pizzas
            .iter()
            .chain(&self.drinks)
            .chain(&self.snacks)
            .find(|i| i.heading == heading)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pizzas.len() + self.drinks.len() + self.snacks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
