//! Shopping cart.
//!
//! The cart is client-only state: an ordered list keyed by item heading,
//! independent of login state and of the backend until an order is
//! submitted. Every failing operation leaves the cart unchanged.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use pizzeria_core::Price;

use super::menu::MenuItem;

/// Smallest amount of one item in the cart.
pub const MIN_AMOUNT: u32 = 1;
/// Largest amount of one item in the cart.
pub const MAX_AMOUNT: u32 = 99;

/// Errors from cart operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    /// No cart entry has this heading.
    #[error("item not in cart: {0}")]
    NotFound(String),

    /// The change would take the amount outside `1..=99`.
    #[error("amount {amount} out of range for {heading}")]
    AmountOutOfRange {
        /// Item heading.
        heading: String,
        /// The rejected amount.
        amount: u32,
    },
}

/// A menu item snapshot with a quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub heading: String,
    pub description: String,
    pub ingredients: String,
    pub price: Price,
    pub weight: f64,
    /// Image reference.
    pub src: String,
    pub amount: u32,
}

impl CartItem {
    /// Snapshot a menu item with the given amount.
    #[must_use]
    pub fn from_menu(item: &MenuItem, amount: u32) -> Self {
        Self {
            heading: item.heading.clone(),
            description: item.description.clone(),
            ingredients: item.ingredients.clone(),
            price: item.price,
            weight: item.weight,
            src: item.src.clone(),
            amount,
        }
    }

    /// Price of this line.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.amount)
    }
}

/// The cart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up an entry by heading.
    #[must_use]
    pub fn get(&self, heading: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.heading == heading)
    }

    fn position(&self, heading: &str) -> Result<usize, CartError> {
        self.items
            .iter()
            .position(|i| i.heading == heading)
            .ok_or_else(|| CartError::NotFound(heading.to_string()))
    }

    fn entry_mut(&mut self, heading: &str) -> Result<&mut CartItem, CartError> {
        let index = self.position(heading)?;
        self.items
            .get_mut(index)
            .ok_or_else(|| CartError::NotFound(heading.to_string()))
    }

    /// Add an item, merging with an existing entry of the same heading.
    ///
    /// A merged amount is capped at [`MAX_AMOUNT`].
    ///
    /// # Errors
    ///
    /// Returns `CartError::AmountOutOfRange` if the item's own amount is
    /// outside `1..=99`.
    pub fn add(&mut self, item: CartItem) -> Result<(), CartError> {
        if !(MIN_AMOUNT..=MAX_AMOUNT).contains(&item.amount) {
            return Err(CartError::AmountOutOfRange {
                heading: item.heading,
                amount: item.amount,
            });
        }

        match self.items.iter_mut().find(|i| i.heading == item.heading) {
            Some(existing) => existing.amount = (existing.amount + item.amount).min(MAX_AMOUNT),
            None => self.items.push(item),
        }
        Ok(())
    }

    /// Add one more of an entry.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotFound` or, at 99, `CartError::AmountOutOfRange`.
    pub fn increment(&mut self, heading: &str) -> Result<u32, CartError> {
        let entry = self.entry_mut(heading)?;
        if entry.amount >= MAX_AMOUNT {
            return Err(CartError::AmountOutOfRange {
                heading: heading.to_string(),
                amount: entry.amount + 1,
            });
        }
        entry.amount += 1;
        Ok(entry.amount)
    }

    /// Remove one of an entry.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotFound` or, at 1, `CartError::AmountOutOfRange`.
    pub fn decrement(&mut self, heading: &str) -> Result<u32, CartError> {
        let entry = self.entry_mut(heading)?;
        if entry.amount <= MIN_AMOUNT {
            return Err(CartError::AmountOutOfRange {
                heading: heading.to_string(),
                amount: entry.amount.saturating_sub(1),
            });
        }
        entry.amount -= 1;
        Ok(entry.amount)
    }

    /// Drop an entry entirely.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotFound` if no entry has this heading.
    pub fn remove(&mut self, heading: &str) -> Result<CartItem, CartError> {
        let index = self.position(heading)?;
        Ok(self.items.remove(index))
    }

    /// Total price of the cart.
    #[must_use]
    pub fn sum(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Total number of units in the cart.
    #[must_use]
    pub fn items_count(&self) -> u32 {
        self.items.iter().map(|i| i.amount).sum()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Take the units of an ordered cart out of this one. Entries added or
    /// topped up since `ordered` was taken keep the difference.
    pub fn remove_ordered(&mut self, ordered: &Self) {
        for line in &ordered.items {
            let Ok(index) = self.position(&line.heading) else {
                continue;
            };
            let Some(entry) = self.items.get_mut(index) else {
                continue;
            };
            if entry.amount > line.amount {
                entry.amount -= line.amount;
            } else {
                self.items.remove(index);
            }
        }
    }
}

/// The item currently open in the item picker, with the amount the user is
/// about to add. Unlike the cart, the picker silently stays within bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedItem {
    item: CartItem,
}

impl SelectedItem {
    /// Open the picker on a menu item with amount 1.
    #[must_use]
    pub fn new(item: &MenuItem) -> Self {
        Self {
            item: CartItem::from_menu(item, MIN_AMOUNT),
        }
    }

    #[must_use]
    pub const fn amount(&self) -> u32 {
        self.item.amount
    }

    pub fn increment(&mut self) {
        if self.item.amount < MAX_AMOUNT {
            self.item.amount += 1;
        }
    }

    pub fn decrement(&mut self) {
        if self.item.amount > MIN_AMOUNT {
            self.item.amount -= 1;
        }
    }

    /// The cart entry to add.
    #[must_use]
    pub fn to_cart_item(&self) -> CartItem {
        self.item.clone()
    }
}
