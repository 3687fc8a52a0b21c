//! Order types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pizzeria_core::{OrderId, OrderStatus, PayMethod, Price};

use super::cart::{Cart, CartItem};
use super::user::User;

/// One line of a submitted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub heading: String,
    pub amount: u32,
    /// Unit price at the time of ordering.
    pub price: Price,
}

impl From<&CartItem> for OrderLine {
    fn from(item: &CartItem) -> Self {
        Self {
            heading: item.heading.clone(),
            amount: item.amount,
            price: item.price,
        }
    }
}

/// A stored order. Immutable on the client; status changes server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    pub contents: Vec<OrderLine>,
    pub status: OrderStatus,
    /// Delivery address text.
    pub address: String,
    pub total_price: Price,
    pub pay_method: PayMethod,
    /// Contact name.
    pub name: String,
    /// Contact phone.
    pub phone: String,
}

/// Checkout form: everything an order needs besides the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub address: String,
    pub name: String,
    pub phone: String,
    pub pay_method: PayMethod,
}

impl OrderDraft {
    /// Prefill from the user's profile and main address.
    #[must_use]
    pub fn for_user(user: &User) -> Self {
        Self {
            address: user
                .main_address()
                .map(|a| a.place.clone())
                .unwrap_or_default(),
            name: user.name.clone(),
            phone: user.phone.clone(),
            pay_method: user.pay_method,
        }
    }

    /// The order lines and total for a cart.
    #[must_use]
    pub fn lines(cart: &Cart) -> (Vec<OrderLine>, Price) {
        (cart.items().iter().map(OrderLine::from).collect(), cart.sum())
    }
}
