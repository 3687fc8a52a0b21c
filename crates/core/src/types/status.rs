//! Enumerations stored as text columns in the backend.
//!
//! Each enum round-trips through the exact string the backend stores, via
//! serde, `Display` and `FromStr`.

use serde::{Deserialize, Serialize};

/// Preferred payment method of a user, copied onto each order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PayMethod {
    /// Pay by card when ordering.
    #[default]
    CardOnline,
    /// Pay by card to the courier.
    CardOnDelivery,
    /// Pay cash to the courier.
    Cash,
}

impl PayMethod {
    /// The value stored in the `paymethod` / `payMethod` columns.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CardOnline => "card-online",
            Self::CardOnDelivery => "card-on-delivery",
            Self::Cash => "cash",
        }
    }
}

impl std::fmt::Display for PayMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PayMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card-online" => Ok(Self::CardOnline),
            "card-on-delivery" => Ok(Self::CardOnDelivery),
            "cash" => Ok(Self::Cash),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

/// Order lifecycle status. Transitions happen server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Cooking,
    Delivering,
    Finished,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cooking => write!(f, "cooking"),
            Self::Delivering => write!(f, "delivering"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cooking" => Ok(Self::Cooking),
            "delivering" => Ok(Self::Delivering),
            "finished" => Ok(Self::Finished),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Menu section a catalog item belongs to (`items.itemType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Pizza,
    Drink,
    Snack,
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pizza => write!(f, "pizza"),
            Self::Drink => write!(f, "drink"),
            Self::Snack => write!(f, "snack"),
        }
    }
}

impl std::str::FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pizza" => Ok(Self::Pizza),
            "drink" => Ok(Self::Drink),
            "snack" => Ok(Self::Snack),
            _ => Err(format!("invalid item type: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_pay_method_wire_values() {
        for method in [PayMethod::CardOnline, PayMethod::CardOnDelivery, PayMethod::Cash] {
            let json = serde_json::to_string(&method).unwrap();
            assert_eq!(json, format!("\"{}\"", method.as_str()));
            assert_eq!(method.as_str().parse::<PayMethod>().unwrap(), method);
        }
        assert!("bitcoin".parse::<PayMethod>().is_err());
    }

    #[test]
    fn test_order_status_wire_values() {
        let status: OrderStatus = serde_json::from_str("\"delivering\"").unwrap();
        assert_eq!(status, OrderStatus::Delivering);
        assert_eq!(status.to_string(), "delivering");
    }

    #[test]
    fn test_item_type_parse() {
        assert_eq!("pizza".parse::<ItemType>().unwrap(), ItemType::Pizza);
        assert!("dessert".parse::<ItemType>().is_err());
    }
}
