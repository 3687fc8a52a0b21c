//! Menu and order prices.
//!
//! Prices are whole or fractional roubles stored in the backend as JSON
//! numbers, so the wrapper serializes as a float (see the `serde-with-float`
//! feature on `rust_decimal`).

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price in roubles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero roubles.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from a whole number of roubles.
    #[must_use]
    pub fn from_roubles(roubles: i64) -> Self {
        Self(Decimal::from(roubles))
    }

    /// Get the decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ₽", self.0.normalize())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_times_and_sum() {
        let total: Price = [Price::from_roubles(450).times(2), Price::from_roubles(120)]
            .into_iter()
            .sum();
        assert_eq!(total, Price::from_roubles(1020));
    }

    #[test]
    fn test_deserializes_from_json_number() {
        let price: Price = serde_json::from_str("599").unwrap();
        assert_eq!(price, Price::from_roubles(599));
        let price: Price = serde_json::from_str("99.5").unwrap();
        assert_eq!(price.to_string(), "99.5 ₽");
    }

    #[test]
    fn test_display_drops_trailing_zeros() {
        assert_eq!(Price::new(Decimal::new(45000, 2)).to_string(), "450 ₽");
    }
}
