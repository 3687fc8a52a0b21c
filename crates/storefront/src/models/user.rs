//! User domain types.
//!
//! The [`User`] snapshot is assembled from three backend tables at session
//! bootstrap and then mutated field by field by the edit operations.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use pizzeria_core::{AddressId, Email, PayMethod, UserId};

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Auth-service identity.
    pub id: UserId,
    /// Display name (`usernames.username`).
    pub name: String,
    /// Email on the auth record.
    pub email: Email,
    /// Contact phone (`userdata.phone`).
    pub phone: String,
    /// Preferred payment method (`userdata.paymethod`).
    pub pay_method: PayMethod,
    /// Delivery addresses in backend order.
    pub addresses: Vec<Address>,
}

impl User {
    /// The default delivery address.
    #[must_use]
    pub fn main_address(&self) -> Option<&Address> {
        self.addresses.iter().find(|a| a.main)
    }

    /// Look up an address by id.
    #[must_use]
    pub fn address(&self, id: AddressId) -> Option<&Address> {
        self.addresses.iter().find(|a| a.id == id)
    }
}

/// A delivery address.
///
/// `is_new` and `deleted` are editing flags for forms and are never sent to
/// the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Row id.
    pub id: AddressId,
    /// Free-form address text.
    pub place: String,
    /// Whether this is the default delivery address.
    pub main: bool,
    /// Added in the form but not saved yet.
    #[serde(skip)]
    pub is_new: bool,
    /// Marked for removal in the form.
    #[serde(skip)]
    pub deleted: bool,
}

impl Address {
    /// A stored address.
    #[must_use]
    pub fn new(id: AddressId, place: impl Into<String>, main: bool) -> Self {
        Self {
            id,
            place: place.into(),
            main,
            is_new: false,
            deleted: false,
        }
    }
}

/// Number of addresses flagged main.
#[must_use]
pub fn main_count(addresses: &[Address]) -> usize {
    addresses.iter().filter(|a| a.main).count()
}

/// The address that must become main for the list to hold exactly one main,
/// or `None` if it already does (or is empty).
///
/// With several mains the first one wins; with none the first address wins.
#[must_use]
pub fn main_repair_target(addresses: &[Address]) -> Option<AddressId> {
    let mut mains = addresses.iter().filter(|a| a.main);
    match (mains.next(), mains.next()) {
        (Some(first), Some(_)) => Some(first.id),
        (Some(_), None) => None,
        (None, _) => addresses.first().map(|a| a.id),
    }
}

/// Flag `id` as main and every other address as not main.
pub fn mark_main(addresses: &mut [Address], id: AddressId) {
    for address in addresses {
        address.main = address.id == id;
    }
}

/// Same repair as [`main_repair_target`], by position. Used for addresses
/// that have no backend id yet.
pub fn normalize_main_flags(addresses: &mut [Address]) {
    let winner = addresses.iter().position(|a| a.main).unwrap_or(0);
    for (i, address) in addresses.iter_mut().enumerate() {
        address.main = i == winner;
    }
}

/// Sign-up form input.
#[derive(Debug, Clone)]
pub struct SignupCredentials {
    pub email: String,
    pub password: SecretString,
    pub username: String,
    pub phone: String,
    /// First delivery address; becomes the main address.
    pub address: String,
}
