//! Typed access to the backend tables.
//!
//! # Tables
//!
//! - `addresses` - Delivery addresses, one row per address, owned by `uuid`
//! - `userdata` - Phone and preferred payment method, one row per user
//! - `usernames` - Display name, one row per user, unique across users
//! - `items` - Menu catalog, read-only
//! - `orders` - Submitted orders, insert-only from the client
//!
//! Each repository borrows a [`TableStore`](crate::backend::TableStore) and
//! converts between JSON rows and the domain models in [`crate::models`].
//! Rows that do not match the expected shape surface as
//! [`RepositoryError::DataCorruption`].

pub mod addresses;
pub mod menu;
pub mod orders;
pub mod profiles;

pub use addresses::AddressRepository;
pub use menu::MenuRepository;
pub use orders::OrderRepository;
pub use profiles::{ProfileRepository, ProfileRow};

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::backend::{BackendError, Table};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The backend call failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// A row came back in a shape we cannot decode.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested row was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., taken username).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Decode one JSON row.
fn decode<T: DeserializeOwned>(table: Table, row: Value) -> Result<T, RepositoryError> {
    serde_json::from_value(row)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid {table} row: {e}")))
}

/// Decode every row, failing on the first bad one.
fn decode_all<T: DeserializeOwned>(table: Table, rows: Vec<Value>) -> Result<Vec<T>, RepositoryError> {
    rows.into_iter().map(|row| decode(table, row)).collect()
}

/// The single row a one-per-user lookup expects.
///
/// More than one row means the per-user uniqueness the schema relies on is
/// broken.
fn at_most_one<T: DeserializeOwned>(table: Table, rows: Vec<Value>) -> Result<Option<T>, RepositoryError> {
    let mut rows = rows.into_iter();
    match (rows.next(), rows.next()) {
        (None, _) => Ok(None),
        (Some(row), None) => decode(table, row).map(Some),
        (Some(_), Some(_)) => Err(RepositoryError::DataCorruption(format!(
            "expected at most one {table} row"
        ))),
    }
}
