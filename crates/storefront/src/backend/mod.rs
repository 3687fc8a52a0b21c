//! Hosted backend collaborators: authentication and relational tables.
//!
//! # Architecture
//!
//! - The backend is the source of truth - NO local sync, direct API calls
//! - [`AuthBackend`] covers sign-up, sign-in, sign-out, email change and the
//!   current session's identity
//! - [`TableStore`] covers select/insert/update/delete on the five tables,
//!   filtered by equality predicates only
//! - Rows cross this seam as JSON; typed decoding lives in [`crate::db`]
//!
//! # Implementations
//!
//! - [`RestBackend`] - GoTrue-style auth and PostgREST-style tables over HTTP
//! - `MemoryBackend` - in-process fake (feature `test-util`)

mod rest;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

pub use rest::RestBackend;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;
use thiserror::Error;

use pizzeria_core::{Email, UserId};

/// Errors returned by the hosted backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The service answered with an error payload.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Machine-readable error code (e.g. `invalid_credentials`), if any.
        code: Option<String>,
        /// Human-readable message from the service.
        message: String,
    },

    /// Rate limited by the service.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The call needs a signed-in session and there is none.
    #[error("no active session")]
    NoSession,

    /// The backend refused the call outright.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    /// The machine-readable error code, if the service sent one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// The five tables of the application schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// `addresses{id, uuid, address, main, created_at}`
    Addresses,
    /// `userdata{id, uuid, phone, paymethod, created_at}`
    UserData,
    /// `usernames{id, uuid, username, created_at}`
    Usernames,
    /// `items{id, heading, description, ingredients, itemType, price, src, weight, ...}`
    Items,
    /// `orders{id, uuid, contents, status, address, totalPrice, payMethod, name, phone, created_at}`
    Orders,
}

impl Table {
    /// Table name as exposed by the REST endpoint.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Addresses => "addresses",
            Self::UserData => "userdata",
            Self::Usernames => "usernames",
            Self::Items => "items",
            Self::Orders => "orders",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An equality predicate on one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Column name.
    pub column: &'static str,
    /// Value the column must equal.
    pub value: Value,
}

impl Filter {
    /// `column = value`.
    pub fn eq(column: &'static str, value: impl Into<Value>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }

    /// `uuid = user`, the owner predicate used by every user-scoped table.
    #[must_use]
    pub fn owner(user: UserId) -> Self {
        Self::eq("uuid", user.to_string())
    }

    /// The value rendered the way the query string expects it.
    #[must_use]
    pub fn value_text(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Whether a JSON row satisfies this predicate.
    #[must_use]
    pub fn matches(&self, row: &Value) -> bool {
        row.get(self.column) == Some(&self.value)
    }
}

/// An authenticated identity as returned by the auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// User UUID.
    pub id: UserId,
    /// Email on the auth record, if any.
    pub email: Option<String>,
}

/// Result of requesting an email change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmailChange {
    /// Whether the auth service sent a confirmation message.
    pub confirmation_sent: bool,
}

/// Authentication collaborator.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Create an account and start a session for it.
    async fn sign_up(&self, email: &Email, password: &SecretString)
    -> Result<Identity, BackendError>;

    /// Start a session with email and password.
    async fn sign_in(&self, email: &Email, password: &SecretString)
    -> Result<Identity, BackendError>;

    /// End the current session.
    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Request an email change for the signed-in user.
    async fn update_email(&self, email: &Email) -> Result<EmailChange, BackendError>;

    /// Identity of the current session, or `None` when signed out.
    async fn current_user(&self) -> Result<Option<Identity>, BackendError>;
}

/// Relational store collaborator.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Select all columns of the rows matching every filter.
    async fn select(&self, table: Table, filters: &[Filter]) -> Result<Vec<Value>, BackendError>;

    /// Insert rows and return them as stored (with ids and defaults filled in).
    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<Vec<Value>, BackendError>;

    /// Merge `patch` into every row matching the filters.
    async fn update(&self, table: Table, patch: Value, filters: &[Filter])
    -> Result<(), BackendError>;

    /// Delete every row matching the filters.
    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<(), BackendError>;
}

/// Both collaborators behind one handle.
pub trait Backend: Send + Sync {
    /// The authentication collaborator.
    fn auth(&self) -> &dyn AuthBackend;

    /// The relational store collaborator.
    fn tables(&self) -> &dyn TableStore;
}

impl<T: AuthBackend + TableStore> Backend for T {
    fn auth(&self) -> &dyn AuthBackend {
        self
    }

    fn tables(&self) -> &dyn TableStore {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_value_text() {
        assert_eq!(Filter::eq("id", 7).value_text(), "7");
        assert_eq!(Filter::eq("main", true).value_text(), "true");
        assert_eq!(Filter::eq("username", "ivan").value_text(), "ivan");
    }

    #[test]
    fn test_filter_matches() {
        let row = json!({"id": 3, "uuid": "abc", "main": false});
        assert!(Filter::eq("id", 3).matches(&row));
        assert!(Filter::eq("uuid", "abc").matches(&row));
        assert!(!Filter::eq("main", true).matches(&row));
        assert!(!Filter::eq("missing", 1).matches(&row));
    }

    #[test]
    fn test_backend_error_code() {
        let err = BackendError::Api {
            status: 400,
            code: Some("invalid_credentials".to_string()),
            message: "Invalid login credentials".to_string(),
        };
        assert_eq!(err.code(), Some("invalid_credentials"));
        assert_eq!(BackendError::NoSession.code(), None);
        assert_eq!(err.to_string(), "API error (400): Invalid login credentials");
    }
}
