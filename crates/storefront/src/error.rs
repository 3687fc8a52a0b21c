//! Unified error handling with Sentry integration.
//!
//! Every data-layer operation returns `Result<T, AppError>`. The error keeps
//! the typed cause for logs and Sentry, and [`AppError::user_message`] gives
//! the localized text the UI shows.

use thiserror::Error;

use crate::backend::BackendError;
use crate::db::RepositoryError;
use crate::models::cart::CartError;
use crate::persist::PersistError;
use crate::services::auth::AuthError;
use crate::services::verify::VerificationError;

/// Application-level error type for the data layer.
#[derive(Debug, Error)]
pub enum AppError {
    /// Table access failed.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Backend call outside a repository failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// A read-back after a write disagreed with the write.
    #[error("Verification error: {0}")]
    Verification(#[from] VerificationError),

    /// Cart operation rejected.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Local snapshot could not be saved or loaded.
    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    /// Input rejected before any remote call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation needs a signed-in user.
    #[error("Not logged in")]
    NotLoggedIn,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A required profile field is missing on the backend.
    #[error("Incomplete profile: missing {0}")]
    IncompleteProfile(&'static str),
}

impl AppError {
    /// Localized message for the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth(err) => err.user_message().to_string(),
            Self::Verification(_) => "Ошибка верификации данных. Повторите попытку позже".to_string(),
            Self::Repository(_) | Self::Backend(_) => {
                "Ошибка обновления данных. Повторите попытку позже".to_string()
            }
            Self::Cart(CartError::NotFound(_)) => "Товар не найден в корзине.".to_string(),
            Self::Cart(CartError::AmountOutOfRange { .. }) => {
                "Недопустимое количество товара.".to_string()
            }
            Self::Persist(_) => "Ошибка сохранения данных.".to_string(),
            Self::Validation(msg) => msg.clone(),
            Self::NotLoggedIn => "Пользователь не найден.".to_string(),
            Self::NotFound(_) => "Данные пользователя не найдены.".to_string(),
            Self::IncompleteProfile(_) => "Ошибка получения данных пользователя.".to_string(),
        }
    }

    /// Whether the error points at the backend or the client rather than at
    /// user input.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        match self {
            Self::Repository(_)
            | Self::Backend(_)
            | Self::Verification(_)
            | Self::Persist(_)
            | Self::IncompleteProfile(_) => true,
            Self::Auth(err) => err.is_internal(),
            Self::Cart(_) | Self::Validation(_) | Self::NotLoggedIn | Self::NotFound(_) => false,
        }
    }

    /// Log the error and, for internal errors, capture it to Sentry.
    pub fn report(&self) {
        if self.is_internal() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Operation failed"
            );
        } else {
            tracing::debug!(error = %self, "Operation rejected");
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("address", "Added address", Some(&[("address_id", "42")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("address 7".to_string());
        assert_eq!(err.to_string(), "Not found: address 7");

        let err = AppError::IncompleteProfile("phone");
        assert_eq!(err.to_string(), "Incomplete profile: missing phone");
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            AppError::Auth(AuthError::InvalidCredentials).user_message(),
            "Неверный email или пароль."
        );
        assert_eq!(
            AppError::from(VerificationError::new("add address", "text mismatch")).user_message(),
            "Ошибка верификации данных. Повторите попытку позже"
        );
        assert_eq!(
            AppError::Repository(RepositoryError::NotFound).user_message(),
            "Ошибка обновления данных. Повторите попытку позже"
        );
        assert_eq!(
            AppError::Validation("Адрес не может быть пустым.".to_string()).user_message(),
            "Адрес не может быть пустым."
        );
    }

    #[test]
    fn test_internal_classification() {
        assert!(AppError::Backend(BackendError::NoSession).is_internal());
        assert!(AppError::IncompleteProfile("name").is_internal());
        assert!(!AppError::NotLoggedIn.is_internal());
        assert!(!AppError::Cart(CartError::NotFound("x".to_string())).is_internal());
        assert!(!AppError::Auth(AuthError::InvalidCredentials).is_internal());
    }
}
