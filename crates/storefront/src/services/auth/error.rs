//! Authentication error types.

use thiserror::Error;

use crate::backend::BackendError;
use crate::db::RepositoryError;

/// Sign-up write that failed after the account was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupStep {
    Username,
    UserData,
    Address,
}

impl std::fmt::Display for SignupStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Username => write!(f, "usernames"),
            Self::UserData => write!(f, "userdata"),
            Self::Address => write!(f, "addresses"),
        }
    }
}

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] pizzeria_core::EmailError),

    /// Password left empty on login.
    #[error("empty password")]
    EmptyPassword,

    /// Password too short on sign-up.
    #[error("password shorter than {min} characters")]
    WeakPassword { min: usize },

    /// Display name too short on sign-up.
    #[error("username shorter than {min} characters")]
    ShortUsername { min: usize },

    /// Phone left blank on sign-up.
    #[error("empty phone")]
    EmptyPhone,

    /// Display name already used by another account.
    #[error("username already taken")]
    UsernameTaken,

    /// Invalid credentials (wrong password or unknown email).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// The auth service accepted the call but returned no usable identity.
    #[error("auth service returned no identity")]
    MissingIdentity,

    /// A profile row could not be written during sign-up.
    #[error("sign-up failed writing {step}: {source}")]
    Signup {
        step: SignupStep,
        #[source]
        source: RepositoryError,
    },

    /// Any other auth service failure.
    #[error("auth service error: {0}")]
    Backend(BackendError),

    /// Repository error outside sign-up writes.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<BackendError> for AuthError {
    fn from(err: BackendError) -> Self {
        match err.code() {
            Some("invalid_credentials") => Self::InvalidCredentials,
            Some("user-not-found" | "user_not_found") => Self::UserNotFound,
            Some("email_exists" | "user_already_exists") => Self::UserAlreadyExists,
            _ => Self::Backend(err),
        }
    }
}

impl AuthError {
    /// Localized message for the user.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidEmail(_) => "Email недействителен.",
            Self::EmptyPassword => "Пароль не может быть пустым.",
            Self::WeakPassword { .. } => "Пароль должен быть длиннее 6 символов.",
            Self::ShortUsername { .. } => "Имя пользователя должно быть длиннее 3 символов.",
            Self::EmptyPhone => "Укажите номер телефона.",
            Self::UsernameTaken => "Пользователь с таким именем уже существует.",
            Self::InvalidCredentials => "Неверный email или пароль.",
            Self::UserNotFound => "Пользователь не найден.",
            Self::UserAlreadyExists => "Пользователь с таким email уже существует.",
            Self::MissingIdentity => "Ошибка получения данных пользователя.",
            Self::Signup {
                step: SignupStep::Username,
                ..
            } => "Ошибка имени пользователя. Повторите попытку позже.",
            Self::Signup {
                step: SignupStep::UserData,
                ..
            } => "Ошибка данных пользователя. Повторите попытку позже.",
            Self::Signup {
                step: SignupStep::Address,
                ..
            } => "Ошибка адреса. Повторите попытку позже.",
            Self::Backend(_) | Self::Repository(_) => "Ошибка авторизации. Повторите попытку позже.",
        }
    }

    /// Whether the failure is on the service side rather than bad input.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::MissingIdentity | Self::Signup { .. } | Self::Backend(_) | Self::Repository(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(code: &str) -> BackendError {
        BackendError::Api {
            status: 400,
            code: Some(code.to_string()),
            message: String::new(),
        }
    }

    #[test]
    fn test_backend_codes_map_to_variants() {
        assert!(matches!(
            AuthError::from(api("invalid_credentials")),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(AuthError::from(api("user-not-found")), AuthError::UserNotFound));
        assert!(matches!(AuthError::from(api("email_exists")), AuthError::UserAlreadyExists));
        assert!(matches!(AuthError::from(api("over_request_rate_limit")), AuthError::Backend(_)));
        assert!(matches!(AuthError::from(BackendError::NoSession), AuthError::Backend(_)));
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            AuthError::from(api("email_exists")).user_message(),
            "Пользователь с таким email уже существует."
        );
        assert_eq!(
            AuthError::from(api("unexpected")).user_message(),
            "Ошибка авторизации. Повторите попытку позже."
        );
        assert_eq!(
            AuthError::Signup {
                step: SignupStep::Address,
                source: RepositoryError::NotFound,
            }
            .user_message(),
            "Ошибка адреса. Повторите попытку позже."
        );
    }
}
