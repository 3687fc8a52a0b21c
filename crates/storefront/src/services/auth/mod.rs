//! Authentication service.
//!
//! Login, sign-up, session restore and logout against the auth backend.
//! Every successful entry point ends in
//! [`SessionAssembler::assemble`](crate::services::session::SessionAssembler::assemble).

mod error;

pub use error::{AuthError, SignupStep};

use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use pizzeria_core::{Email, PayMethod};

use crate::db::{AddressRepository, ProfileRepository, RepositoryError};
use crate::error::{AppError, add_breadcrumb, clear_sentry_user};
use crate::models::{SignupCredentials, User};
use crate::services::session::SessionAssembler;
use crate::state::AppState;

/// Minimum password length on sign-up.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Minimum display name length on sign-up.
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Authentication service.
pub struct AuthService<'a> {
    state: &'a AppState,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Sign in with email and password and assemble the session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` or `AuthError::EmptyPassword` before
    /// any remote call.
    /// Returns `AuthError::InvalidCredentials` / `AuthError::UserNotFound`
    /// from the auth service.
    /// Returns any error of [`SessionAssembler::assemble`].
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<User, AppError> {
        let email = Email::parse(email).map_err(AuthError::from)?;
        if password.expose_secret().is_empty() {
            return Err(AuthError::EmptyPassword.into());
        }

        let identity = self
            .state
            .auth()
            .sign_in(&email, password)
            .await
            .map_err(AuthError::from)?;

        add_breadcrumb("auth", "Logged in", None);
        SessionAssembler::new(self.state).assemble(&identity).await
    }

    /// Create an account, its profile rows and first address, then assemble
    /// the session.
    ///
    /// A blank address is skipped; the user can add one later.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword`, `AuthError::ShortUsername`,
    /// `AuthError::InvalidEmail` or `AuthError::UsernameTaken` before the
    /// account is created.
    /// Returns `AuthError::UserAlreadyExists` if the email is registered.
    /// Returns `AuthError::Signup` if a profile row cannot be written.
    #[instrument(skip_all, fields(username = %credentials.username))]
    pub async fn signup(&self, credentials: &SignupCredentials) -> Result<User, AppError> {
        if credentials.password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword {
                min: MIN_PASSWORD_LENGTH,
            }
            .into());
        }
        let username = credentials.username.trim();
        if username.chars().count() < MIN_USERNAME_LENGTH {
            return Err(AuthError::ShortUsername {
                min: MIN_USERNAME_LENGTH,
            }
            .into());
        }
        let phone = credentials.phone.trim();
        if phone.is_empty() {
            return Err(AuthError::EmptyPhone.into());
        }
        let email = Email::parse(&credentials.email).map_err(AuthError::from)?;

        let tables = self.state.tables();
        let profiles = ProfileRepository::new(tables);
        if profiles
            .find_by_username(username)
            .await
            .map_err(AuthError::from)?
            .is_some()
        {
            return Err(AuthError::UsernameTaken.into());
        }

        let identity = self
            .state
            .auth()
            .sign_up(&email, &credentials.password)
            .await
            .map_err(AuthError::from)?;
        let id = identity.id;
        tracing::info!(user_id = %id, "Account created");

        let step = |step: SignupStep| move |source: RepositoryError| AuthError::Signup { step, source };
        profiles
            .insert_username(id, username)
            .await
            .map_err(step(SignupStep::Username))?;
        profiles
            .insert_profile(id, phone, PayMethod::CardOnline)
            .await
            .map_err(step(SignupStep::UserData))?;

        let place = credentials.address.trim();
        if !place.is_empty() {
            AddressRepository::new(tables)
                .insert(id, place, true)
                .await
                .map_err(step(SignupStep::Address))?;
        }

        add_breadcrumb("auth", "Signed up", None);
        SessionAssembler::new(self.state).assemble(&identity).await
    }

    /// Re-assemble the session from the auth backend's current identity.
    ///
    /// Returns `None` and clears the user snapshot when there is no session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Backend` if the identity lookup fails.
    /// Returns any error of [`SessionAssembler::assemble`].
    #[instrument(skip_all)]
    pub async fn restore(&self) -> Result<Option<User>, AppError> {
        let identity = self
            .state
            .auth()
            .current_user()
            .await
            .map_err(AuthError::from)?;

        match identity {
            Some(identity) => SessionAssembler::new(self.state)
                .assemble(&identity)
                .await
                .map(Some),
            None => {
                tracing::debug!("No active session");
                self.state.set_user(None).await;
                self.state.set_orders(Vec::new()).await;
                Ok(None)
            }
        }
    }

    /// End the session and drop the user snapshot. The cart is kept.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Backend` if sign-out fails; the snapshot is then
    /// left in place.
    #[instrument(skip_all)]
    pub async fn logout(&self) -> Result<(), AppError> {
        self.state
            .auth()
            .sign_out()
            .await
            .map_err(AuthError::from)?;

        self.state.set_user(None).await;
        self.state.set_orders(Vec::new()).await;
        clear_sentry_user();
        add_breadcrumb("auth", "Logged out", None);
        tracing::info!("Logged out");
        Ok(())
    }
}
