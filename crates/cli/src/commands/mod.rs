//! Subcommand implementations.

pub mod account;
pub mod address;
pub mod menu;

use secrecy::SecretString;
use thiserror::Error;

use pizzeria_storefront::config::ConfigError;
use pizzeria_storefront::models::User;
use pizzeria_storefront::services::AuthService;
use pizzeria_storefront::{AppError, AppState, ClientConfig};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The data layer rejected the operation.
    #[error("{}", .0.user_message())]
    App(#[from] AppError),

    /// Command needs an account but no credentials were given.
    #[error("Missing credentials: pass --email and --password (or set PIZZERIA_PASSWORD)")]
    MissingCredentials,
}

impl CliError {
    /// Send internal failures to Sentry.
    pub fn report(&self) {
        if let Self::App(e) = self {
            e.report();
        }
    }
}

/// Sign-in details from the command line.
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<SecretString>,
}

/// Build the state without signing in.
pub async fn connect(config: &ClientConfig) -> Result<AppState, CliError> {
    Ok(AppState::from_config(config).await?)
}

/// Build the state and sign in.
pub async fn sign_in(
    config: &ClientConfig,
    credentials: &Credentials,
) -> Result<(AppState, User), CliError> {
    let (Some(email), Some(password)) = (&credentials.email, &credentials.password) else {
        return Err(CliError::MissingCredentials);
    };

    let state = connect(config).await?;
    let user = AuthService::new(&state).login(email, password).await?;
    tracing::debug!(user_id = %user.id, "Signed in");
    Ok((state, user))
}
