//! Session bootstrap.
//!
//! Turns an authenticated identity into a full [`User`] snapshot by joining
//! the `userdata`, `usernames` and `addresses` tables, repairing the main
//! address invariant on the way. Login, sign-up and session restore all end
//! here.

use tracing::instrument;

use pizzeria_core::Email;

use crate::backend::Identity;
use crate::db::{AddressRepository, ProfileRepository};
use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::models::user::{main_repair_target, mark_main};
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Assembles and publishes the user snapshot.
pub struct SessionAssembler<'a> {
    state: &'a AppState,
}

impl<'a> SessionAssembler<'a> {
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Build the user for `identity` and publish it to the state.
    ///
    /// If the stored addresses hold no main address (or several), the first
    /// main (or the first address) is promoted on the backend before the
    /// snapshot is published. This is the only place the invariant is
    /// restored after an interrupted promotion.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Repository` if any lookup or the repair write fails.
    /// Returns `AppError::IncompleteProfile` if name, phone, email or payment
    /// method is missing.
    #[instrument(skip_all, fields(user_id = %identity.id))]
    pub async fn assemble(&self, identity: &Identity) -> Result<User, AppError> {
        let id = identity.id;
        let tables = self.state.tables();
        let profiles = ProfileRepository::new(tables);
        let addresses = AddressRepository::new(tables);

        let (profile, name, mut list) = tokio::try_join!(
            profiles.get_profile(id),
            profiles.get_username(id),
            addresses.list(id),
        )?;

        if let Some(target) = main_repair_target(&list) {
            tracing::warn!(
                address_id = %target,
                addresses = list.len(),
                "Repairing main address"
            );
            addresses.promote(id, target).await?;
            mark_main(&mut list, target);
        }

        let name = name
            .filter(|n| !n.trim().is_empty())
            .ok_or(AppError::IncompleteProfile("name"))?;
        let profile = profile.ok_or(AppError::IncompleteProfile("phone"))?;
        let phone = profile
            .phone
            .filter(|p| !p.trim().is_empty())
            .ok_or(AppError::IncompleteProfile("phone"))?;
        let pay_method = profile
            .pay_method
            .ok_or(AppError::IncompleteProfile("pay method"))?;
        let email = identity
            .email
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or(AppError::IncompleteProfile("email"))?;
        let email = Email::parse(email).map_err(AuthError::from)?;

        let user = User {
            id,
            name,
            email,
            phone,
            pay_method,
            addresses: list,
        };

        self.state.set_user(Some(user.clone())).await;
        set_sentry_user(&user.id, Some(user.email.as_str()));
        tracing::info!(addresses = user.addresses.len(), "Session assembled");
        Ok(user)
    }
}
