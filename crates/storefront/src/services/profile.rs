//! Profile field edits.
//!
//! Name, phone and payment method are written, read back and only then
//! mirrored into the user snapshot. Email changes go through the auth
//! service and need confirmation, so the snapshot keeps the old address
//! until the next session restore.

use tracing::instrument;

use pizzeria_core::{Email, PayMethod};

use crate::db::ProfileRepository;
use crate::error::{AppError, add_breadcrumb};
use crate::services::auth::AuthError;
use crate::services::verify::verify_write;
use crate::state::AppState;

/// Profile edits for the signed-in user.
pub struct ProfileService<'a> {
    state: &'a AppState,
}

impl<'a> ProfileService<'a> {
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn repo(&self) -> ProfileRepository<'a> {
        ProfileRepository::new(self.state.tables())
    }

    /// Change the display name.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if `name` is blank.
    /// Returns `AppError::Verification` if the stored name differs.
    #[instrument(skip_all)]
    pub async fn edit_name(&self, name: &str) -> Result<(), AppError> {
        let name = required(name, "Имя не может быть пустым.")?;
        let user = self.state.require_user().await?;
        let repo = self.repo();

        repo.update_username(user.id, name).await?;
        verify_write("edit name", repo.get_username(user.id), |stored| {
            match stored.as_deref() {
                Some(s) if s == name => Ok(()),
                other => Err(format!("stored name {other:?}")),
            }
        })
        .await?;

        self.state
            .update_user(|u| u.name = name.to_string())
            .await?;
        add_breadcrumb("profile", "Edited name", None);
        Ok(())
    }

    /// Change the contact phone.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if `phone` is blank.
    /// Returns `AppError::Verification` if the stored phone differs.
    #[instrument(skip_all)]
    pub async fn edit_phone(&self, phone: &str) -> Result<(), AppError> {
        let phone = required(phone, "Телефон не может быть пустым.")?;
        let user = self.state.require_user().await?;
        let repo = self.repo();

        repo.update_phone(user.id, phone).await?;
        verify_write("edit phone", repo.get_profile(user.id), |stored| {
            match stored.as_ref().and_then(|p| p.phone.as_deref()) {
                Some(s) if s == phone => Ok(()),
                other => Err(format!("stored phone {other:?}")),
            }
        })
        .await?;

        self.state
            .update_user(|u| u.phone = phone.to_string())
            .await?;
        add_breadcrumb("profile", "Edited phone", None);
        Ok(())
    }

    /// Change the preferred payment method.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Verification` if the stored method differs.
    #[instrument(skip_all, fields(pay_method = %pay_method))]
    pub async fn edit_pay_method(&self, pay_method: PayMethod) -> Result<(), AppError> {
        let user = self.state.require_user().await?;
        let repo = self.repo();

        repo.update_pay_method(user.id, pay_method).await?;
        verify_write("edit pay method", repo.get_profile(user.id), |stored| {
            match stored.as_ref().and_then(|p| p.pay_method) {
                Some(m) if m == pay_method => Ok(()),
                other => Err(format!("stored pay method {other:?}")),
            }
        })
        .await?;

        self.state
            .update_user(|u| u.pay_method = pay_method)
            .await?;
        add_breadcrumb("profile", "Edited pay method", Some(&[("pay_method", pay_method.as_str())]));
        Ok(())
    }

    /// Request an email change. Returns whether a confirmation was sent.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if `email` is malformed.
    /// Returns `AuthError::Backend` if the auth service rejects the change.
    #[instrument(skip_all)]
    pub async fn edit_email(&self, email: &str) -> Result<bool, AppError> {
        let email = Email::parse(email).map_err(AuthError::from)?;
        self.state.require_user().await?;

        let change = self
            .state
            .auth()
            .update_email(&email)
            .await
            .map_err(AuthError::from)?;

        tracing::info!(
            confirmation_sent = change.confirmation_sent,
            "Email change requested"
        );
        add_breadcrumb("profile", "Requested email change", None);
        Ok(change.confirmation_sent)
    }
}

fn required<'s>(value: &'s str, message: &str) -> Result<&'s str, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(message.to_string()));
    }
    Ok(value)
}
