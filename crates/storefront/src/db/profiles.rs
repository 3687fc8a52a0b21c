//! Profile repository: the `userdata` and `usernames` tables.

use serde::Deserialize;
use serde_json::json;

use pizzeria_core::{PayMethod, UserId};

use super::{RepositoryError, at_most_one};
use crate::backend::{Filter, Table, TableStore};

/// `userdata` row. Columns are nullable in the schema; required-field checks
/// happen when the session is assembled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileRow {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, rename = "paymethod")]
    pub pay_method: Option<PayMethod>,
}

#[derive(Debug, Deserialize)]
struct UsernameRow {
    #[serde(default)]
    uuid: Option<UserId>,
    #[serde(default)]
    username: Option<String>,
}

/// Repository for per-user profile rows.
pub struct ProfileRepository<'a> {
    store: &'a dyn TableStore,
}

impl<'a> ProfileRepository<'a> {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(store: &'a dyn TableStore) -> Self {
        Self { store }
    }

    /// The user's `userdata` row, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the row cannot be decoded
    /// (e.g. an unknown payment method) or there is more than one.
    pub async fn get_profile(&self, user: UserId) -> Result<Option<ProfileRow>, RepositoryError> {
        let rows = self
            .store
            .select(Table::UserData, &[Filter::owner(user)])
            .await?;
        at_most_one(Table::UserData, rows)
    }

    /// The user's display name, if a `usernames` row exists and is non-null.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    pub async fn get_username(&self, user: UserId) -> Result<Option<String>, RepositoryError> {
        let rows = self
            .store
            .select(Table::Usernames, &[Filter::owner(user)])
            .await?;
        let row: Option<UsernameRow> = at_most_one(Table::Usernames, rows)?;
        Ok(row.and_then(|r| r.username))
    }

    /// Owner of a display name, if taken.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<UserId>, RepositoryError> {
        let rows = self
            .store
            .select(Table::Usernames, &[Filter::eq("username", username)])
            .await?;
        let row: Option<UsernameRow> = at_most_one(Table::Usernames, rows)?;
        Ok(row.and_then(|r| r.uuid))
    }

    /// Create the `userdata` row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the insert fails.
    pub async fn insert_profile(&self, user: UserId, phone: &str, pay_method: PayMethod) -> Result<(), RepositoryError> {
        self.store
            .insert(
                Table::UserData,
                vec![json!({
                    "uuid": user.to_string(),
                    "phone": phone,
                    "paymethod": pay_method.as_str(),
                })],
            )
            .await?;
        Ok(())
    }

    /// Create the `usernames` row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the insert fails.
    pub async fn insert_username(&self, user: UserId, username: &str) -> Result<(), RepositoryError> {
        self.store
            .insert(
                Table::Usernames,
                vec![json!({ "uuid": user.to_string(), "username": username })],
            )
            .await?;
        Ok(())
    }

    /// Change the display name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the update fails.
    pub async fn update_username(&self, user: UserId, username: &str) -> Result<(), RepositoryError> {
        self.store
            .update(Table::Usernames, json!({ "username": username }), &[Filter::owner(user)])
            .await?;
        Ok(())
    }

    /// Change the contact phone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the update fails.
    pub async fn update_phone(&self, user: UserId, phone: &str) -> Result<(), RepositoryError> {
        self.store
            .update(Table::UserData, json!({ "phone": phone }), &[Filter::owner(user)])
            .await?;
        Ok(())
    }

    /// Change the preferred payment method.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the update fails.
    pub async fn update_pay_method(&self, user: UserId, pay_method: PayMethod) -> Result<(), RepositoryError> {
        self.store
            .update(
                Table::UserData,
                json!({ "paymethod": pay_method.as_str() }),
                &[Filter::owner(user)],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_profile_round_trip() {
        let backend = MemoryBackend::new();
        let repo = ProfileRepository::new(&backend);
        let user = UserId::new(Uuid::new_v4());

        assert_eq!(repo.get_profile(user).await.unwrap(), None);

        repo.insert_profile(user, "+79990000000", PayMethod::CardOnline)
            .await
            .unwrap();
        repo.update_pay_method(user, PayMethod::Cash).await.unwrap();

        let profile = repo.get_profile(user).await.unwrap().unwrap();
        assert_eq!(profile.phone.as_deref(), Some("+79990000000"));
        assert_eq!(profile.pay_method, Some(PayMethod::Cash));
    }

    #[tokio::test]
    async fn test_unknown_pay_method_is_corruption() {
        let backend = MemoryBackend::new();
        let user = UserId::new(Uuid::new_v4());
        backend.seed(
            Table::UserData,
            vec![json!({"uuid": user.to_string(), "phone": "1", "paymethod": "bitcoin"})],
        );

        let err = ProfileRepository::new(&backend)
            .get_profile(user)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
    }

    #[tokio::test]
    async fn test_username_lookup() {
        let backend = MemoryBackend::new();
        let repo = ProfileRepository::new(&backend);
        let user = UserId::new(Uuid::new_v4());

        repo.insert_username(user, "ivan").await.unwrap();
        assert_eq!(repo.get_username(user).await.unwrap().as_deref(), Some("ivan"));
        assert_eq!(repo.find_by_username("ivan").await.unwrap(), Some(user));
        assert_eq!(repo.find_by_username("petr").await.unwrap(), None);

        repo.update_username(user, "ivan2").await.unwrap();
        assert_eq!(repo.find_by_username("ivan").await.unwrap(), None);
    }
}
