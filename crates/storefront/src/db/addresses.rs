//! Address repository.

use serde::Deserialize;
use serde_json::{Value, json};

use pizzeria_core::{AddressId, UserId};

use super::{RepositoryError, at_most_one, decode, decode_all};
use crate::backend::{Filter, Table, TableStore};
use crate::models::user::Address;

/// `addresses` row as returned by the store.
#[derive(Debug, Deserialize)]
struct AddressRow {
    id: AddressId,
    address: String,
    #[serde(default)]
    main: Option<bool>,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self::new(row.id, row.address, row.main.unwrap_or(false))
    }
}

fn new_row(user: UserId, place: &str, main: bool) -> Value {
    json!({
        "uuid": user.to_string(),
        "address": place,
        "main": main,
    })
}

/// Repository for a user's delivery addresses.
pub struct AddressRepository<'a> {
    store: &'a dyn TableStore,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(store: &'a dyn TableStore) -> Self {
        Self { store }
    }

    /// All addresses of a user, in store order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a row cannot be decoded.
    pub async fn list(&self, user: UserId) -> Result<Vec<Address>, RepositoryError> {
        let rows = self
            .store
            .select(Table::Addresses, &[Filter::owner(user)])
            .await?;
        let rows: Vec<AddressRow> = decode_all(Table::Addresses, rows)?;
        Ok(rows.into_iter().map(Address::from).collect())
    }

    /// One address of a user by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    pub async fn get(&self, user: UserId, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        let rows = self
            .store
            .select(Table::Addresses, &owned(user, id))
            .await?;
        let row: Option<AddressRow> = at_most_one(Table::Addresses, rows)?;
        Ok(row.map(Address::from))
    }

    /// Insert one address and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the insert fails.
    /// Returns `RepositoryError::DataCorruption` if the store returns no row.
    pub async fn insert(&self, user: UserId, place: &str, main: bool) -> Result<Address, RepositoryError> {
        let rows = self
            .store
            .insert(Table::Addresses, vec![new_row(user, place, main)])
            .await?;
        let row = rows.into_iter().next().ok_or_else(|| {
            RepositoryError::DataCorruption("insert returned no addresses row".to_string())
        })?;
        decode::<AddressRow>(Table::Addresses, row).map(Address::from)
    }

    /// Insert several addresses at once, keeping their `main` flags.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the insert fails.
    pub async fn insert_many(&self, user: UserId, addresses: &[Address]) -> Result<Vec<Address>, RepositoryError> {
        let rows = addresses
            .iter()
            .map(|a| new_row(user, &a.place, a.main))
            .collect();
        let stored = self.store.insert(Table::Addresses, rows).await?;
        let stored: Vec<AddressRow> = decode_all(Table::Addresses, stored)?;
        Ok(stored.into_iter().map(Address::from).collect())
    }

    /// Replace the text of one address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the update fails.
    pub async fn update_place(&self, user: UserId, id: AddressId, place: &str) -> Result<(), RepositoryError> {
        self.store
            .update(Table::Addresses, json!({ "address": place }), &owned(user, id))
            .await?;
        Ok(())
    }

    /// Make `id` the only main address: clear every flag, then set one.
    ///
    /// The two writes are not atomic. If the second fails the user is left
    /// with no main address until the next session bootstrap repairs it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if either write fails.
    pub async fn promote(&self, user: UserId, id: AddressId) -> Result<(), RepositoryError> {
        self.store
            .update(Table::Addresses, json!({ "main": false }), &[Filter::owner(user)])
            .await?;
        self.store
            .update(Table::Addresses, json!({ "main": true }), &owned(user, id))
            .await?;
        Ok(())
    }

    /// Delete one address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the delete fails.
    pub async fn delete(&self, user: UserId, id: AddressId) -> Result<(), RepositoryError> {
        self.store
            .delete(Table::Addresses, &owned(user, id))
            .await?;
        Ok(())
    }

    /// Delete every address of a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the delete fails.
    pub async fn delete_all(&self, user: UserId) -> Result<(), RepositoryError> {
        self.store
            .delete(Table::Addresses, &[Filter::owner(user)])
            .await?;
        Ok(())
    }
}

fn owned(user: UserId, id: AddressId) -> [Filter; 2] {
    [Filter::owner(user), Filter::eq("id", id.as_i64())]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::models::user::main_count;
    use uuid::Uuid;

    fn user() -> UserId {
        UserId::new(Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let backend = MemoryBackend::new();
        let repo = AddressRepository::new(&backend);
        let owner = user();

        let stored = repo.insert(owner, "Ленина 1", false).await.unwrap();
        repo.insert(user(), "Чужой адрес", true).await.unwrap();

        let list = repo.list(owner).await.unwrap();
        assert_eq!(list, vec![stored.clone()]);
        assert_eq!(repo.get(owner, stored.id).await.unwrap(), Some(stored));
    }

    #[tokio::test]
    async fn test_null_main_reads_as_false() {
        let backend = MemoryBackend::new();
        let owner = user();
        backend.seed(
            Table::Addresses,
            vec![json!({"uuid": owner.to_string(), "address": "Мира 5", "main": null})],
        );

        let list = AddressRepository::new(&backend).list(owner).await.unwrap();
        assert!(!list[0].main);
    }

    #[tokio::test]
    async fn test_promote_leaves_one_main() {
        let backend = MemoryBackend::new();
        let repo = AddressRepository::new(&backend);
        let owner = user();
        let a = repo.insert(owner, "a", true).await.unwrap();
        let b = repo.insert(owner, "b", true).await.unwrap();
        let c = repo.insert(owner, "c", false).await.unwrap();

        repo.promote(owner, c.id).await.unwrap();

        let list = repo.list(owner).await.unwrap();
        assert_eq!(main_count(&list), 1);
        assert!(list.iter().find(|x| x.id == c.id).unwrap().main);
        assert!(!list.iter().any(|x| (x.id == a.id || x.id == b.id) && x.main));
    }

    #[tokio::test]
    async fn test_delete_scoped_to_owner() {
        let backend = MemoryBackend::new();
        let repo = AddressRepository::new(&backend);
        let owner = user();
        let other = user();
        let mine = repo.insert(owner, "a", false).await.unwrap();
        repo.insert(other, "b", false).await.unwrap();

        repo.delete(other, mine.id).await.unwrap();
        assert_eq!(repo.list(owner).await.unwrap().len(), 1);

        repo.delete_all(owner).await.unwrap();
        assert!(repo.list(owner).await.unwrap().is_empty());
        assert_eq!(repo.list(other).await.unwrap().len(), 1);
    }
}
