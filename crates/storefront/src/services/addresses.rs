//! Address book reconciliation.
//!
//! Every mutation writes to the backend first and mirrors each write into
//! the user snapshot as soon as it succeeds. When a later step of a
//! multi-write operation fails, the list is reloaded from the backend so the
//! snapshot shows what was actually stored. All operations keep the main
//! address invariant: at most one main, exactly one once any address exists.

use tracing::instrument;

use pizzeria_core::{AddressId, UserId};

use crate::db::AddressRepository;
use crate::error::{AppError, add_breadcrumb};
use crate::models::user::{Address, User, mark_main, normalize_main_flags};
use crate::services::verify::verify_write;
use crate::state::AppState;

/// Address book operations for the signed-in user.
pub struct AddressService<'a> {
    state: &'a AppState,
}

impl<'a> AddressService<'a> {
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn repo(&self) -> AddressRepository<'a> {
        AddressRepository::new(self.state.tables())
    }

    /// Replace the whole address book with `addresses`.
    ///
    /// Entries flagged `deleted` are dropped and the main flags are
    /// normalized before anything is written. The stored set is read back and
    /// must hold the same multiset of place texts; ids are reassigned by the
    /// backend, so entries are compared by text only.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotLoggedIn` if there is no user.
    /// Returns `AppError::Validation` if a kept entry has a blank place.
    /// Returns `AppError::Verification` if the read-back differs.
    #[instrument(skip_all, fields(count = addresses.len()))]
    pub async fn replace_all(&self, addresses: Vec<Address>) -> Result<Vec<Address>, AppError> {
        let user = self.state.require_user().await?;
        let mut keep: Vec<Address> = addresses
            .into_iter()
            .filter(|a| !a.deleted)
            .map(|a| Address {
                place: a.place.trim().to_string(),
                ..a
            })
            .collect();
        if keep.iter().any(|a| a.place.is_empty()) {
            return Err(blank_place());
        }
        if !keep.is_empty() {
            normalize_main_flags(&mut keep);
        }

        self.repo().delete_all(user.id).await?;
        self.state.update_user(|u| u.addresses.clear()).await?;

        let written = self.insert_verified(user.id, &keep).await;
        let stored = self.resync_on_error(user.id, written).await?;

        self.state
            .update_user(|u| u.addresses.clone_from(&stored))
            .await?;
        add_breadcrumb("address", "Replaced addresses", None);
        Ok(stored)
    }

    /// Delete one address.
    ///
    /// If it was the main address and others remain, the first remaining one
    /// is promoted. The deletion is confirmed by reading the row back.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user has no such address.
    /// Returns `AppError::Verification` if the row is still there afterwards.
    #[instrument(skip_all, fields(address_id = %id))]
    pub async fn delete(&self, id: AddressId) -> Result<(), AppError> {
        let user = self.state.require_user().await?;
        let target = find(&user, id)?;
        let successor = if target.main {
            user.addresses.iter().find(|a| a.id != id).map(|a| a.id)
        } else {
            None
        };

        self.repo().delete(user.id, id).await?;
        self.state
            .update_user(|u| u.addresses.retain(|a| a.id != id))
            .await?;

        let finished = self.finish_delete(user.id, id, successor).await;
        self.resync_on_error(user.id, finished).await?;
        add_breadcrumb("address", "Deleted address", Some(&[("address_id", id.to_string().as_str())]));
        Ok(())
    }

    /// Change the text of one address.
    ///
    /// Trusts the update call; there is no read-back.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if `place` is blank.
    /// Returns `AppError::NotFound` if the user has no such address.
    #[instrument(skip_all, fields(address_id = %id))]
    pub async fn edit(&self, id: AddressId, place: &str) -> Result<(), AppError> {
        let place = non_blank(place)?;
        let user = self.state.require_user().await?;
        find(&user, id)?;

        self.repo().update_place(user.id, id, place).await?;

        self.state
            .update_user(|u| {
                if let Some(address) = u.addresses.iter_mut().find(|a| a.id == id) {
                    address.place = place.to_string();
                }
            })
            .await?;
        add_breadcrumb("address", "Edited address", Some(&[("address_id", id.to_string().as_str())]));
        Ok(())
    }

    /// Add an address. The newest address always becomes main.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if `place` is blank.
    /// Returns `AppError::Verification` if the stored text differs.
    #[instrument(skip_all)]
    pub async fn add(&self, place: &str) -> Result<Address, AppError> {
        let place = non_blank(place)?;
        let user = self.state.require_user().await?;

        let inserted = self.repo().insert(user.id, place, false).await?;
        self.state
            .update_user(|u| u.addresses.push(inserted.clone()))
            .await?;

        let finished = self.finish_add(user.id, inserted.id, place).await;
        let address = self.resync_on_error(user.id, finished).await?;
        add_breadcrumb(
            "address",
            "Added address",
            Some(&[("address_id", address.id.to_string().as_str())]),
        );
        Ok(address)
    }

    /// Insert `keep` into an emptied address book and read it back. The
    /// stored rows must hold the same multiset of place texts.
    async fn insert_verified(&self, user: UserId, keep: &[Address]) -> Result<Vec<Address>, AppError> {
        let repo = self.repo();
        if !keep.is_empty() {
            repo.insert_many(user, keep).await?;
        }

        let expected = sorted_places(keep);
        verify_write("replace addresses", repo.list(user), |stored| {
            if stored.len() != keep.len() {
                return Err(format!("expected {} rows, found {}", keep.len(), stored.len()));
            }
            if sorted_places(stored) != expected {
                return Err("stored place texts differ".to_string());
            }
            Ok(())
        })
        .await
    }

    /// Promote the successor of a deleted main address and confirm the row
    /// is gone.
    async fn finish_delete(&self, user: UserId, id: AddressId, successor: Option<AddressId>) -> Result<(), AppError> {
        let repo = self.repo();
        if let Some(next) = successor {
            tracing::info!(address_id = %next, "Promoting next address after deleting main");
            repo.promote(user, next).await?;
            self.state
                .update_user(|u| mark_main(&mut u.addresses, next))
                .await?;
        }

        verify_write("delete address", repo.get(user, id), |row| match row {
            None => Ok(()),
            Some(_) => Err("row still present".to_string()),
        })
        .await?;
        Ok(())
    }

    /// Promote a freshly inserted address and confirm its stored text.
    async fn finish_add(&self, user: UserId, id: AddressId, place: &str) -> Result<Address, AppError> {
        self.promote(user, id).await?;
        self.state
            .update_user(|u| mark_main(&mut u.addresses, id))
            .await?;

        let stored = verify_write("add address", self.repo().get(user, id), |row| match row {
            Some(a) if a.place == place => Ok(()),
            Some(a) => Err(format!("stored text {:?}", a.place)),
            None => Err("row missing".to_string()),
        })
        .await?;
        Ok(Address::new(id, stored.map_or_else(|| place.to_string(), |a| a.place), true))
    }

    /// Pass `result` through, reloading the snapshot's address list from the
    /// backend first if it is an error.
    async fn resync_on_error<T>(&self, user: UserId, result: Result<T, AppError>) -> Result<T, AppError> {
        if result.is_err() {
            match self.repo().list(user).await {
                Ok(stored) => {
                    if let Err(e) = self.state.update_user(|u| u.addresses = stored).await {
                        tracing::warn!(error = %e, "Could not mirror reloaded addresses");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Could not reload addresses after a failed write"),
            }
        }
        result
    }

    /// Make `id` the user's only main address on the backend.
    ///
    /// Two writes without a transaction: if the second one fails the user
    /// has no main address until the next session bootstrap repairs it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Repository` if either write fails.
    #[instrument(skip(self))]
    pub async fn promote(&self, user: UserId, id: AddressId) -> Result<(), AppError> {
        self.repo().promote(user, id).await?;
        Ok(())
    }

    /// Make one of the user's addresses main, on the backend and locally.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user has no such address.
    /// Returns `AppError::Repository` if a write fails.
    #[instrument(skip_all, fields(address_id = %id))]
    pub async fn set_main(&self, id: AddressId) -> Result<(), AppError> {
        let user = self.state.require_user().await?;
        find(&user, id)?;

        self.promote(user.id, id).await?;

        self.state
            .update_user(|u| mark_main(&mut u.addresses, id))
            .await?;
        add_breadcrumb("address", "Set main address", Some(&[("address_id", id.to_string().as_str())]));
        Ok(())
    }
}

fn find(user: &User, id: AddressId) -> Result<&Address, AppError> {
    user.address(id)
        .ok_or_else(|| AppError::NotFound(format!("address {id}")))
}

fn non_blank(place: &str) -> Result<&str, AppError> {
    let place = place.trim();
    if place.is_empty() {
        return Err(blank_place());
    }
    Ok(place)
}

fn blank_place() -> AppError {
    AppError::Validation("Адрес не может быть пустым.".to_string())
}

fn sorted_places(addresses: &[Address]) -> Vec<&str> {
    let mut places: Vec<&str> = addresses.iter().map(|a| a.place.as_str()).collect();
    places.sort_unstable();
    places
}
