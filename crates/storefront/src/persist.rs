//! Local persistence of the cart and user snapshots.
//!
//! Two JSON files in a state directory:
//!
//! - `cart.json` - the cart, saved after every cart mutation
//! - `user.json` - the last assembled user, removed on logout
//!
//! A missing file reads as empty state. Writes go to a temporary file that is
//! then renamed over the target, so a crash never leaves a half-written file.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::{Cart, User};

const CART_FILE: &str = "cart.json";
const USER_FILE: &str = "user.json";

/// Errors reading or writing the state directory.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Filesystem access failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored file is not valid JSON for its type.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// JSON files in a state directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// Use `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `PersistError::Io` if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| PersistError::Io {
                path: dir.clone(),
                source,
            })?;
        Ok(Self { dir })
    }

    /// The state directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load the saved cart, or an empty one.
    ///
    /// # Errors
    ///
    /// Returns `PersistError` if the file exists but cannot be read or parsed.
    pub async fn load_cart(&self) -> Result<Cart, PersistError> {
        Ok(self.read(CART_FILE).await?.unwrap_or_default())
    }

    /// Save the cart.
    ///
    /// # Errors
    ///
    /// Returns `PersistError::Io` if the file cannot be written.
    pub async fn save_cart(&self, cart: &Cart) -> Result<(), PersistError> {
        self.write(CART_FILE, cart).await
    }

    /// Load the saved user, if any.
    ///
    /// # Errors
    ///
    /// Returns `PersistError` if the file exists but cannot be read or parsed.
    pub async fn load_user(&self) -> Result<Option<User>, PersistError> {
        self.read(USER_FILE).await
    }

    /// Save the user, or remove the saved one for `None`.
    ///
    /// # Errors
    ///
    /// Returns `PersistError::Io` if the file cannot be written or removed.
    pub async fn save_user(&self, user: Option<&User>) -> Result<(), PersistError> {
        match user {
            Some(user) => self.write(USER_FILE, user).await,
            None => self.remove(USER_FILE).await,
        }
    }

    async fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, PersistError> {
        let path = self.dir.join(name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(PersistError::Io { path, source }),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| PersistError::Json { path, source })
    }

    async fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), PersistError> {
        let path = self.dir.join(name);
        let json = serde_json::to_vec_pretty(value).map_err(|source| PersistError::Json {
            path: path.clone(),
            source,
        })?;

        let tmp = self.dir.join(format!("{name}.tmp"));
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|source| PersistError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| PersistError::Io { path, source })
    }

    async fn remove(&self, name: &str) -> Result<(), PersistError> {
        let path = self.dir.join(name);
        match tokio::fs::remove_file(&path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                Err(PersistError::Io { path, source: e })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::CartItem;
    use crate::models::user::Address;
    use pizzeria_core::{AddressId, Email, PayMethod, Price, UserId};
    use uuid::Uuid;

    fn cart() -> Cart {
        let mut cart = Cart::new();
        cart.add(CartItem {
            heading: "Маргарита".to_string(),
            description: "Классика".to_string(),
            ingredients: "томаты, моцарелла".to_string(),
            price: Price::from_roubles(450),
            weight: 600.0,
            src: "/img/margherita.png".to_string(),
            amount: 2,
        })
        .unwrap();
        cart
    }

    #[tokio::test]
    async fn test_missing_files_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();

        assert!(store.load_cart().await.unwrap().is_empty());
        assert!(store.load_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cart_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();
        store.save_cart(&cart()).await.unwrap();

        let reopened = LocalStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.load_cart().await.unwrap(), cart());
    }

    #[tokio::test]
    async fn test_user_saved_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("nested")).await.unwrap();
        let user = User {
            id: UserId::new(Uuid::new_v4()),
            name: "Иван".to_string(),
            email: Email::parse("ivan@mail.ru").unwrap(),
            phone: "+79990000000".to_string(),
            pay_method: PayMethod::CardOnline,
            addresses: vec![Address::new(AddressId::new(1), "Ленина 1", true)],
        };

        store.save_user(Some(&user)).await.unwrap();
        assert_eq!(store.load_user().await.unwrap(), Some(user));

        store.save_user(None).await.unwrap();
        assert_eq!(store.load_user().await.unwrap(), None);
        store.save_user(None).await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CART_FILE), b"not json").unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();

        assert!(matches!(
            store.load_cart().await,
            Err(PersistError::Json { .. })
        ));
    }
}
