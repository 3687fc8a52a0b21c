//! Application state shared across services.
//!
//! One [`AppState`] is created at process start and handed to every service.
//! It owns the backend handle and the in-process snapshots (user, cart,
//! orders, menu). The user snapshot is only ever replaced wholesale on
//! login/logout or edited in place by the services; nothing else writes it.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::RwLock;

use crate::backend::{AuthBackend, Backend, RestBackend, TableStore};
use crate::config::ClientConfig;
use crate::error::AppError;
use crate::models::{Cart, CartError, Menu, Order, User};
use crate::persist::{LocalStore, PersistError};

/// How long a fetched menu is served from cache.
const MENU_TTL: Duration = Duration::from_secs(300);

/// Application state shared across all services.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    backend: Arc<dyn Backend>,
    local: Option<LocalStore>,
    menu_cache: Cache<&'static str, Menu>,
    user: RwLock<Option<User>>,
    cart: RwLock<Cart>,
    orders: RwLock<Vec<Order>>,
    menu: RwLock<Menu>,
}

impl AppState {
    /// Create state with empty snapshots and no local persistence.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::build(backend, None, None, Cart::new())
    }

    /// Create state backed by a state directory, loading the saved cart and
    /// user.
    ///
    /// # Errors
    ///
    /// Returns `PersistError` if a saved file exists but cannot be read.
    pub async fn with_local_store(backend: Arc<dyn Backend>, local: LocalStore) -> Result<Self, PersistError> {
        let cart = local.load_cart().await?;
        let user = local.load_user().await?;
        tracing::debug!(
            dir = %local.dir().display(),
            cart_items = cart.items().len(),
            has_user = user.is_some(),
            "Loaded local state"
        );
        Ok(Self::build(backend, Some(local), user, cart))
    }

    /// Create state from configuration: a [`RestBackend`] plus local
    /// persistence when a state directory is configured.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Backend` if the HTTP client cannot be built.
    /// Returns `AppError::Persist` if the state directory cannot be used.
    pub async fn from_config(config: &ClientConfig) -> Result<Self, AppError> {
        let backend: Arc<dyn Backend> = Arc::new(RestBackend::new(&config.backend)?);
        match &config.state_dir {
            Some(dir) => {
                let local = LocalStore::open(dir).await?;
                Ok(Self::with_local_store(backend, local).await?)
            }
            None => Ok(Self::new(backend)),
        }
    }

    fn build(backend: Arc<dyn Backend>, local: Option<LocalStore>, user: Option<User>, cart: Cart) -> Self {
        let menu_cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(MENU_TTL)
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                backend,
                local,
                menu_cache,
                user: RwLock::new(user),
                cart: RwLock::new(cart),
                orders: RwLock::new(Vec::new()),
                menu: RwLock::new(Menu::default()),
            }),
        }
    }

    /// The authentication collaborator.
    #[must_use]
    pub fn auth(&self) -> &dyn AuthBackend {
        self.inner.backend.auth()
    }

    /// The relational store collaborator.
    #[must_use]
    pub fn tables(&self) -> &dyn TableStore {
        self.inner.backend.tables()
    }

    pub(crate) fn menu_cache(&self) -> &Cache<&'static str, Menu> {
        &self.inner.menu_cache
    }

    // =========================================================================
    // User
    // =========================================================================

    /// The current user snapshot.
    pub async fn user(&self) -> Option<User> {
        self.inner.user.read().await.clone()
    }

    /// The current user snapshot, or `NotLoggedIn`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotLoggedIn` if there is no user.
    pub async fn require_user(&self) -> Result<User, AppError> {
        self.user().await.ok_or(AppError::NotLoggedIn)
    }

    pub async fn is_logged_in(&self) -> bool {
        self.inner.user.read().await.is_some()
    }

    /// Replace the user snapshot.
    pub async fn set_user(&self, user: Option<User>) {
        let mut guard = self.inner.user.write().await;
        *guard = user;
        self.save_user(guard.as_ref()).await;
    }

    /// Edit the user snapshot in place.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotLoggedIn` if there is no user.
    pub async fn update_user<R>(&self, f: impl FnOnce(&mut User) -> R) -> Result<R, AppError> {
        let mut guard = self.inner.user.write().await;
        let user = guard.as_mut().ok_or(AppError::NotLoggedIn)?;
        let result = f(user);
        self.save_user(guard.as_ref()).await;
        Ok(result)
    }

    async fn save_user(&self, user: Option<&User>) {
        if let Some(local) = &self.inner.local
            && let Err(e) = local.save_user(user).await
        {
            tracing::warn!(error = %e, "Failed to persist user snapshot");
        }
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// The current cart.
    pub async fn cart(&self) -> Cart {
        self.inner.cart.read().await.clone()
    }

    /// Apply a cart operation and persist the result.
    ///
    /// A failing operation leaves the cart unchanged and nothing is saved.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Cart` if the operation is rejected.
    pub async fn update_cart<R>(&self, f: impl FnOnce(&mut Cart) -> Result<R, CartError>) -> Result<R, AppError> {
        let mut guard = self.inner.cart.write().await;
        let result = f(&mut *guard)?;
        if let Some(local) = &self.inner.local
            && let Err(e) = local.save_cart(&guard).await
        {
            tracing::warn!(error = %e, "Failed to persist cart");
        }
        Ok(result)
    }

    // =========================================================================
    // Orders & menu
    // =========================================================================

    /// The orders last fetched for the current user.
    pub async fn orders(&self) -> Vec<Order> {
        self.inner.orders.read().await.clone()
    }

    pub async fn set_orders(&self, orders: Vec<Order>) {
        *self.inner.orders.write().await = orders;
    }

    /// The menu last fetched.
    pub async fn menu(&self) -> Menu {
        self.inner.menu.read().await.clone()
    }

    pub async fn set_menu(&self, menu: Menu) {
        *self.inner.menu.write().await = menu;
    }
}
