//! Menu retrieval.
//!
//! The catalog changes rarely, so a fetched [`Menu`] is served from a `moka`
//! cache for five minutes.

use tracing::{debug, instrument};

use crate::db::MenuRepository;
use crate::error::AppError;
use crate::models::Menu;
use crate::state::AppState;

const CACHE_KEY: &str = "menu";

/// Menu catalog access.
pub struct MenuService<'a> {
    state: &'a AppState,
}

impl<'a> MenuService<'a> {
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// The menu, from cache when fresh. Also stored in the state.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Repository` if the catalog cannot be loaded.
    #[instrument(skip_all)]
    pub async fn fetch(&self) -> Result<Menu, AppError> {
        if let Some(menu) = self.state.menu_cache().get(&CACHE_KEY).await {
            debug!("Cache hit for menu");
            self.state.set_menu(menu.clone()).await;
            return Ok(menu);
        }

        let items = MenuRepository::new(self.state.tables()).list_all().await?;
        let menu = Menu::from_items(items);
        debug!(
            pizzas = menu.pizzas.len(),
            drinks = menu.drinks.len(),
            snacks = menu.snacks.len(),
            "Fetched menu"
        );

        self.state
            .menu_cache()
            .insert(CACHE_KEY, menu.clone())
            .await;
        self.state.set_menu(menu.clone()).await;
        Ok(menu)
    }

    /// Drop the cached menu and fetch it again.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Repository` if the catalog cannot be loaded.
    pub async fn refresh(&self) -> Result<Menu, AppError> {
        self.state.menu_cache().invalidate(&CACHE_KEY).await;
        self.fetch().await
    }
}
