//! Integration tests for the Pizzeria client data layer.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p pizzeria-integration-tests
//! ```
//!
//! Every scenario runs the real services against the in-memory backend, so
//! no network or hosted project is needed.
//!
//! # Test Categories
//!
//! - `addresses` - Address book reconciliation and the single-main invariant
//! - `session` - Login, restore and the bootstrap repair
//! - `checkout` - Cart bounds and order submission
//! - `route_guard` - Protected and guest-only navigation

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::{Value, json};

use pizzeria_core::UserId;
use pizzeria_storefront::AppState;
use pizzeria_storefront::backend::Table;
use pizzeria_storefront::backend::memory::MemoryBackend;
use pizzeria_storefront::models::User;
use pizzeria_storefront::services::AuthService;

/// Default password for seeded accounts.
pub const PASSWORD: &str = "secret1";

/// A backend plus a client state wired to it.
pub struct TestContext {
    pub backend: Arc<MemoryBackend>,
    pub state: AppState,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        let backend = Arc::new(MemoryBackend::new());
        let state = AppState::new(backend.clone());
        Self { backend, state }
    }

    /// Register an account with complete profile rows and the given
    /// addresses as `(place, main)`, in store order.
    pub fn seed_account(&self, email: &str, addresses: &[(&str, bool)]) -> UserId {
        let id = self.backend.register(email, PASSWORD);
        let uuid = id.to_string();
        self.backend.seed(
            Table::UserData,
            vec![json!({"uuid": uuid, "phone": "+79990000000", "paymethod": "card-online"})],
        );
        self.backend.seed(
            Table::Usernames,
            vec![json!({"uuid": uuid, "username": "Иван"})],
        );
        self.backend.seed(
            Table::Addresses,
            addresses
                .iter()
                .map(|(place, main)| json!({"uuid": uuid, "address": place, "main": main}))
                .collect(),
        );
        id
    }

    /// Sign in with [`PASSWORD`].
    ///
    /// # Panics
    ///
    /// Panics if the login fails.
    pub async fn login(&self, email: &str) -> User {
        AuthService::new(&self.state)
            .login(email, &SecretString::from(PASSWORD.to_string()))
            .await
            .expect("login failed")
    }

    /// Address rows stored for `user`, in store order.
    #[must_use]
    pub fn remote_addresses(&self, user: UserId) -> Vec<Value> {
        let uuid = json!(user.to_string());
        self.backend
            .rows(Table::Addresses)
            .into_iter()
            .filter(|row| row["uuid"] == uuid)
            .collect()
    }

    /// Place texts of the stored main addresses of `user`.
    #[must_use]
    pub fn remote_mains(&self, user: UserId) -> Vec<String> {
        self.remote_addresses(user)
            .iter()
            .filter(|row| row["main"] == json!(true))
            .filter_map(|row| row["address"].as_str().map(str::to_string))
            .collect()
    }
}
