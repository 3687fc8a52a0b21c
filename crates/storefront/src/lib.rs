//! Pizzeria client data layer.
//!
//! Everything the food-ordering front end needs below the UI: session
//! handling against the hosted auth service, the address book with its
//! single-main invariant, profile edits, the cart, checkout and the menu.
//!
//! # Usage
//!
//! ```rust,ignore
//! let config = ClientConfig::from_env()?;
//! let state = AppState::from_config(&config).await?;
//!
//! AuthService::new(&state).login("ivan@mail.ru", &password).await?;
//! AddressService::new(&state).add("Ленина 1").await?;
//! let menu = MenuService::new(&state).fetch().await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod persist;
pub mod services;
pub mod state;

pub use config::ClientConfig;
pub use error::{AppError, Result};
pub use state::AppState;
