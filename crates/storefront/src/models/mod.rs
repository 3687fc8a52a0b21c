//! Domain models for the client data layer.
//!
//! These are the validated in-process snapshots held by
//! [`AppState`](crate::state::AppState). Backend row types live in
//! [`crate::db`] and are converted into these at the repository boundary.

pub mod cart;
pub mod menu;
pub mod order;
pub mod user;

pub use cart::{Cart, CartError, CartItem, SelectedItem};
pub use menu::{Menu, MenuItem};
pub use order::{Order, OrderDraft, OrderLine};
pub use user::{Address, SignupCredentials, User};
