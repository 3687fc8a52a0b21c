//! Navigation middleware.
//!
//! The only guard is [`auth::RouteGuard`], which gates protected and
//! guest-only routes on the login state.

pub mod auth;

pub use auth::{Navigation, RouteGuard};
