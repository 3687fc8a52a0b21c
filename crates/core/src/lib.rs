//! Pizzeria Core - Shared domain types.
//!
//! This crate provides the types used across all Pizzeria components:
//! - `storefront` - Client data layer (auth, addresses, cart, orders, menu)
//! - `cli` - Developer command-line tool
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no
//! backend access. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, emails, and enumerations

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
