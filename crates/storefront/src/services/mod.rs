//! Business logic services for the client data layer.
//!
//! # Services
//!
//! - `auth` - Login, sign-up, session restore, logout
//! - `session` - Session bootstrap shared by the auth flows
//! - `addresses` - Address book reconciliation
//! - `profile` - Name, phone, payment method and email edits
//! - `orders` - Order history and checkout
//! - `menu` - Menu catalog with caching
//! - `verify` - Read-after-write verification
//!
//! Services are short-lived views over an [`AppState`](crate::state::AppState):
//!
//! ```rust,ignore
//! let user = AuthService::new(&state).login(email, &password).await?;
//! AddressService::new(&state).add("Ленина 1").await?;
//! ```

pub mod addresses;
pub mod auth;
pub mod menu;
pub mod orders;
pub mod profile;
pub mod session;
pub mod verify;

pub use addresses::AddressService;
pub use auth::{AuthError, AuthService};
pub use menu::MenuService;
pub use orders::OrderService;
pub use profile::ProfileService;
pub use session::SessionAssembler;
pub use verify::{VerificationError, verify_write};
