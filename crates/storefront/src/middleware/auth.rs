//! Route guard.
//!
//! Decides whether a navigation may proceed given the login state:
//!
//! - protected routes (`/edituser`, `/orderlist`) redirect to `/login` when
//!   logged out
//! - guest-only routes (`/login`, `/register`) redirect to `/` when logged in
//!
//! [`RouteGuard::resolve`] refreshes the login state from the auth backend
//! before deciding.

use crate::services::AuthService;
use crate::state::AppState;

/// Routes that need a signed-in user.
pub const PROTECTED_ROUTES: &[&str] = &["/edituser", "/orderlist"];

/// Routes only shown to guests.
pub const GUEST_ROUTES: &[&str] = &["/login", "/register"];

/// Where login redirects go.
pub const LOGIN_ROUTE: &str = "/login";

/// Where signed-in users are sent away from guest routes.
pub const HOME_ROUTE: &str = "/";

/// Outcome of a guarded navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Proceed to the requested path.
    Allow,
    /// Go here instead.
    Redirect(&'static str),
}

/// Navigation guard.
pub struct RouteGuard<'a> {
    state: &'a AppState,
}

impl<'a> RouteGuard<'a> {
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Decide for a known login state.
    #[must_use]
    pub fn check(path: &str, logged_in: bool) -> Navigation {
        let path = normalize(path);
        if !logged_in && PROTECTED_ROUTES.contains(&path) {
            return Navigation::Redirect(LOGIN_ROUTE);
        }
        if logged_in && GUEST_ROUTES.contains(&path) {
            return Navigation::Redirect(HOME_ROUTE);
        }
        Navigation::Allow
    }

    /// Refresh the session, then decide.
    ///
    /// A failed refresh counts as logged out.
    pub async fn resolve(&self, path: &str) -> Navigation {
        let logged_in = match AuthService::new(self.state).restore().await {
            Ok(user) => user.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, path, "Session refresh failed, treating as logged out");
                false
            }
        };

        let navigation = Self::check(path, logged_in);
        if let Navigation::Redirect(to) = navigation {
            tracing::debug!(from = path, to, "Redirecting");
        }
        navigation
    }
}

/// Drop the query string, fragment and a trailing slash.
fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use secrecy::SecretString;

    use crate::backend::memory::MemoryBackend;
    use crate::models::SignupCredentials;

    #[test]
    fn test_check_protected() {
        assert_eq!(RouteGuard::check("/edituser", false), Navigation::Redirect("/login"));
        assert_eq!(RouteGuard::check("/orderlist/", false), Navigation::Redirect("/login"));
        assert_eq!(RouteGuard::check("/orderlist?page=2", false), Navigation::Redirect("/login"));
        assert_eq!(RouteGuard::check("/edituser", true), Navigation::Allow);
    }

    #[test]
    fn test_check_guest_only() {
        assert_eq!(RouteGuard::check("/login", true), Navigation::Redirect("/"));
        assert_eq!(RouteGuard::check("/register", true), Navigation::Redirect("/"));
        assert_eq!(RouteGuard::check("/login", false), Navigation::Allow);
    }

    #[test]
    fn test_check_public() {
        assert_eq!(RouteGuard::check("/", false), Navigation::Allow);
        assert_eq!(RouteGuard::check("/cart", true), Navigation::Allow);
    }

    #[tokio::test]
    async fn test_resolve_refreshes_session() {
        let backend = Arc::new(MemoryBackend::new());
        let state = AppState::new(backend.clone());
        let guard = RouteGuard::new(&state);

        assert_eq!(guard.resolve("/edituser").await, Navigation::Redirect("/login"));

        AuthService::new(&state)
            .signup(&SignupCredentials {
                email: "ivan@mail.ru".to_string(),
                password: SecretString::from("secret1".to_string()),
                username: "ivan".to_string(),
                phone: "+79990000000".to_string(),
                address: "Ленина 1".to_string(),
            })
            .await
            .unwrap();
        state.set_user(None).await;

        assert_eq!(guard.resolve("/edituser").await, Navigation::Allow);
        assert!(state.is_logged_in().await);
        assert_eq!(guard.resolve("/login").await, Navigation::Redirect("/"));
    }

    #[tokio::test]
    async fn test_resolve_failure_counts_as_logged_out() {
        let backend = Arc::new(MemoryBackend::new());
        backend.register("ivan@mail.ru", "secret1");
        let state = AppState::new(backend.clone());
        AuthService::new(&state)
            .login("ivan@mail.ru", &SecretString::from("secret1".to_string()))
            .await
            .unwrap_err();

        // Signed in at the auth service but without profile rows, so the
        // session cannot be assembled.
        assert_eq!(
            RouteGuard::new(&state).resolve("/orderlist").await,
            Navigation::Redirect("/login")
        );
    }
}
