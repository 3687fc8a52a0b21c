//! Navigation guard over a real session.

#![allow(clippy::unwrap_used)]

use pizzeria_integration_tests::TestContext;
use pizzeria_storefront::middleware::{Navigation, RouteGuard};
use pizzeria_storefront::services::AuthService;

#[tokio::test]
async fn test_guard_follows_session() {
    let ctx = TestContext::new();
    ctx.seed_account("ivan@mail.ru", &[("Ленина 1", true)]);
    let guard = RouteGuard::new(&ctx.state);

    assert_eq!(guard.resolve("/orderlist").await, Navigation::Redirect("/login"));
    assert_eq!(guard.resolve("/register").await, Navigation::Allow);

    ctx.login("ivan@mail.ru").await;
    assert_eq!(guard.resolve("/orderlist").await, Navigation::Allow);
    assert_eq!(guard.resolve("/edituser").await, Navigation::Allow);
    assert_eq!(guard.resolve("/register").await, Navigation::Redirect("/"));

    AuthService::new(&ctx.state).logout().await.unwrap();
    assert_eq!(guard.resolve("/edituser").await, Navigation::Redirect("/login"));
    assert_eq!(guard.resolve("/").await, Navigation::Allow);
}
