//! Cart bounds and order submission.

#![allow(clippy::unwrap_used)]

use serde_json::json;

use pizzeria_core::Price;
use pizzeria_integration_tests::TestContext;
use pizzeria_storefront::AppError;
use pizzeria_storefront::backend::Table;
use pizzeria_storefront::backend::memory::Operation;
use pizzeria_storefront::models::{CartError, CartItem, OrderDraft};
use pizzeria_storefront::services::{MenuService, OrderService};

async fn with_menu() -> TestContext {
    let ctx = TestContext::new();
    ctx.backend.seed(
        Table::Items,
        vec![
            json!({"heading": "Маргарита", "itemType": "pizza", "price": 450, "weight": 600}),
            json!({"heading": "Кола", "itemType": "drink", "price": 120, "weight": 500}),
        ],
    );
    MenuService::new(&ctx.state).fetch().await.unwrap();
    ctx
}

async fn add_from_menu(ctx: &TestContext, heading: &str, amount: u32) {
    let menu = ctx.state.menu().await;
    let item = CartItem::from_menu(menu.find(heading).unwrap(), amount);
    ctx.state.update_cart(|c| c.add(item)).await.unwrap();
}

#[tokio::test]
async fn test_adding_same_item_merges_amounts() {
    let ctx = with_menu().await;
    add_from_menu(&ctx, "Маргарита", 2).await;
    add_from_menu(&ctx, "Маргарита", 3).await;
    add_from_menu(&ctx, "Кола", 1).await;

    let cart = ctx.state.cart().await;
    assert_eq!(cart.items().len(), 2);
    assert_eq!(cart.get("Маргарита").unwrap().amount, 5);
    assert_eq!(cart.items_count(), 6);
    assert_eq!(cart.sum(), Price::from_roubles(5 * 450 + 120));
}

#[tokio::test]
async fn test_amount_bounds_leave_cart_unchanged() {
    let ctx = with_menu().await;
    add_from_menu(&ctx, "Маргарита", 99).await;
    add_from_menu(&ctx, "Кола", 1).await;
    let before = ctx.state.cart().await;

    let err = ctx
        .state
        .update_cart(|c| c.increment("Маргарита"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Cart(CartError::AmountOutOfRange { .. })));

    let err = ctx
        .state
        .update_cart(|c| c.decrement("Кола"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Cart(CartError::AmountOutOfRange { .. })));

    assert_eq!(ctx.state.cart().await, before);
}

#[tokio::test]
async fn test_submit_clears_cart_and_records_order() {
    let ctx = with_menu().await;
    let id = ctx.seed_account("ivan@mail.ru", &[("Ленина 1", true)]);
    let user = ctx.login("ivan@mail.ru").await;
    add_from_menu(&ctx, "Маргарита", 2).await;
    add_from_menu(&ctx, "Кола", 1).await;

    let order = OrderService::new(&ctx.state)
        .submit(&OrderDraft::for_user(&user))
        .await
        .unwrap();

    assert_eq!(order.total_price, Price::from_roubles(2 * 450 + 120));
    assert_eq!(order.contents.len(), 2);
    assert_eq!(order.address, "Ленина 1");
    assert!(ctx.state.cart().await.is_empty());

    let rows = ctx.backend.rows(Table::Orders);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["uuid"], json!(id.to_string()));

    let history = OrderService::new(&ctx.state).fetch().await.unwrap();
    assert_eq!(history, vec![order]);
}

#[tokio::test]
async fn test_submit_failure_keeps_cart() {
    let ctx = with_menu().await;
    ctx.seed_account("ivan@mail.ru", &[("Ленина 1", true)]);
    let user = ctx.login("ivan@mail.ru").await;
    add_from_menu(&ctx, "Маргарита", 2).await;
    let before = ctx.state.cart().await;

    ctx.backend.fail(Table::Orders, Operation::Insert);
    let result = OrderService::new(&ctx.state)
        .submit(&OrderDraft::for_user(&user))
        .await;

    assert!(result.is_err());
    assert_eq!(ctx.state.cart().await, before);
    assert!(ctx.state.orders().await.is_empty());
    assert!(ctx.backend.rows(Table::Orders).is_empty());
}

#[tokio::test]
async fn test_cart_survives_logout() {
    let ctx = with_menu().await;
    ctx.seed_account("ivan@mail.ru", &[("Ленина 1", true)]);
    ctx.login("ivan@mail.ru").await;
    add_from_menu(&ctx, "Кола", 3).await;

    pizzeria_storefront::services::AuthService::new(&ctx.state)
        .logout()
        .await
        .unwrap();

    assert_eq!(ctx.state.cart().await.get("Кола").unwrap().amount, 3);
}
