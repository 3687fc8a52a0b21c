//! Address book reconciliation against the in-memory backend.

#![allow(clippy::unwrap_used)]

use pizzeria_core::AddressId;
use pizzeria_integration_tests::TestContext;
use pizzeria_storefront::AppError;
use pizzeria_storefront::backend::Table;
use pizzeria_storefront::backend::memory::Operation;
use pizzeria_storefront::models::Address;
use pizzeria_storefront::services::AddressService;

fn draft(place: &str, main: bool) -> Address {
    let mut address = Address::new(AddressId::new(0), place, main);
    address.is_new = true;
    address
}

fn sorted(mut places: Vec<String>) -> Vec<String> {
    places.sort();
    places
}

#[tokio::test]
async fn test_replace_all_keeps_place_multiset() {
    let ctx = TestContext::new();
    let id = ctx.seed_account("ivan@mail.ru", &[("Старый 1", true)]);
    ctx.login("ivan@mail.ru").await;

    let input = vec![
        draft("Ленина 1", false),
        draft("Мира 5", true),
        draft("Ленина 1", false),
    ];
    let stored = AddressService::new(&ctx.state)
        .replace_all(input)
        .await
        .unwrap();

    let remote: Vec<String> = ctx
        .remote_addresses(id)
        .iter()
        .map(|row| row["address"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(remote.len(), 3);
    assert_eq!(
        sorted(remote),
        sorted(vec!["Ленина 1".into(), "Ленина 1".into(), "Мира 5".into()])
    );
    assert_eq!(ctx.remote_mains(id), vec!["Мира 5".to_string()]);

    let local = ctx.state.user().await.unwrap().addresses;
    assert_eq!(local, stored);
    assert_eq!(local.iter().filter(|a| a.main).count(), 1);
}

#[tokio::test]
async fn test_replace_all_drops_deleted_entries() {
    let ctx = TestContext::new();
    let id = ctx.seed_account("ivan@mail.ru", &[("Старый 1", true)]);
    let user = ctx.login("ivan@mail.ru").await;

    let mut old = user.addresses[0].clone();
    old.deleted = true;
    AddressService::new(&ctx.state)
        .replace_all(vec![old, draft("Новый 2", false)])
        .await
        .unwrap();

    // The only survivor becomes main even though the form left it unflagged.
    assert_eq!(ctx.remote_mains(id), vec!["Новый 2".to_string()]);
    assert_eq!(ctx.remote_addresses(id).len(), 1);
}

#[tokio::test]
async fn test_replace_all_with_nothing_clears_book() {
    let ctx = TestContext::new();
    let id = ctx.seed_account("ivan@mail.ru", &[("Ленина 1", true), ("Мира 5", false)]);
    ctx.login("ivan@mail.ru").await;

    let stored = AddressService::new(&ctx.state)
        .replace_all(Vec::new())
        .await
        .unwrap();

    assert!(stored.is_empty());
    assert!(ctx.remote_addresses(id).is_empty());
    assert!(ctx.state.user().await.unwrap().addresses.is_empty());
}

#[tokio::test]
async fn test_set_main_leaves_exactly_one_main() {
    let ctx = TestContext::new();
    let id = ctx.seed_account(
        "ivan@mail.ru",
        &[("Ленина 1", true), ("Мира 5", false), ("Невский 3", false)],
    );
    let user = ctx.login("ivan@mail.ru").await;
    let target = user.addresses[2].id;

    AddressService::new(&ctx.state).set_main(target).await.unwrap();

    assert_eq!(ctx.remote_mains(id), vec!["Невский 3".to_string()]);
    let local = ctx.state.user().await.unwrap();
    assert_eq!(local.main_address().unwrap().id, target);
    assert_eq!(local.addresses.iter().filter(|a| a.main).count(), 1);
}

#[tokio::test]
async fn test_delete_main_of_two_promotes_other() {
    let ctx = TestContext::new();
    let id = ctx.seed_account("ivan@mail.ru", &[("Ленина 1", true), ("Мира 5", false)]);
    let user = ctx.login("ivan@mail.ru").await;
    let (main, other) = (user.addresses[0].id, user.addresses[1].id);

    AddressService::new(&ctx.state).delete(main).await.unwrap();

    assert_eq!(ctx.remote_mains(id), vec!["Мира 5".to_string()]);
    let local = ctx.state.user().await.unwrap();
    assert_eq!(local.addresses.len(), 1);
    assert_eq!(local.addresses[0].id, other);
    assert!(local.addresses[0].main);
}

#[tokio::test]
async fn test_add_becomes_only_main() {
    let ctx = TestContext::new();
    let id = ctx.seed_account("ivan@mail.ru", &[("Ленина 1", true)]);
    ctx.login("ivan@mail.ru").await;

    let added = AddressService::new(&ctx.state).add("  Мира 5 ").await.unwrap();

    assert_eq!(added.place, "Мира 5");
    assert_eq!(ctx.remote_mains(id), vec!["Мира 5".to_string()]);
    let local = ctx.state.user().await.unwrap();
    assert_eq!(local.addresses.len(), 2);
    assert_eq!(local.main_address().unwrap().id, added.id);
}

#[tokio::test]
async fn test_edit_changes_text_only() {
    let ctx = TestContext::new();
    let id = ctx.seed_account("ivan@mail.ru", &[("Ленина 1", true), ("Мира 5", false)]);
    let user = ctx.login("ivan@mail.ru").await;

    AddressService::new(&ctx.state)
        .edit(user.addresses[1].id, "Мира 7")
        .await
        .unwrap();

    assert_eq!(ctx.remote_mains(id), vec!["Ленина 1".to_string()]);
    let local = ctx.state.user().await.unwrap();
    assert_eq!(local.addresses[1].place, "Мира 7");
    assert!(!local.addresses[1].main);
}

#[tokio::test]
async fn test_interrupted_delete_leaves_snapshot_matching_backend() {
    let ctx = TestContext::new();
    let id = ctx.seed_account("ivan@mail.ru", &[("Ленина 1", true), ("Мира 5", false)]);
    let user = ctx.login("ivan@mail.ru").await;
    ctx.backend.fail(Table::Addresses, Operation::Update);

    let err = AddressService::new(&ctx.state)
        .delete(user.addresses[0].id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Repository(_)));

    let local = ctx.state.user().await.unwrap().addresses;
    let remote = ctx.remote_addresses(id);
    assert_eq!(local.len(), remote.len());
    assert_eq!(local[0].place, "Мира 5");
    assert_eq!(local[0].main, remote[0]["main"].as_bool().unwrap());
    assert!(ctx.remote_mains(id).is_empty());

    // The next session bootstrap repairs the missing main.
    ctx.backend.heal(Table::Addresses, Operation::Update);
    let user = ctx.login("ivan@mail.ru").await;
    assert_eq!(user.main_address().unwrap().place, "Мира 5");
    assert_eq!(ctx.remote_mains(id), vec!["Мира 5".to_string()]);
}
