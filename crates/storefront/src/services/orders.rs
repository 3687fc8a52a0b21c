//! Order history and checkout.

use tracing::instrument;

use pizzeria_core::OrderStatus;

use crate::db::OrderRepository;
use crate::db::orders::NewOrder;
use crate::error::{AppError, add_breadcrumb};
use crate::models::{Order, OrderDraft};
use crate::state::AppState;

/// Orders of the signed-in user.
pub struct OrderService<'a> {
    state: &'a AppState,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Load the user's orders into the state.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotLoggedIn` if there is no user.
    /// Returns `AppError::Repository` if the query fails.
    #[instrument(skip_all)]
    pub async fn fetch(&self) -> Result<Vec<Order>, AppError> {
        let user = self.state.require_user().await?;
        let orders = OrderRepository::new(self.state.tables())
            .list(user.id)
            .await?;

        tracing::debug!(count = orders.len(), "Fetched orders");
        self.state.set_orders(orders.clone()).await;
        Ok(orders)
    }

    /// Submit the current cart as an order.
    ///
    /// The ordered units leave the cart only after the insert succeeded, so
    /// anything added while it was in flight stays. On failure the cart is
    /// left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the cart is empty or the draft lacks
    /// an address, name or phone.
    /// Returns `AppError::Repository` if the insert fails.
    #[instrument(skip_all)]
    pub async fn submit(&self, draft: &OrderDraft) -> Result<Order, AppError> {
        let user = self.state.require_user().await?;
        let cart = self.state.cart().await;
        if cart.is_empty() {
            return Err(AppError::Validation("Корзина пуста.".to_string()));
        }
        for (value, message) in [
            (&draft.address, "Укажите адрес доставки."),
            (&draft.name, "Укажите имя."),
            (&draft.phone, "Укажите телефон."),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Validation(message.to_string()));
            }
        }

        let (contents, total_price) = OrderDraft::lines(&cart);
        let new_order = NewOrder {
            uuid: user.id,
            contents,
            status: OrderStatus::Cooking,
            address: draft.address.trim().to_string(),
            total_price,
            pay_method: draft.pay_method,
            name: draft.name.trim().to_string(),
            phone: draft.phone.trim().to_string(),
        };

        let order = OrderRepository::new(self.state.tables())
            .insert(&new_order)
            .await?;

        self.state
            .update_cart(|c| {
                c.remove_ordered(&cart);
                Ok(())
            })
            .await?;
        let mut orders = self.state.orders().await;
        orders.push(order.clone());
        self.state.set_orders(orders).await;

        tracing::info!(order_id = %order.id, total = %order.total_price, "Order submitted");
        add_breadcrumb(
            "order",
            "Submitted order",
            Some(&[("order_id", order.id.to_string().as_str())]),
        );
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use std::sync::OnceLock;

    use async_trait::async_trait;
    use secrecy::SecretString;
    use serde_json::Value;

    use crate::backend::memory::{MemoryBackend, Operation};
    use crate::backend::{AuthBackend, BackendError, EmailChange, Filter, Identity, Table, TableStore};
    use crate::models::user::Address;
    use crate::models::{CartItem, User};
    use pizzeria_core::{AddressId, Email, PayMethod, Price};

    /// Puts a drink into the cart while an order insert is in flight.
    struct BusyShopper {
        inner: Arc<MemoryBackend>,
        state: OnceLock<AppState>,
    }

    #[async_trait]
    impl AuthBackend for BusyShopper {
        async fn sign_up(&self, email: &Email, password: &SecretString) -> Result<Identity, BackendError> {
            self.inner.sign_up(email, password).await
        }

        async fn sign_in(&self, email: &Email, password: &SecretString) -> Result<Identity, BackendError> {
            self.inner.sign_in(email, password).await
        }

        async fn sign_out(&self) -> Result<(), BackendError> {
            self.inner.sign_out().await
        }

        async fn update_email(&self, email: &Email) -> Result<EmailChange, BackendError> {
            self.inner.update_email(email).await
        }

        async fn current_user(&self) -> Result<Option<Identity>, BackendError> {
            self.inner.current_user().await
        }
    }

    #[async_trait]
    impl TableStore for BusyShopper {
        async fn select(&self, table: Table, filters: &[Filter]) -> Result<Vec<Value>, BackendError> {
            self.inner.select(table, filters).await
        }

        async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<Vec<Value>, BackendError> {
            if table == Table::Orders
                && let Some(state) = self.state.get()
            {
                state.update_cart(|c| c.add(cola(1))).await.unwrap();
            }
            self.inner.insert(table, rows).await
        }

        async fn update(&self, table: Table, patch: Value, filters: &[Filter]) -> Result<(), BackendError> {
            self.inner.update(table, patch, filters).await
        }

        async fn delete(&self, table: Table, filters: &[Filter]) -> Result<(), BackendError> {
            self.inner.delete(table, filters).await
        }
    }

    fn cola(amount: u32) -> CartItem {
        CartItem {
            heading: "Кола".to_string(),
            description: String::new(),
            ingredients: String::new(),
            price: Price::from_roubles(120),
            weight: 500.0,
            src: String::new(),
            amount,
        }
    }

    async fn setup() -> (Arc<MemoryBackend>, AppState, User) {
        let backend = Arc::new(MemoryBackend::new());
        let id = backend.register("ivan@mail.ru", "secret1");
        let user = User {
            id,
            name: "Иван".to_string(),
            email: Email::parse("ivan@mail.ru").unwrap(),
            phone: "+79990000000".to_string(),
            pay_method: PayMethod::CardOnDelivery,
            addresses: vec![Address::new(AddressId::new(1), "Ленина 1", true)],
        };
        let state = AppState::new(backend.clone());
        state.set_user(Some(user.clone())).await;
        (backend, state, user)
    }

    async fn fill_cart(state: &AppState) {
        state
            .update_cart(|c| {
                c.add(CartItem {
                    heading: "Маргарита".to_string(),
                    description: String::new(),
                    ingredients: String::new(),
                    price: Price::from_roubles(450),
                    weight: 600.0,
                    src: String::new(),
                    amount: 2,
                })
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_submit_clears_cart() {
        let (backend, state, user) = setup().await;
        fill_cart(&state).await;

        let order = OrderService::new(&state)
            .submit(&OrderDraft::for_user(&user))
            .await
            .unwrap();

        assert_eq!(order.total_price, Price::from_roubles(900));
        assert_eq!(order.address, "Ленина 1");
        assert_eq!(order.status, OrderStatus::Cooking);
        assert!(state.cart().await.is_empty());
        assert_eq!(backend.rows(Table::Orders).len(), 1);
        assert_eq!(state.orders().await, vec![order]);
    }

    #[tokio::test]
    async fn test_submit_keeps_items_added_meanwhile() {
        let (backend, _, user) = setup().await;
        let shopper = Arc::new(BusyShopper {
            inner: backend.clone(),
            state: OnceLock::new(),
        });
        let state = AppState::new(shopper.clone());
        assert!(shopper.state.set(state.clone()).is_ok());
        state.set_user(Some(user.clone())).await;
        fill_cart(&state).await;

        let order = OrderService::new(&state)
            .submit(&OrderDraft::for_user(&user))
            .await
            .unwrap();

        assert_eq!(order.contents.len(), 1);
        let cart = state.cart().await;
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.get("Кола").unwrap().amount, 1);
        assert_eq!(backend.rows(Table::Orders).len(), 1);
    }

    #[tokio::test]
    async fn test_submit_failure_keeps_cart() {
        let (backend, state, user) = setup().await;
        fill_cart(&state).await;
        let before = state.cart().await;
        backend.fail(Table::Orders, Operation::Insert);

        let err = OrderService::new(&state)
            .submit(&OrderDraft::for_user(&user))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Repository(_)));
        assert_eq!(state.cart().await, before);
    }

    #[tokio::test]
    async fn test_submit_empty_cart() {
        let (backend, state, user) = setup().await;
        let err = OrderService::new(&state)
            .submit(&OrderDraft::for_user(&user))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Корзина пуста.");
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_submit_requires_address() {
        let (_backend, state, user) = setup().await;
        fill_cart(&state).await;
        let mut draft = OrderDraft::for_user(&user);
        draft.address.clear();

        assert!(matches!(
            OrderService::new(&state).submit(&draft).await,
            Err(AppError::Validation(_))
        ));
        assert!(!state.cart().await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_loads_state() {
        let (_backend, state, user) = setup().await;
        fill_cart(&state).await;
        let service = OrderService::new(&state);
        service.submit(&OrderDraft::for_user(&user)).await.unwrap();
        state.set_orders(Vec::new()).await;

        let orders = service.fetch().await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(state.orders().await, orders);
    }
}
