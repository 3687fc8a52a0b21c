//! Order repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pizzeria_core::{OrderId, OrderStatus, PayMethod, Price, UserId};

use super::{RepositoryError, decode, decode_all};
use crate::backend::{Filter, Table, TableStore};
use crate::models::order::{Order, OrderLine};

/// `orders` row. The camelCase columns are part of the schema.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderRow {
    id: OrderId,
    #[serde(rename = "created_at")]
    created_at: DateTime<Utc>,
    contents: Vec<OrderLine>,
    #[serde(default)]
    status: OrderStatus,
    address: String,
    total_price: Price,
    pay_method: PayMethod,
    name: String,
    phone: String,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            created_at: row.created_at,
            contents: row.contents,
            status: row.status,
            address: row.address,
            total_price: row.total_price,
            pay_method: row.pay_method,
            name: row.name,
            phone: row.phone,
        }
    }
}

/// An order about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub uuid: UserId,
    pub contents: Vec<OrderLine>,
    pub status: OrderStatus,
    pub address: String,
    pub total_price: Price,
    pub pay_method: PayMethod,
    pub name: String,
    pub phone: String,
}

/// Repository for orders.
pub struct OrderRepository<'a> {
    store: &'a dyn TableStore,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(store: &'a dyn TableStore) -> Self {
        Self { store }
    }

    /// All orders of a user, in store order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a row cannot be decoded.
    pub async fn list(&self, user: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = self
            .store
            .select(Table::Orders, &[Filter::owner(user)])
            .await?;
        let rows: Vec<OrderRow> = decode_all(Table::Orders, rows)?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// Insert an order and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the insert fails.
    /// Returns `RepositoryError::DataCorruption` if the store returns no row.
    pub async fn insert(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let row = serde_json::to_value(order)
            .map_err(|e| RepositoryError::DataCorruption(format!("unserializable order: {e}")))?;
        let stored = self.store.insert(Table::Orders, vec![row]).await?;
        let stored = stored.into_iter().next().ok_or_else(|| {
            RepositoryError::DataCorruption("insert returned no orders row".to_string())
        })?;
        decode::<OrderRow>(Table::Orders, stored).map(Order::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use serde_json::json;
    use uuid::Uuid;

    fn new_order(user: UserId) -> NewOrder {
        NewOrder {
            uuid: user,
            contents: vec![OrderLine {
                heading: "Маргарита".to_string(),
                amount: 2,
                price: Price::from_roubles(450),
            }],
            status: OrderStatus::Cooking,
            address: "Ленина 1".to_string(),
            total_price: Price::from_roubles(900),
            pay_method: PayMethod::CardOnDelivery,
            name: "Иван".to_string(),
            phone: "+79990000000".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_writes_schema_columns() {
        let backend = MemoryBackend::new();
        let user = UserId::new(Uuid::new_v4());

        let order = OrderRepository::new(&backend)
            .insert(&new_order(user))
            .await
            .unwrap();
        assert_eq!(order.total_price, Price::from_roubles(900));

        let row = &backend.rows(Table::Orders)[0];
        assert_eq!(row["payMethod"], json!("card-on-delivery"));
        assert_eq!(row["status"], json!("cooking"));
        assert_eq!(row["uuid"], json!(user.to_string()));
        assert!(row.get("totalPrice").is_some());
    }

    #[tokio::test]
    async fn test_list_only_own_orders() {
        let backend = MemoryBackend::new();
        let repo = OrderRepository::new(&backend);
        let me = UserId::new(Uuid::new_v4());
        let other = UserId::new(Uuid::new_v4());

        repo.insert(&new_order(me)).await.unwrap();
        repo.insert(&new_order(other)).await.unwrap();

        let orders = repo.list(me).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].contents[0].amount, 2);
    }
}
