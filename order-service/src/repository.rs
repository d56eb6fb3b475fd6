//! Repository for order records

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use common::error::{Error, Result};
use common::model::order::{Order, Role};
use dashmap::DashMap;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

/// Order repository trait defining the interface for order storage
///
/// Orders are never deleted; they are the permanent transaction record.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Allocate the next order ID from the monotonic sequence
    async fn next_order_id(&self) -> Result<i64>;

    /// Store a newly created order
    async fn insert_order(&self, order: Order) -> Result<Order>;

    /// Get an order by ID
    async fn get_order(&self, id: i64) -> Result<Option<Order>>;

    /// All orders where `user_id` occupies `role`
    async fn orders_for_user(&self, user_id: Uuid, role: Role) -> Result<Vec<Order>>;

    /// Conditional write: persist `updated` only if the stored row still
    /// carries `expected`'s status and confirmation flags. Returns whether
    /// the write happened.
    ///
    /// This is the atomicity primitive for the lifecycle state machine: a
    /// racing transition invalidates the expectation and the caller re-reads
    /// and re-applies, so two concurrent confirmations can never both miss
    /// the other's flag.
    async fn compare_and_update(&self, expected: &Order, updated: Order) -> Result<bool>;
}

/// In-memory repository for order records
pub struct InMemoryOrderRepository {
    /// Orders by ID
    pub orders: DashMap<i64, Order>,
    /// Monotonic ID sequence
    next_id: AtomicI64,
}

impl InMemoryOrderRepository {
    /// Create a new in-memory order repository
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryOrderRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn next_order_id(&self) -> Result<i64> {
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn insert_order(&self, order: Order) -> Result<Order> {
        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: i64) -> Result<Option<Order>> {
        Ok(self.orders.get(&id).map(|o| o.clone()))
    }

    async fn orders_for_user(&self, user_id: Uuid, role: Role) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self.orders
            .iter()
            .filter_map(|entry| {
                let order = entry.value();
                let matches = match role {
                    Role::Buyer => order.buyer_id == user_id,
                    Role::Seller => order.seller_id == user_id,
                };
                if matches {
                    Some(order.clone())
                } else {
                    None
                }
            })
            .collect();

        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }

    async fn compare_and_update(&self, expected: &Order, updated: Order) -> Result<bool> {
        // The exclusive map entry makes the check and the overwrite one
        // atomic unit per order.
        let mut entry = self.orders.get_mut(&expected.id)
            .ok_or_else(|| Error::OrderNotFound(format!("Order not found: {}", expected.id)))?;

        if entry.status != expected.status
            || entry.seller_confirmed != expected.seller_confirmed
            || entry.buyer_confirmed != expected.buyer_confirmed
        {
            return Ok(false);
        }

        *entry = updated;
        Ok(true)
    }
}

/// PostgreSQL repository for order records
pub struct PostgresOrderRepository {
    /// Database connection pool
    pool: PgPool,
}

impl PostgresOrderRepository {
    /// Create a new PostgreSQL order repository
    pub async fn new(database_url: Option<String>) -> Result<Self> {
        let pool = match database_url {
            Some(url) => {
                PgPoolOptions::new()
                    .max_connections(5)
                    .connect(&url)
                    .await
                    .map_err(Error::Database)?
            },
            None => {
                let database_url = std::env::var("DATABASE_URL")
                    .map_err(|_| Error::ConfigurationError("DATABASE_URL must be set".to_string()))?;

                PgPoolOptions::new()
                    .max_connections(5)
                    .connect(&database_url)
                    .await
                    .map_err(Error::Database)?
            },
        };

        info!("Connected to PostgreSQL database");

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL order repository with configuration
    pub async fn with_config(config: &crate::config::OrderServiceConfig) -> Result<Self> {
        info!("Connecting to PostgreSQL database with pool size: {}", config.db_pool_size);

        let pool = PgPoolOptions::new()
            .max_connections(config.db_pool_size)
            .connect(&config.database_url)
            .await
            .map_err(Error::Database)?;

        info!("Connected to PostgreSQL database");

        Ok(Self { pool })
    }

    fn order_from_row(row: &sqlx::postgres::PgRow) -> Result<Order> {
        Ok(Order {
            id: row.get("id"),
            listing_id: row.get("listing_id"),
            buyer_id: row.get("buyer_id"),
            seller_id: row.get("seller_id"),
            quantity: row.get::<i32, _>("quantity") as u32,
            unit_price: row.get("unit_price"),
            status: row.get::<String, _>("status").parse()?,
            seller_confirmed: row.get("seller_confirmed"),
            buyer_confirmed: row.get("buyer_confirmed"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

const ORDER_COLUMNS: &str =
    "id, listing_id, buyer_id, seller_id, quantity, unit_price, status, \
     seller_confirmed, buyer_confirmed, created_at, updated_at";

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn next_order_id(&self) -> Result<i64> {
        let row = sqlx::query("SELECT nextval('orders_id_seq') AS id")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("id"))
    }

    async fn insert_order(&self, order: Order) -> Result<Order> {
        debug!("Creating order {} in database", order.id);

        sqlx::query(
            "INSERT INTO orders \
             (id, listing_id, buyer_id, seller_id, quantity, unit_price, status, \
              seller_confirmed, buyer_confirmed, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        )
        .bind(order.id)
        .bind(order.listing_id)
        .bind(order.buyer_id)
        .bind(order.seller_id)
        .bind(order.quantity as i32)
        .bind(order.unit_price)
        .bind(order.status.to_string())
        .bind(order.seller_confirmed)
        .bind(order.buyer_confirmed)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(order)
    }

    async fn get_order(&self, id: i64) -> Result<Option<Order>> {
        let row = sqlx::query(
            &format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS)
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::order_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn orders_for_user(&self, user_id: Uuid, role: Role) -> Result<Vec<Order>> {
        let column = match role {
            Role::Buyer => "buyer_id",
            Role::Seller => "seller_id",
        };

        let rows = sqlx::query(
            &format!("SELECT {} FROM orders WHERE {} = $1 ORDER BY id", ORDER_COLUMNS, column)
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::order_from_row).collect()
    }

    async fn compare_and_update(&self, expected: &Order, updated: Order) -> Result<bool> {
        // Conditional update: the WHERE clause re-checks the fields the
        // transition was computed from.
        let result = sqlx::query(
            "UPDATE orders SET status = $2, seller_confirmed = $3, buyer_confirmed = $4, \
             updated_at = $5 \
             WHERE id = $1 AND status = $6 AND seller_confirmed = $7 AND buyer_confirmed = $8"
        )
        .bind(expected.id)
        .bind(updated.status.to_string())
        .bind(updated.seller_confirmed)
        .bind(updated.buyer_confirmed)
        .bind(updated.updated_at)
        .bind(expected.status.to_string())
        .bind(expected.seller_confirmed)
        .bind(expected.buyer_confirmed)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM orders WHERE id = $1")
                .bind(expected.id)
                .fetch_optional(&self.pool)
                .await?;
            if exists.is_none() {
                return Err(Error::OrderNotFound(format!("Order not found: {}", expected.id)));
            }
            return Ok(false);
        }

        Ok(true)
    }
}
