//! Repository for listing data and the inventory ledger

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{Error, Result};
use common::model::listing::Listing;
use dashmap::DashMap;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// State of an inventory reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationState {
    /// Stock is held for an in-flight order
    Open,
    /// Stock was restored on cancellation
    Released,
    /// Stock was permanently consumed on completion
    Consumed,
}

impl fmt::Display for ReservationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReservationState::Open => "OPEN",
            ReservationState::Released => "RELEASED",
            ReservationState::Consumed => "CONSUMED",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ReservationState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "OPEN" => Ok(ReservationState::Open),
            "RELEASED" => Ok(ReservationState::Released),
            "CONSUMED" => Ok(ReservationState::Consumed),
            other => Err(Error::ValidationError(format!("Unknown reservation state: {}", other))),
        }
    }
}

/// An inventory hold created at order creation, keyed by the order it backs.
///
/// The record outlives the hold: once released or consumed it stays as the
/// guard that makes double-release and release-after-finalize inert.
#[derive(Debug, Clone)]
pub struct Reservation {
    /// Order the reservation is bound to
    pub order_id: i64,
    /// Listing the stock was taken from
    pub listing_id: Uuid,
    /// Units held
    pub quantity: u32,
    /// Current state
    pub state: ReservationState,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Listing repository trait defining the interface for listing storage and
/// the inventory ledger
#[async_trait]
pub trait ListingRepository: Send + Sync {
    /// Store a new listing
    async fn create_listing(&self, listing: Listing) -> Result<Listing>;

    /// Get a listing by ID
    async fn get_listing(&self, id: Uuid) -> Result<Option<Listing>>;

    /// Update a listing's owner-editable fields.
    ///
    /// The inventory counters are preserved from the stored row; only the
    /// ledger operations below may change them.
    async fn update_listing(&self, listing: Listing) -> Result<Listing>;

    /// Delete a listing. Fails with `ListingNotDeletable` while any
    /// reservation is outstanding.
    async fn delete_listing(&self, id: Uuid) -> Result<()>;

    /// Get the reservation backing an order, if any
    async fn get_reservation(&self, order_id: i64) -> Result<Option<Reservation>>;

    /// Atomically check-and-decrement available stock and record an open
    /// reservation bound to `order_id`. Fails without side effects on
    /// insufficient stock or an unsellable listing.
    async fn reserve(&self, listing_id: Uuid, order_id: i64, quantity: u32) -> Result<Reservation>;

    /// Restore the stock held by an open reservation. Inert if the
    /// reservation was already released or consumed.
    async fn release(&self, listing_id: Uuid, order_id: i64) -> Result<()>;

    /// Mark an open reservation as permanently consumed. No count change;
    /// the decrement happened at reservation time.
    async fn finalize(&self, listing_id: Uuid, order_id: i64) -> Result<()>;
}

/// In-memory repository for listing data
pub struct InMemoryListingRepository {
    /// Listings by ID
    pub listings: DashMap<Uuid, Listing>,
    /// Reservations by order ID
    pub reservations: DashMap<i64, Reservation>,
}

impl InMemoryListingRepository {
    /// Create a new in-memory listing repository
    pub fn new() -> Self {
        Self {
            listings: DashMap::new(),
            reservations: DashMap::new(),
        }
    }
}

impl Default for InMemoryListingRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ListingRepository for InMemoryListingRepository {
    async fn create_listing(&self, listing: Listing) -> Result<Listing> {
        self.listings.insert(listing.id, listing.clone());
        Ok(listing)
    }

    async fn get_listing(&self, id: Uuid) -> Result<Option<Listing>> {
        Ok(self.listings.get(&id).map(|l| l.clone()))
    }

    async fn update_listing(&self, listing: Listing) -> Result<Listing> {
        let mut entry = self.listings.get_mut(&listing.id)
            .ok_or_else(|| Error::ListingNotFound(format!("Listing not found: {}", listing.id)))?;

        // Counters belong to the ledger; carry the stored values forward.
        let mut updated = listing;
        updated.quantity = entry.quantity;
        updated.available_quantity = entry.available_quantity;
        updated.updated_at = Utc::now();
        *entry = updated.clone();
        Ok(updated)
    }

    async fn delete_listing(&self, id: Uuid) -> Result<()> {
        // remove_if evaluates the guard while holding the entry exclusively,
        // so a concurrent reserve cannot slip in between check and removal.
        let removed = self.listings.remove_if(&id, |_, listing| listing.is_deletable());

        match removed {
            Some(_) => Ok(()),
            None => {
                if self.listings.contains_key(&id) {
                    Err(Error::ListingNotDeletable(format!(
                        "Listing {} has outstanding orders", id
                    )))
                } else {
                    Err(Error::ListingNotFound(format!("Listing not found: {}", id)))
                }
            }
        }
    }

    async fn get_reservation(&self, order_id: i64) -> Result<Option<Reservation>> {
        Ok(self.reservations.get(&order_id).map(|r| r.clone()))
    }

    async fn reserve(&self, listing_id: Uuid, order_id: i64, quantity: u32) -> Result<Reservation> {
        // The exclusive map entry serializes concurrent reserves on the same
        // listing: the check and the decrement are one atomic unit.
        {
            let mut entry = self.listings.get_mut(&listing_id)
                .ok_or_else(|| Error::ListingNotFound(format!("Listing not found: {}", listing_id)))?;

            if !entry.is_sellable {
                return Err(Error::ListingNotSellable(format!(
                    "Listing {} is not offered for sale", listing_id
                )));
            }
            if !entry.has_available(quantity) {
                return Err(Error::InsufficientStock(format!(
                    "Listing {} has {} of {} requested units available",
                    listing_id, entry.available_quantity, quantity
                )));
            }

            entry.available_quantity -= quantity;
            entry.updated_at = Utc::now();
        }

        let reservation = Reservation {
            order_id,
            listing_id,
            quantity,
            state: ReservationState::Open,
            created_at: Utc::now(),
        };
        self.reservations.insert(order_id, reservation.clone());
        debug!("Reserved {} unit(s) of listing {} for order {}", quantity, listing_id, order_id);
        Ok(reservation)
    }

    async fn release(&self, listing_id: Uuid, order_id: i64) -> Result<()> {
        let quantity = {
            let mut entry = match self.reservations.get_mut(&order_id) {
                Some(entry) => entry,
                None => {
                    warn!("No reservation to release for order {}", order_id);
                    return Ok(());
                }
            };
            if entry.state != ReservationState::Open {
                warn!("Reservation for order {} is {}, release has no effect", order_id, entry.state);
                return Ok(());
            }
            entry.state = ReservationState::Released;
            entry.quantity
        };

        match self.listings.get_mut(&listing_id) {
            Some(mut listing) => {
                listing.available_quantity += quantity;
                listing.updated_at = Utc::now();
            }
            None => warn!("Listing {} gone while releasing order {}", listing_id, order_id),
        }

        debug!("Released {} unit(s) of listing {} for order {}", quantity, listing_id, order_id);
        Ok(())
    }

    async fn finalize(&self, listing_id: Uuid, order_id: i64) -> Result<()> {
        let mut entry = match self.reservations.get_mut(&order_id) {
            Some(entry) => entry,
            None => {
                warn!("No reservation to finalize for order {}", order_id);
                return Ok(());
            }
        };
        if entry.state != ReservationState::Open {
            warn!("Reservation for order {} is {}, finalize has no effect", order_id, entry.state);
            return Ok(());
        }
        entry.state = ReservationState::Consumed;
        debug!("Finalized reservation of listing {} for order {}", listing_id, order_id);
        Ok(())
    }
}

/// PostgreSQL repository for listing data
pub struct PostgresListingRepository {
    /// Database connection pool
    pool: PgPool,
}

impl PostgresListingRepository {
    /// Create a new PostgreSQL listing repository
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

    /// Create a new PostgreSQL listing repository with configuration
    pub async fn with_config(config: &crate::config::ListingServiceConfig) -> Result<Self> {
        info!("Connecting to PostgreSQL database with pool size: {}", config.db_pool_size);

        let pool = PgPoolOptions::new()
            .max_connections(config.db_pool_size)
            .connect(&config.database_url)
            .await
            .map_err(Error::Database)?;

        info!("Connected to PostgreSQL database");

        Ok(Self { pool })
    }

    fn listing_from_row(row: &sqlx::postgres::PgRow) -> Result<Listing> {
        Ok(Listing {
            id: row.get("id"),
            owner_id: row.get("owner_id"),
            title: row.get("title"),
            author: row.get("author"),
            price: row.get("price"),
            quantity: row.get::<i32, _>("quantity") as u32,
            available_quantity: row.get::<i32, _>("available_quantity") as u32,
            is_sellable: row.get("is_sellable"),
            is_swappable: row.get("is_swappable"),
            condition: row.get("condition"),
            city: row.get("city"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    fn reservation_from_row(row: &sqlx::postgres::PgRow) -> Result<Reservation> {
        Ok(Reservation {
            order_id: row.get("order_id"),
            listing_id: row.get("listing_id"),
            quantity: row.get::<i32, _>("quantity") as u32,
            state: row.get::<String, _>("state").parse()?,
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl ListingRepository for PostgresListingRepository {
    async fn create_listing(&self, listing: Listing) -> Result<Listing> {
        debug!("Creating listing {} in database", listing.id);

        sqlx::query(
            "INSERT INTO listings \
             (id, owner_id, title, author, price, quantity, available_quantity, \
              is_sellable, is_swappable, condition, city, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        )
        .bind(listing.id)
        .bind(listing.owner_id)
        .bind(&listing.title)
        .bind(&listing.author)
        .bind(listing.price)
        .bind(listing.quantity as i32)
        .bind(listing.available_quantity as i32)
        .bind(listing.is_sellable)
        .bind(listing.is_swappable)
        .bind(&listing.condition)
        .bind(&listing.city)
        .bind(listing.created_at)
        .bind(listing.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(listing)
    }

    async fn get_listing(&self, id: Uuid) -> Result<Option<Listing>> {
        let row = sqlx::query(
            "SELECT id, owner_id, title, author, price, quantity, available_quantity, \
             is_sellable, is_swappable, condition, city, created_at, updated_at \
             FROM listings WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::listing_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn update_listing(&self, listing: Listing) -> Result<Listing> {
        // The counter columns are deliberately absent from the SET list.
        let result = sqlx::query(
            "UPDATE listings SET title = $2, author = $3, price = $4, \
             is_sellable = $5, is_swappable = $6, condition = $7, city = $8, \
             updated_at = NOW() \
             WHERE id = $1"
        )
        .bind(listing.id)
        .bind(&listing.title)
        .bind(&listing.author)
        .bind(listing.price)
        .bind(listing.is_sellable)
        .bind(listing.is_swappable)
        .bind(&listing.condition)
        .bind(&listing.city)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::ListingNotFound(format!("Listing not found: {}", listing.id)));
        }

        self.get_listing(listing.id).await?
            .ok_or_else(|| Error::ListingNotFound(format!("Listing not found: {}", listing.id)))
    }

    async fn delete_listing(&self, id: Uuid) -> Result<()> {
        // Conditional delete: the guard and the removal are one statement.
        let result = sqlx::query(
            "DELETE FROM listings WHERE id = $1 AND available_quantity = quantity"
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let exists = sqlx::query("SELECT 1 FROM listings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match exists {
            Some(_) => Err(Error::ListingNotDeletable(format!(
                "Listing {} has outstanding orders", id
            ))),
            None => Err(Error::ListingNotFound(format!("Listing not found: {}", id))),
        }
    }

    async fn get_reservation(&self, order_id: i64) -> Result<Option<Reservation>> {
        let row = sqlx::query(
            "SELECT order_id, listing_id, quantity, state, created_at \
             FROM reservations WHERE order_id = $1"
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::reservation_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn reserve(&self, listing_id: Uuid, order_id: i64, quantity: u32) -> Result<Reservation> {
        let mut tx = self.pool.begin().await?;

        // Conditional decrement: at most one of two racing reserves for the
        // last unit can match the WHERE clause.
        let result = sqlx::query(
            "UPDATE listings SET available_quantity = available_quantity - $2, updated_at = NOW() \
             WHERE id = $1 AND is_sellable = TRUE AND available_quantity >= $2"
        )
        .bind(listing_id)
        .bind(quantity as i32)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;

            // Distinguish the failure for the caller; no side effects remain.
            let row = sqlx::query(
                "SELECT is_sellable, available_quantity FROM listings WHERE id = $1"
            )
            .bind(listing_id)
            .fetch_optional(&self.pool)
            .await?;

            return match row {
                None => Err(Error::ListingNotFound(format!("Listing not found: {}", listing_id))),
                Some(row) if !row.get::<bool, _>("is_sellable") => {
                    Err(Error::ListingNotSellable(format!(
                        "Listing {} is not offered for sale", listing_id
                    )))
                }
                Some(row) => Err(Error::InsufficientStock(format!(
                    "Listing {} has {} of {} requested units available",
                    listing_id,
                    row.get::<i32, _>("available_quantity"),
                    quantity
                ))),
            };
        }

        let now = Utc::now();
        sqlx::query(
            "INSERT INTO reservations (order_id, listing_id, quantity, state, created_at) \
             VALUES ($1, $2, $3, $4, $5)"
        )
        .bind(order_id)
        .bind(listing_id)
        .bind(quantity as i32)
        .bind(ReservationState::Open.to_string())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!("Reserved {} unit(s) of listing {} for order {}", quantity, listing_id, order_id);
        Ok(Reservation {
            order_id,
            listing_id,
            quantity,
            state: ReservationState::Open,
            created_at: now,
        })
    }

    async fn release(&self, listing_id: Uuid, order_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Only an open reservation releases stock; released or consumed
        // reservations do not match and the whole call is inert.
        let row = sqlx::query(
            "UPDATE reservations SET state = $2 WHERE order_id = $1 AND state = $3 \
             RETURNING quantity"
        )
        .bind(order_id)
        .bind(ReservationState::Released.to_string())
        .bind(ReservationState::Open.to_string())
        .fetch_optional(&mut *tx)
        .await?;

        let quantity: i32 = match row {
            Some(row) => row.get("quantity"),
            None => {
                tx.rollback().await?;
                warn!("No open reservation to release for order {}", order_id);
                return Ok(());
            }
        };

        sqlx::query(
            "UPDATE listings SET available_quantity = available_quantity + $2, updated_at = NOW() \
             WHERE id = $1"
        )
        .bind(listing_id)
        .bind(quantity)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!("Released {} unit(s) of listing {} for order {}", quantity, listing_id, order_id);
        Ok(())
    }

    async fn finalize(&self, listing_id: Uuid, order_id: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE reservations SET state = $2 WHERE order_id = $1 AND state = $3"
        )
        .bind(order_id)
        .bind(ReservationState::Consumed.to_string())
        .bind(ReservationState::Open.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!("No open reservation to finalize for order {}", order_id);
        } else {
            debug!("Finalized reservation of listing {} for order {}", listing_id, order_id);
        }
        Ok(())
    }
}
