//! Listing service implementation

use std::sync::Arc;

use chrono::Utc;
use common::decimal::Price;
use common::error::{Error, ErrorExt, Result};
use common::model::listing::Listing;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::repository::{
    InMemoryListingRepository, ListingRepository, PostgresListingRepository, Reservation,
};

/// Repository Type
pub enum RepositoryType {
    /// In-memory repository
    InMemory,
    /// PostgreSQL repository
    Postgres(Option<String>),
}

/// Fields supplied when a listing is created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewListing {
    pub title: String,
    pub author: String,
    pub price: Price,
    pub quantity: u32,
    pub is_sellable: bool,
    pub is_swappable: bool,
    pub condition: String,
    pub city: Option<String>,
}

/// Owner-editable listing fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingUpdate {
    pub title: String,
    pub author: String,
    pub price: Price,
    pub is_sellable: bool,
    pub is_swappable: bool,
    pub condition: String,
    pub city: Option<String>,
}

/// Listing service: the listing directory plus the inventory ledger facade
pub struct ListingService {
    /// Repository for listing data
    repo: Arc<dyn ListingRepository>,
}

impl ListingService {
    /// Create a new listing service backed by an in-memory repository
    pub fn new() -> Self {
        Self {
            repo: Arc::new(InMemoryListingRepository::new()),
        }
    }

    /// Create a new listing service with a specific repository type
    pub async fn with_repository(repo_type: RepositoryType) -> Result<Self> {
        let repo: Arc<dyn ListingRepository> = match repo_type {
            RepositoryType::InMemory => {
                Arc::new(InMemoryListingRepository::new())
            },
            RepositoryType::Postgres(database_url) => {
                Arc::new(PostgresListingRepository::new(database_url).await?)
            }
        };

        Ok(Self { repo })
    }

    /// Create a new listing service with a configuration
    pub async fn with_config(config: &crate::config::ListingServiceConfig) -> Result<Self> {
        let repo: Arc<dyn ListingRepository> = Arc::new(
            PostgresListingRepository::with_config(config).await?
        );

        Ok(Self { repo })
    }

    fn validate(title: &str, price: Price, quantity: u32) -> Result<()> {
        if title.trim().is_empty() {
            return Err(Error::ValidationError("Listing title must not be empty".to_string()));
        }
        if price < Decimal::ZERO {
            return Err(Error::ValidationError(format!("Listing price must not be negative: {}", price)));
        }
        if quantity < 1 {
            return Err(Error::ValidationError("Listing quantity must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Create a new listing owned by `owner_id`
    pub async fn create_listing(&self, owner_id: Uuid, new_listing: NewListing) -> Result<Listing> {
        Self::validate(&new_listing.title, new_listing.price, new_listing.quantity)?;

        let now = Utc::now();
        let listing = Listing {
            id: Uuid::new_v4(),
            owner_id,
            title: new_listing.title,
            author: new_listing.author,
            price: new_listing.price,
            quantity: new_listing.quantity,
            available_quantity: new_listing.quantity,
            is_sellable: new_listing.is_sellable,
            is_swappable: new_listing.is_swappable,
            condition: new_listing.condition,
            city: new_listing.city,
            created_at: now,
            updated_at: now,
        };

        info!("Creating listing {} ({}) for user {}", listing.id, listing.title, owner_id);
        self.repo.create_listing(listing).await
    }

    /// Get a listing by ID
    pub async fn get_listing(&self, id: Uuid) -> Result<Option<Listing>> {
        self.repo.get_listing(id).await
    }

    /// Update a listing's owner-editable fields.
    ///
    /// Existing orders are unaffected: price and seller were captured on the
    /// order by value at creation time.
    pub async fn update_listing(
        &self,
        acting_user_id: Uuid,
        listing_id: Uuid,
        update: ListingUpdate,
    ) -> Result<Listing> {
        Self::validate(&update.title, update.price, 1)?;

        let listing = self.repo.get_listing(listing_id).await
            .with_context(|| format!("Failed to retrieve listing {}", listing_id))?
            .ok_or_else(|| Error::ListingNotFound(format!("Listing not found: {}", listing_id)))?;

        if listing.owner_id != acting_user_id {
            return Err(Error::NotParty(format!(
                "User {} does not own listing {}", acting_user_id, listing_id
            )));
        }

        let updated = Listing {
            title: update.title,
            author: update.author,
            price: update.price,
            is_sellable: update.is_sellable,
            is_swappable: update.is_swappable,
            condition: update.condition,
            city: update.city,
            ..listing
        };

        debug!("Updating listing {}", listing_id);
        self.repo.update_listing(updated).await
    }

    /// Delete a listing. Only the owner may delete, and only while no
    /// reservations are outstanding.
    pub async fn delete_listing(&self, acting_user_id: Uuid, listing_id: Uuid) -> Result<()> {
        let listing = self.repo.get_listing(listing_id).await?
            .ok_or_else(|| Error::ListingNotFound(format!("Listing not found: {}", listing_id)))?;

        if listing.owner_id != acting_user_id {
            return Err(Error::NotParty(format!(
                "User {} does not own listing {}", acting_user_id, listing_id
            )));
        }

        info!("Deleting listing {}", listing_id);
        self.repo.delete_listing(listing_id).await
    }

    /// Reserve stock for an order being created
    pub async fn reserve(&self, listing_id: Uuid, order_id: i64, quantity: u32) -> Result<Reservation> {
        info!("Reserving {} unit(s) of listing {} for order {}", quantity, listing_id, order_id);
        self.repo.reserve(listing_id, order_id, quantity).await
    }

    /// Release the stock held for a cancelled order
    pub async fn release(&self, listing_id: Uuid, order_id: i64) -> Result<()> {
        info!("Releasing reservation of listing {} for order {}", listing_id, order_id);
        self.repo.release(listing_id, order_id).await
    }

    /// Permanently consume the stock held for a completed order
    pub async fn finalize(&self, listing_id: Uuid, order_id: i64) -> Result<()> {
        info!("Finalizing reservation of listing {} for order {}", listing_id, order_id);
        self.repo.finalize(listing_id, order_id).await
    }

    /// Get the reservation backing an order, if any
    pub async fn get_reservation(&self, order_id: i64) -> Result<Option<Reservation>> {
        self.repo.get_reservation(order_id).await
    }
}

impl Default for ListingService {
    fn default() -> Self {
        Self::new()
    }
}
