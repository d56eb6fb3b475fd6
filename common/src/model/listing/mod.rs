//! Listing model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Price;
#[cfg(feature = "utoipa")]
use crate::utoipa::ToSchema;

/// Listing model
///
/// A sellable/swappable book entry owned by a user. `available_quantity` is
/// exclusively mutated by the inventory ledger; everything else may be edited
/// by the owner without affecting existing orders (price and seller are
/// captured on the order by value).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct Listing {
    /// Unique listing ID
    pub id: Uuid,
    /// Owner user ID
    pub owner_id: Uuid,
    /// Book title
    pub title: String,
    /// Book author
    pub author: String,
    /// Unit price in currency minor-unit precision
    pub price: Price,
    /// Total units ever listed
    pub quantity: u32,
    /// Units not currently reserved or sold
    pub available_quantity: u32,
    /// Offered for sale
    pub is_sellable: bool,
    /// Offered for swap
    pub is_swappable: bool,
    /// Book condition (e.g. "Good", "Like New")
    pub condition: String,
    /// Seller's city, for display
    pub city: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// Whether `quantity` more units can currently be reserved
    pub fn has_available(&self, quantity: u32) -> bool {
        self.available_quantity >= quantity
    }

    /// A listing may only be deleted while no reservations are outstanding
    pub fn is_deletable(&self) -> bool {
        self.available_quantity == self.quantity
    }
}
