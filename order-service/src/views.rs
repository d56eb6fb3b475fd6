//! Role-scoped order views
//!
//! A read-side projection over the order records: the order enriched with
//! display fields resolved from the current listing and user records. Never
//! stored; always rebuilt from lookups, so titles and names reflect current
//! data even though the order captured price and seller historically.

use chrono::{DateTime, Utc};
use common::decimal::{Amount, Price};
use common::model::listing::Listing;
use common::model::order::{Order, Status};
use common::model::payment::PaymentBreakdown;
use common::model::user::User;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "utoipa")]
use common::utoipa::ToSchema;

/// Placeholder title when the listing has been deleted since the order
pub const UNKNOWN_LISTING: &str = "Unknown Book";
/// Placeholder name when the buyer cannot be resolved
pub const UNKNOWN_BUYER: &str = "Unknown Buyer";
/// Placeholder name when the seller cannot be resolved
pub const UNKNOWN_SELLER: &str = "Unknown Seller";

/// An order as shown on a user's dashboard ("incoming" for sellers,
/// "outgoing" for buyers)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct OrderView {
    /// Order ID
    pub order_id: i64,
    /// Referenced listing
    pub listing_id: Uuid,
    /// Current listing title, or a placeholder if the listing is gone
    pub listing_title: String,
    /// Buyer user ID
    pub buyer_id: Uuid,
    /// Buyer display name, or a placeholder
    pub buyer_name: String,
    /// Seller user ID
    pub seller_id: Uuid,
    /// Seller display name, or a placeholder
    pub seller_name: String,
    /// Units purchased
    pub quantity: u32,
    /// Unit price captured at order time
    pub unit_price: Price,
    /// Total the buyer pays, service fee included
    pub total_price: Amount,
    /// Current order status
    pub status: Status,
    /// Seller confirmed delivery
    pub seller_confirmed: bool,
    /// Buyer confirmed delivery
    pub buyer_confirmed: bool,
    /// Order creation timestamp
    pub created_at: DateTime<Utc>,
}

impl OrderView {
    /// Build a view from an order and its (possibly absent) display records
    pub fn project(order: &Order, listing: Option<&Listing>, buyer: Option<&User>, seller: Option<&User>) -> Self {
        let breakdown = PaymentBreakdown::compute(order.id, order.unit_price, order.quantity);

        Self {
            order_id: order.id,
            listing_id: order.listing_id,
            listing_title: listing
                .map(|l| l.title.clone())
                .unwrap_or_else(|| UNKNOWN_LISTING.to_string()),
            buyer_id: order.buyer_id,
            buyer_name: buyer
                .map(|u| u.display_name.clone())
                .unwrap_or_else(|| UNKNOWN_BUYER.to_string()),
            seller_id: order.seller_id,
            seller_name: seller
                .map(|u| u.display_name.clone())
                .unwrap_or_else(|| UNKNOWN_SELLER.to_string()),
            quantity: order.quantity,
            unit_price: order.unit_price,
            total_price: breakdown.buyer_pays,
            status: order.status,
            seller_confirmed: order.seller_confirmed,
            buyer_confirmed: order.buyer_confirmed,
            created_at: order.created_at,
        }
    }
}
