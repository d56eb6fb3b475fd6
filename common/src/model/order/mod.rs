//! Order model and the lifecycle state machine

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Price;
use crate::error::{Error, Result};
#[cfg(feature = "utoipa")]
use crate::utoipa::ToSchema;

/// Order status
///
/// The vocabulary is exposed verbatim to callers; no other values exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub enum Status {
    /// Order created and inventory reserved
    Accepted,
    /// Seller has handed the book to delivery
    Delivering,
    /// Both parties confirmed delivery; reservation finalized
    Completed,
    /// Cancelled by either party; reservation released
    Cancelled,
}

impl Status {
    /// Whether the status admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Cancelled)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Accepted => "ACCEPTED",
            Status::Delivering => "DELIVERING",
            Status::Completed => "COMPLETED",
            Status::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ACCEPTED" => Ok(Status::Accepted),
            "DELIVERING" => Ok(Status::Delivering),
            "COMPLETED" => Ok(Status::Completed),
            "CANCELLED" => Ok(Status::Cancelled),
            other => Err(Error::ValidationError(format!("Unknown order status: {}", other))),
        }
    }
}

/// Role a user occupies on an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub enum Role {
    Buyer,
    Seller,
}

/// Outcome of applying a lifecycle transition to an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Fields changed; the new state must be persisted
    Applied,
    /// The transition was already satisfied; nothing changed
    NoOp,
    /// The second confirmation landed; the reservation must be finalized
    Completed,
}

/// Order model
///
/// The permanent record of a single buyer–seller transaction against one
/// listing. Seller id and unit price are captured by value at creation time
/// so later listing edits cannot retroactively change the economics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct Order {
    /// Unique order ID, monotonically assigned
    pub id: i64,
    /// Referenced listing
    pub listing_id: Uuid,
    /// Buyer user ID
    pub buyer_id: Uuid,
    /// Seller user ID (listing owner at order-creation time)
    pub seller_id: Uuid,
    /// Units purchased
    pub quantity: u32,
    /// Unit price at time of order
    pub unit_price: Price,
    /// Current status
    pub status: Status,
    /// Seller confirmed delivery
    pub seller_confirmed: bool,
    /// Buyer confirmed delivery
    pub buyer_confirmed: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Create a new order in its initial state
    pub fn new(
        id: i64,
        listing_id: Uuid,
        buyer_id: Uuid,
        seller_id: Uuid,
        quantity: u32,
        unit_price: Price,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            listing_id,
            buyer_id,
            seller_id,
            quantity,
            unit_price,
            status: Status::Accepted,
            seller_confirmed: false,
            buyer_confirmed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the order admits no further transitions
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The role `user_id` occupies on this order, if any
    pub fn role_of(&self, user_id: Uuid) -> Option<Role> {
        if user_id == self.buyer_id {
            Some(Role::Buyer)
        } else if user_id == self.seller_id {
            Some(Role::Seller)
        } else {
            None
        }
    }

    fn confirmed_by(&self, role: Role) -> bool {
        match role {
            Role::Buyer => self.buyer_confirmed,
            Role::Seller => self.seller_confirmed,
        }
    }

    /// Seller marks the order as out for delivery.
    ///
    /// Re-invoking while already DELIVERING is a no-op.
    pub fn mark_delivering(&mut self) -> Result<Transition> {
        if self.status == Status::Delivering {
            return Ok(Transition::NoOp);
        }
        if self.is_terminal() {
            return Err(Error::TerminalOrder(format!(
                "Order {} is {}", self.id, self.status
            )));
        }
        self.status = Status::Delivering;
        self.updated_at = Utc::now();
        Ok(Transition::Applied)
    }

    /// Record a delivery confirmation from one role.
    ///
    /// Confirmation is idempotent per actor. The order advances to COMPLETED
    /// at the moment the second flag is set; the transition is computed here,
    /// never separately triggered, so it cannot be missed when both
    /// confirmations race (the caller serializes via a conditional write).
    pub fn confirm_delivery(&mut self, role: Role) -> Result<Transition> {
        if self.confirmed_by(role) {
            return Ok(Transition::NoOp);
        }
        if self.is_terminal() {
            return Err(Error::TerminalOrder(format!(
                "Order {} is {}", self.id, self.status
            )));
        }
        if self.status != Status::Delivering {
            return Err(Error::InvalidTransition(format!(
                "Order {} is {}, delivery cannot be confirmed before it is delivering",
                self.id, self.status
            )));
        }

        match role {
            Role::Buyer => self.buyer_confirmed = true,
            Role::Seller => self.seller_confirmed = true,
        }
        self.updated_at = Utc::now();

        if self.buyer_confirmed && self.seller_confirmed {
            self.status = Status::Completed;
            Ok(Transition::Completed)
        } else {
            Ok(Transition::Applied)
        }
    }

    /// Cancel the order. Legal from ACCEPTED or DELIVERING only.
    pub fn cancel(&mut self) -> Result<Transition> {
        if self.is_terminal() {
            return Err(Error::TerminalOrder(format!(
                "Order {} is {}", self.id, self.status
            )));
        }
        self.status = Status::Cancelled;
        self.updated_at = Utc::now();
        Ok(Transition::Applied)
    }
}
