//! Order service implementation
//!
//! Hosts the order lifecycle state machine. Transition legality lives on the
//! `Order` model; this service owns the atomicity: every transition is
//! applied through a conditional write that re-checks the fields the
//! transition was computed from, and re-reads on interference.

use std::sync::Arc;

use common::error::{Error, ErrorExt, Result};
use common::model::order::{Order, Role, Transition};
use common::model::payment::PaymentBreakdown;
use listing_service::ListingService;
use tracing::{debug, info};
use uuid::Uuid;

use crate::directory::UserDirectory;
use crate::repository::{InMemoryOrderRepository, OrderRepository, PostgresOrderRepository};
use crate::views::OrderView;

/// Repository Type
pub enum RepositoryType {
    /// In-memory repository
    InMemory,
    /// PostgreSQL repository
    Postgres(Option<String>),
}

/// Order service for creating orders and driving them through the lifecycle
pub struct OrderService {
    /// Repository for order records
    repo: Arc<dyn OrderRepository>,
    /// Listing directory and inventory ledger
    listings: Arc<ListingService>,
    /// External user directory, for display names only
    users: Arc<dyn UserDirectory>,
}

impl OrderService {
    /// Create a new order service backed by an in-memory repository
    pub fn new(listings: Arc<ListingService>, users: Arc<dyn UserDirectory>) -> Self {
        Self {
            repo: Arc::new(InMemoryOrderRepository::new()),
            listings,
            users,
        }
    }

    /// Create a new order service with a specific repository type
    pub async fn with_repository(
        repo_type: RepositoryType,
        listings: Arc<ListingService>,
        users: Arc<dyn UserDirectory>,
    ) -> Result<Self> {
        let repo: Arc<dyn OrderRepository> = match repo_type {
            RepositoryType::InMemory => {
                Arc::new(InMemoryOrderRepository::new())
            },
            RepositoryType::Postgres(database_url) => {
                Arc::new(PostgresOrderRepository::new(database_url).await?)
            }
        };

        Ok(Self { repo, listings, users })
    }

    /// Create a new order service with a configuration
    pub async fn with_config(
        config: &crate::config::OrderServiceConfig,
        listings: Arc<ListingService>,
        users: Arc<dyn UserDirectory>,
    ) -> Result<Self> {
        let repo: Arc<dyn OrderRepository> = Arc::new(
            PostgresOrderRepository::with_config(config).await?
        );

        Ok(Self { repo, listings, users })
    }

    /// Create an order: reserve stock and record the transaction.
    ///
    /// Seller id and unit price are captured from the listing by value so
    /// concurrent listing edits cannot change the order's economics. The
    /// reservation and the order record succeed or fail together.
    pub async fn create_order(&self, buyer_id: Uuid, listing_id: Uuid, quantity: u32) -> Result<Order> {
        if quantity < 1 {
            return Err(Error::ValidationError("Order quantity must be at least 1".to_string()));
        }

        let listing = self.listings.get_listing(listing_id).await
            .with_context(|| format!("Failed to retrieve listing {}", listing_id))?
            .ok_or_else(|| Error::ListingNotFound(format!("Listing not found: {}", listing_id)))?;

        if listing.owner_id == buyer_id {
            return Err(Error::SelfPurchase(format!(
                "User {} owns listing {}", buyer_id, listing_id
            )));
        }
        if !listing.is_sellable {
            return Err(Error::ListingNotSellable(format!(
                "Listing {} is not offered for sale", listing_id
            )));
        }

        let order_id = self.repo.next_order_id().await?;

        // The reserve re-checks stock and sellability atomically; the checks
        // above only give cleaner errors without side effects.
        self.listings.reserve(listing_id, order_id, quantity).await?;

        let order = Order::new(
            order_id,
            listing_id,
            buyer_id,
            listing.owner_id,
            quantity,
            listing.price,
        );

        match self.repo.insert_order(order).await {
            Ok(order) => {
                info!("Created order {} for listing {} (buyer {})", order.id, listing_id, buyer_id);
                Ok(order)
            }
            Err(e) => {
                // Never leave a reserved-but-orderless state behind.
                self.listings.release(listing_id, order_id).await?;
                Err(e)
            }
        }
    }

    /// Get an order by ID
    pub async fn get_order(&self, order_id: i64) -> Result<Order> {
        self.repo.get_order(order_id).await?
            .ok_or_else(|| Error::OrderNotFound(format!("Order not found: {}", order_id)))
    }

    /// Compute the fee split for an order
    pub async fn get_payment_breakdown(&self, order_id: i64) -> Result<PaymentBreakdown> {
        let order = self.get_order(order_id).await?;
        Ok(PaymentBreakdown::compute(order.id, order.unit_price, order.quantity))
    }

    /// Seller marks the order as out for delivery
    pub async fn mark_delivering(&self, order_id: i64, acting_user_id: Uuid) -> Result<Order> {
        loop {
            let order = self.get_order(order_id).await?;
            if acting_user_id != order.seller_id {
                return Err(Error::NotSeller(format!(
                    "User {} is not the seller of order {}", acting_user_id, order_id
                )));
            }

            let mut updated = order.clone();
            if updated.mark_delivering()? == Transition::NoOp {
                return Ok(order);
            }

            if self.repo.compare_and_update(&order, updated.clone()).await? {
                info!("Order {} is now delivering", order_id);
                return Ok(updated);
            }
            debug!("Order {} changed concurrently, retrying mark-delivering", order_id);
        }
    }

    /// Seller confirms delivery
    pub async fn confirm_delivery_seller(&self, order_id: i64, acting_user_id: Uuid) -> Result<Order> {
        self.confirm_delivery(order_id, acting_user_id, Role::Seller).await
    }

    /// Buyer confirms delivery
    pub async fn confirm_delivery_buyer(&self, order_id: i64, acting_user_id: Uuid) -> Result<Order> {
        self.confirm_delivery(order_id, acting_user_id, Role::Buyer).await
    }

    async fn confirm_delivery(&self, order_id: i64, acting_user_id: Uuid, role: Role) -> Result<Order> {
        loop {
            let order = self.get_order(order_id).await?;
            match role {
                Role::Seller if acting_user_id != order.seller_id => {
                    return Err(Error::NotSeller(format!(
                        "User {} is not the seller of order {}", acting_user_id, order_id
                    )));
                }
                Role::Buyer if acting_user_id != order.buyer_id => {
                    return Err(Error::NotBuyer(format!(
                        "User {} is not the buyer of order {}", acting_user_id, order_id
                    )));
                }
                _ => {}
            }

            let mut updated = order.clone();
            let transition = updated.confirm_delivery(role)?;
            if transition == Transition::NoOp {
                return Ok(order);
            }

            if self.repo.compare_and_update(&order, updated.clone()).await? {
                // Only the write that flipped the order to COMPLETED
                // finalizes the reservation, so it happens exactly once.
                if transition == Transition::Completed {
                    self.listings.finalize(updated.listing_id, order_id).await?;
                    info!("Order {} completed, reservation finalized", order_id);
                } else {
                    info!("Order {} delivery confirmed by {:?}, awaiting the other party", order_id, role);
                }
                return Ok(updated);
            }
            debug!("Order {} changed concurrently, retrying confirmation", order_id);
        }
    }

    /// Cancel the order and release its reservation. Either party may cancel
    /// while the order is not terminal.
    pub async fn cancel_order(&self, order_id: i64, acting_user_id: Uuid) -> Result<Order> {
        loop {
            let order = self.get_order(order_id).await?;
            if order.role_of(acting_user_id).is_none() {
                return Err(Error::NotParty(format!(
                    "User {} is not a party to order {}", acting_user_id, order_id
                )));
            }

            let mut updated = order.clone();
            updated.cancel()?;

            if self.repo.compare_and_update(&order, updated.clone()).await? {
                self.listings.release(updated.listing_id, order_id).await?;
                info!("Order {} cancelled, reservation released", order_id);
                return Ok(updated);
            }
            debug!("Order {} changed concurrently, retrying cancel", order_id);
        }
    }

    /// All orders where `user_id` occupies `role`, projected for display.
    ///
    /// Pure read path: deleted listings or users resolve to placeholders
    /// rather than failing the whole query.
    pub async fn list_orders_for_user(&self, user_id: Uuid, role: Role) -> Result<Vec<OrderView>> {
        let orders = self.repo.orders_for_user(user_id, role).await?;

        let mut views = Vec::with_capacity(orders.len());
        for order in &orders {
            let listing = self.listings.get_listing(order.listing_id).await?;
            let buyer = self.users.get_user(order.buyer_id).await?;
            let seller = self.users.get_user(order.seller_id).await?;
            views.push(OrderView::project(order, listing.as_ref(), buyer.as_ref(), seller.as_ref()));
        }

        Ok(views)
    }
}
