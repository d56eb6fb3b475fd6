//! Payment breakdown calculator

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{precision, Amount, Price, SERVICE_FEE_RATE};
#[cfg(feature = "utoipa")]
use crate::utoipa::ToSchema;

/// Payment breakdown for an order
///
/// Derived on demand from the order's captured unit price and quantity; never
/// persisted independently. Recomputing for the same order always yields the
/// same result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct PaymentBreakdown {
    /// Order this breakdown belongs to
    pub order_id: i64,
    /// Amount the buyer pays (listing price plus service fee)
    pub buyer_pays: Amount,
    /// Amount the seller receives (listing price, no fee)
    pub seller_receives: Amount,
    /// Human-readable rendering of the two figures and the fee rate
    pub summary: String,
}

impl PaymentBreakdown {
    /// Compute the fee split for an order.
    ///
    /// Pure function of its inputs: no I/O, no side effects. Rounding to
    /// money precision is applied once at each final figure, not per
    /// intermediate step.
    pub fn compute(order_id: i64, unit_price: Price, quantity: u32) -> Self {
        let subtotal = unit_price * Decimal::from(quantity);
        let seller_receives = precision::round_money(subtotal);
        let buyer_pays = precision::round_money(subtotal * (Decimal::ONE + SERVICE_FEE_RATE));
        let fee_percent = (SERVICE_FEE_RATE * Decimal::from(100)).normalize();

        let summary = format!(
            "Buyer pays {} (includes {}% service fee), seller receives {}",
            buyer_pays, fee_percent, seller_receives
        );

        Self {
            order_id,
            buyer_pays,
            seller_receives,
            summary,
        }
    }
}
