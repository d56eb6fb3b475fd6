//! Decimal type utilities for precise money calculations

use rust_decimal::Decimal;
pub use rust_decimal_macros::dec;

/// Price type with high precision
pub type Price = Decimal;

/// Amount type with high precision (typically Price * quantity)
pub type Amount = Decimal;

/// Service fee rate added on top of the listing price (10%)
pub const SERVICE_FEE_RATE: Decimal = dec!(0.10);

/// Precision helpers for money amounts
pub mod precision {
    use super::*;

    /// Money precision in decimal places (currency minor units)
    pub const MONEY_PRECISION: u32 = 2;

    /// Round an amount to money precision.
    ///
    /// Uses banker's rounding (`round_dp` default). Callers round once at the
    /// final result, never per intermediate step, so quantity multiplication
    /// does not compound rounding error.
    pub fn round_money(amount: Amount) -> Amount {
        amount.round_dp(MONEY_PRECISION)
    }
}
