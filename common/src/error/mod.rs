//! Error types for the marketplace order core
//!
//! This module provides a unified error handling system for all services
//! in the marketplace. It defines standard error types that can be used
//! across service boundaries and provides consistent error conversion.

use std::fmt::Display;
use thiserror::Error;

/// Marketplace error type
#[derive(Debug, Error)]
pub enum Error {
    /// Error when a listing lacks available stock for a reservation
    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    /// Error when a buyer attempts to purchase their own listing
    #[error("Self purchase: {0}")]
    SelfPurchase(String),

    /// Error when a listing is not offered for sale
    #[error("Listing not sellable: {0}")]
    ListingNotSellable(String),

    /// Error when a listing still has outstanding reservations
    #[error("Listing not deletable: {0}")]
    ListingNotDeletable(String),

    /// Error when the acting user is not the buyer of the order
    #[error("Not the buyer: {0}")]
    NotBuyer(String),

    /// Error when the acting user is not the seller of the order
    #[error("Not the seller: {0}")]
    NotSeller(String),

    /// Error when the acting user is neither party to the order
    #[error("Not a party to the order: {0}")]
    NotParty(String),

    /// Error when a transition is attempted on a completed or cancelled order
    #[error("Order is terminal: {0}")]
    TerminalOrder(String),

    /// Error when the requested transition is not legal from the current state
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Error when an order cannot be found
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Error when a listing cannot be found
    #[error("Listing not found: {0}")]
    ListingNotFound(String),

    /// Error when a user cannot be found
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Generic validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Decimal conversion error
    #[error("Decimal conversion error: {0}")]
    DecimalError(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait to add context to error results
pub trait ErrorExt<T> {
    /// Add context information to an error
    fn with_context<C, F>(self, context_fn: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Display;
}

impl<T> ErrorExt<T> for Result<T> {
    fn with_context<C, F>(self, context_fn: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Display,
    {
        self.map_err(|e| {
            let context = context_fn().to_string();
            match e {
                Error::InsufficientStock(msg) => Error::InsufficientStock(format!("{}: {}", context, msg)),
                Error::SelfPurchase(msg) => Error::SelfPurchase(format!("{}: {}", context, msg)),
                Error::ListingNotSellable(msg) => Error::ListingNotSellable(format!("{}: {}", context, msg)),
                Error::ListingNotDeletable(msg) => Error::ListingNotDeletable(format!("{}: {}", context, msg)),
                Error::NotBuyer(msg) => Error::NotBuyer(format!("{}: {}", context, msg)),
                Error::NotSeller(msg) => Error::NotSeller(format!("{}: {}", context, msg)),
                Error::NotParty(msg) => Error::NotParty(format!("{}: {}", context, msg)),
                Error::TerminalOrder(msg) => Error::TerminalOrder(format!("{}: {}", context, msg)),
                Error::InvalidTransition(msg) => Error::InvalidTransition(format!("{}: {}", context, msg)),
                Error::OrderNotFound(msg) => Error::OrderNotFound(format!("{}: {}", context, msg)),
                Error::ListingNotFound(msg) => Error::ListingNotFound(format!("{}: {}", context, msg)),
                Error::UserNotFound(msg) => Error::UserNotFound(format!("{}: {}", context, msg)),
                Error::ValidationError(msg) => Error::ValidationError(format!("{}: {}", context, msg)),
                Error::ConfigurationError(msg) => Error::ConfigurationError(format!("{}: {}", context, msg)),
                Error::Internal(msg) => Error::Internal(format!("{}: {}", context, msg)),
                Error::Database(e) => Error::Database(e),
                Error::Migration(e) => Error::Migration(e),
                Error::Serialization(e) => Error::Serialization(e),
                Error::DecimalError(msg) => Error::DecimalError(format!("{}: {}", context, msg)),
            }
        })
    }
}

/// Trait for converting other error types to our Error type
pub trait IntoError {
    /// Convert to Error
    fn into_error(self, message: &str) -> Error;
}

impl<E: std::error::Error> IntoError for E {
    fn into_error(self, message: &str) -> Error {
        Error::Internal(format!("{}: {}", message, self))
    }
}

/// Convert string messages into an error
impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::Internal(message)
    }
}

/// Convert static string references into an error
impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Error::Internal(message.to_string())
    }
}

/// From rust_decimal::Error
impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::DecimalError(err.to_string())
    }
}
