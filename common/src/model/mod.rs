//! Domain models for the marketplace order core

pub mod listing;
pub mod order;
pub mod payment;
pub mod user;
