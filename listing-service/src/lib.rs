//! Listing service: the listing directory and the inventory ledger

pub mod service;
pub mod repository;
pub mod config;

pub use service::{ListingService, NewListing, ListingUpdate, RepositoryType};
pub use repository::{ListingRepository, InMemoryListingRepository, PostgresListingRepository};
pub use repository::{Reservation, ReservationState};
pub use config::ListingServiceConfig;
