//! Order service: the order record store, the lifecycle state machine, and
//! the role-scoped view projector

pub mod service;
pub mod repository;
pub mod directory;
pub mod views;
pub mod config;

pub use service::{OrderService, RepositoryType};
pub use repository::{OrderRepository, InMemoryOrderRepository, PostgresOrderRepository};
pub use directory::{UserDirectory, InMemoryUserDirectory};
pub use views::OrderView;
pub use config::OrderServiceConfig;
