//! # DineSync Reservations
//!
//! Reservation-management core for a restaurant-reservation platform.
//!
//! ## Architecture (Clean / SOLID)
//!
//! - **shared**: Cross-cutting utilities (clock, shutdown, retry, pagination)
//! - **domain**: Core business entities, repository traits, and errors
//! - **application**: Use-case orchestration, correlation broker, DTOs
//! - **cache**: Process-lifetime hint caches (table status)
//! - **messaging**: Bus topics, wire types, Kafka producer/consumers
//! - **infrastructure**: External concerns (database, REST fallback)
//! - **config**: Application configuration (TOML-based)
//!
//! The collaborating services (restaurant, kitchen, table inventory)
//! are reachable only over an async bus; the correlation broker in
//! `application::correlation` turns those exchanges into bounded
//! request/response calls.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod messaging;
pub mod shared;

// Re-export commonly used types at crate root
pub use application::{
    CorrelationBrokers, ExpirationReconciler, MenuProjection, ReservationService,
    RestaurantValidator, TableAssigner,
};
pub use config::{default_config_path, AppConfig};
pub use infrastructure::{init_database, InMemoryRepositories};
