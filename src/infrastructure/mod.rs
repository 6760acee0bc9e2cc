//! Infrastructure layer - external concerns

pub mod database;
pub mod memory;
pub mod rest;

pub use database::init_database;
pub use memory::InMemoryRepositories;
pub use rest::{AvailableTablesApi, RestTablesClient};
