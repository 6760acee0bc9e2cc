//! Durable reservation store (SeaORM).
//!
//! The database URL comes straight from [`AppConfig`]'s `[database]`
//! section; there is no separate connection-config layer. SQLite is
//! the default backend, PostgreSQL works with a `postgres://` URL.
//!
//! [`AppConfig`]: crate::config::AppConfig

pub mod entities;
pub mod migrator;
pub mod repositories;

use std::time::Duration;

use log::LevelFilter;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

/// Connect to the reservation store.
///
/// The pool stays small: the write paths serialize per reservation and
/// per quota row anyway, and the quota CAS loop prefers a quick retry
/// over a queue of stale writers.
pub async fn init_database(url: &str) -> Result<DatabaseConnection, sea_orm::DbErr> {
    info!(url, "Connecting to reservation store");
    let mut options = ConnectOptions::new(url.to_string());
    options
        .max_connections(10)
        .connect_timeout(Duration::from_secs(5))
        .acquire_timeout(Duration::from_secs(5))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);
    let db = Database::connect(options).await?;
    info!("Reservation store connected");
    Ok(db)
}
