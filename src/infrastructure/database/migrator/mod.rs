//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_reservations;
mod m20250101_000002_create_reservation_history;
mod m20250101_000003_create_reservation_menu_items;
mod m20250101_000004_create_reservation_quotas;
mod m20250101_000005_create_menu_items;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_reservations::Migration),
            Box::new(m20250101_000002_create_reservation_history::Migration),
            Box::new(m20250101_000003_create_reservation_menu_items::Migration),
            Box::new(m20250101_000004_create_reservation_quotas::Migration),
            Box::new(m20250101_000005_create_menu_items::Migration),
        ]
    }
}
