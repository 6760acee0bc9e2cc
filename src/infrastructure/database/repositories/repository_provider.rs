//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::menu::MenuItemRepository;
use crate::domain::quota::QuotaRepository;
use crate::domain::repositories::RepositoryProvider;
use crate::domain::reservation::ReservationRepository;

use super::menu_item_repository::SeaOrmMenuItemRepository;
use super::quota_repository::SeaOrmQuotaRepository;
use super::reservation_repository::SeaOrmReservationRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository
/// accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let r = repos.reservations().find_by_id("...").await?;
/// let quota = repos.quotas().get(&key).await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    reservations: SeaOrmReservationRepository,
    quotas: SeaOrmQuotaRepository,
    menu_items: SeaOrmMenuItemRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            reservations: SeaOrmReservationRepository::new(db.clone()),
            quotas: SeaOrmQuotaRepository::new(db.clone()),
            menu_items: SeaOrmMenuItemRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn reservations(&self) -> &dyn ReservationRepository {
        &self.reservations
    }

    fn quotas(&self) -> &dyn QuotaRepository {
        &self.quotas
    }

    fn menu_items(&self) -> &dyn MenuItemRepository {
        &self.menu_items
    }
}
