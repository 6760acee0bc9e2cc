//! Reservation repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::Reservation;
use crate::domain::DomainResult;
use crate::shared::PaginatedResult;

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Find a reservation by id, with history and menu items loaded.
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Reservation>>;

    /// Upsert the aggregate (reservation row, history, menu items).
    ///
    /// Refreshes `updated_at` and bumps the optimistic-lock version;
    /// returns `Conflict` when the stored version moved underneath us.
    async fn save(&self, reservation: Reservation) -> DomainResult<Reservation>;

    /// Delete the aggregate and its owned rows. No-op for unknown ids.
    async fn delete(&self, id: &str) -> DomainResult<()>;

    /// Page reservations for a user, newest first. History and menu
    /// items may be omitted on list queries.
    async fn page_by_user(
        &self,
        user_id: &str,
        page: u64,
        limit: u64,
    ) -> DomainResult<PaginatedResult<Reservation>>;

    /// Page reservations for a restaurant, newest first.
    async fn page_by_restaurant(
        &self,
        restaurant_id: &str,
        page: u64,
        limit: u64,
    ) -> DomainResult<PaginatedResult<Reservation>>;

    /// All PENDING reservations whose confirmation deadline passed.
    async fn find_expired_pending(&self, as_of: DateTime<Utc>) -> DomainResult<Vec<Reservation>>;

    /// All CONFIRMED reservations whose end time is before `as_of`.
    async fn find_uncompleted_past(&self, as_of: DateTime<Utc>)
        -> DomainResult<Vec<Reservation>>;

    /// Live (PENDING/CONFIRMED) reservations on `table_id` whose
    /// `[reservation_time, end_time)` overlaps `[start, end)`.
    async fn find_conflicting(
        &self,
        restaurant_id: &str,
        table_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<Reservation>>;

    /// Delete terminal reservations last updated before `cutoff`.
    /// Returns how many aggregates were removed.
    async fn delete_terminal_older_than(&self, cutoff: DateTime<Utc>) -> DomainResult<u64>;
}
