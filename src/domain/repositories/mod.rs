//! Repository traits for the domain layer
//!
//! `RepositoryProvider` gives unified access to all per-aggregate
//! repositories; consumers request only the repository they need:
//!
//! ```ignore
//! async fn handle(repos: &dyn RepositoryProvider) {
//!     let r = repos.reservations().find_by_id("...").await?;
//!     let quota = repos.quotas().get(&key).await?;
//! }
//! ```

use super::menu::MenuItemRepository;
use super::quota::QuotaRepository;
use super::reservation::ReservationRepository;

/// Provides access to all domain repositories.
pub trait RepositoryProvider: Send + Sync {
    fn reservations(&self) -> &dyn ReservationRepository;
    fn quotas(&self) -> &dyn QuotaRepository;
    fn menu_items(&self) -> &dyn MenuItemRepository;
}
