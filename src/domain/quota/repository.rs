//! Quota repository interface

use async_trait::async_trait;

use super::model::{ReservationQuota, SlotKey};
use crate::domain::DomainResult;

/// Outcome of a quota probe or reservation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    /// Capacity granted (or, for `check`, would be granted).
    Granted,
    /// The slot's reservation-count or threshold limit is reached.
    Unavailable,
    /// The remaining seat capacity cannot fit the party.
    CannotAccommodate,
}

#[async_trait]
pub trait QuotaRepository: Send + Sync {
    /// Read the quota row for a slot, if one exists.
    async fn get(&self, key: &SlotKey) -> DomainResult<Option<ReservationQuota>>;

    /// Atomically claim one reservation and `party_size` seats.
    ///
    /// Creates the row with defaults when absent. At most one concurrent
    /// caller wins each unit of capacity; losers observe `Unavailable`
    /// or `CannotAccommodate` and nothing is mutated for them.
    async fn try_reserve(&self, key: &SlotKey, party_size: i32) -> DomainResult<QuotaDecision>;

    /// Atomically return one reservation and `party_size` seats,
    /// clamped at zero. Releasing a slot with no row is a no-op.
    async fn release(&self, key: &SlotKey, party_size: i32) -> DomainResult<()>;

    /// Read-only probe: what would `try_reserve` answer right now.
    async fn check(&self, key: &SlotKey, party_size: i32) -> DomainResult<QuotaDecision>;
}
