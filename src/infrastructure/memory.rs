//! In-memory repository implementations for development and testing
//!
//! The quota map sits behind one mutex, which trivially serializes
//! `try_reserve`/`release` per the quota contract. Reservations get the
//! same optimistic-version handling as the SQL store so concurrency
//! tests exercise identical semantics.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::domain::{
    DomainError, DomainResult, MenuItem, MenuItemRepository, QuotaDecision, QuotaRepository,
    RepositoryProvider, Reservation, ReservationQuota, ReservationRepository, SlotKey,
};
use crate::shared::PaginatedResult;

// ── Reservations ───────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryReservationRepository {
    rows: Mutex<HashMap<String, Reservation>>,
}

#[async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Reservation>> {
        Ok(self.rows.lock().unwrap().get(id).cloned())
    }

    async fn save(&self, mut reservation: Reservation) -> DomainResult<Reservation> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(stored) = rows.get(&reservation.id) {
            if stored.version != reservation.version {
                return Err(DomainError::Conflict(format!(
                    "reservation {} was modified concurrently",
                    reservation.id
                )));
            }
        } else if reservation.version != 0 {
            return Err(DomainError::Conflict(format!(
                "reservation {} vanished underneath the update",
                reservation.id
            )));
        }
        reservation.version += 1;
        reservation.updated_at = Utc::now();
        rows.insert(reservation.id.clone(), reservation.clone());
        Ok(reservation)
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        self.rows.lock().unwrap().remove(id);
        Ok(())
    }

    async fn page_by_user(
        &self,
        user_id: &str,
        page: u64,
        limit: u64,
    ) -> DomainResult<PaginatedResult<Reservation>> {
        Ok(page_filtered(&self.rows, page, limit, |r| r.user_id == user_id))
    }

    async fn page_by_restaurant(
        &self,
        restaurant_id: &str,
        page: u64,
        limit: u64,
    ) -> DomainResult<PaginatedResult<Reservation>> {
        Ok(page_filtered(&self.rows, page, limit, |r| {
            r.restaurant_id == restaurant_id
        }))
    }

    async fn find_expired_pending(&self, as_of: DateTime<Utc>) -> DomainResult<Vec<Reservation>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| {
                r.status == crate::domain::ReservationStatus::Pending
                    && r.confirmation_deadline < as_of
            })
            .cloned()
            .collect())
    }

    async fn find_uncompleted_past(
        &self,
        as_of: DateTime<Utc>,
    ) -> DomainResult<Vec<Reservation>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| {
                r.status == crate::domain::ReservationStatus::Confirmed && r.end_time() < as_of
            })
            .cloned()
            .collect())
    }

    async fn find_conflicting(
        &self,
        restaurant_id: &str,
        table_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<Reservation>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| {
                r.restaurant_id == restaurant_id
                    && r.table_id.as_deref() == Some(table_id)
                    && r.status.is_live()
                    && r.reservation_time < end
                    && r.end_time() > start
            })
            .cloned()
            .collect())
    }

    async fn delete_terminal_older_than(&self, cutoff: DateTime<Utc>) -> DomainResult<u64> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|_, r| !(r.is_terminal() && r.updated_at < cutoff));
        Ok((before - rows.len()) as u64)
    }
}

fn page_filtered(
    rows: &Mutex<HashMap<String, Reservation>>,
    page: u64,
    limit: u64,
    filter: impl Fn(&Reservation) -> bool,
) -> PaginatedResult<Reservation> {
    let mut matching: Vec<Reservation> = rows
        .lock()
        .unwrap()
        .values()
        .filter(|r| filter(r))
        .cloned()
        .collect();
    matching.sort_by(|a, b| b.reservation_time.cmp(&a.reservation_time));
    let total = matching.len() as u64;
    let items = matching
        .into_iter()
        .skip((page.saturating_sub(1) * limit) as usize)
        .take(limit as usize)
        .collect();
    PaginatedResult::new(items, total, page, limit)
}

// ── Quotas ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryQuotaRepository {
    rows: Mutex<HashMap<SlotKey, ReservationQuota>>,
}

impl InMemoryQuotaRepository {
    /// Preload a quota row (test setup).
    pub fn preload(&self, quota: ReservationQuota) {
        self.rows.lock().unwrap().insert(quota.key(), quota);
    }
}

fn evaluate(quota: &ReservationQuota, party_size: i32) -> QuotaDecision {
    if !quota.has_availability() {
        QuotaDecision::Unavailable
    } else if !quota.can_accommodate(party_size) {
        QuotaDecision::CannotAccommodate
    } else {
        QuotaDecision::Granted
    }
}

#[async_trait]
impl QuotaRepository for InMemoryQuotaRepository {
    async fn get(&self, key: &SlotKey) -> DomainResult<Option<ReservationQuota>> {
        Ok(self.rows.lock().unwrap().get(key).cloned())
    }

    async fn try_reserve(&self, key: &SlotKey, party_size: i32) -> DomainResult<QuotaDecision> {
        let mut rows = self.rows.lock().unwrap();
        let mut quota = rows
            .get(key)
            .cloned()
            .unwrap_or_else(|| ReservationQuota::with_defaults(key));
        let decision = evaluate(&quota, party_size);
        if decision == QuotaDecision::Granted {
            quota.current_reservations += 1;
            quota.current_capacity += party_size;
            rows.insert(key.clone(), quota);
        }
        Ok(decision)
    }

    async fn release(&self, key: &SlotKey, party_size: i32) -> DomainResult<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(quota) = rows.get_mut(key) {
            quota.current_reservations = (quota.current_reservations - 1).max(0);
            quota.current_capacity = (quota.current_capacity - party_size).max(0);
        }
        Ok(())
    }

    async fn check(&self, key: &SlotKey, party_size: i32) -> DomainResult<QuotaDecision> {
        let rows = self.rows.lock().unwrap();
        let quota = rows
            .get(key)
            .cloned()
            .unwrap_or_else(|| ReservationQuota::with_defaults(key));
        Ok(evaluate(&quota, party_size))
    }
}

// ── Menu items ─────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryMenuItemRepository {
    rows: DashMap<String, MenuItem>,
}

#[async_trait]
impl MenuItemRepository for InMemoryMenuItemRepository {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<MenuItem>> {
        Ok(self.rows.get(id).map(|entry| entry.clone()))
    }

    async fn find_by_restaurant(&self, restaurant_id: &str) -> DomainResult<Vec<MenuItem>> {
        Ok(self
            .rows
            .iter()
            .filter(|entry| entry.restaurant_id == restaurant_id)
            .map(|entry| entry.clone())
            .collect())
    }

    async fn upsert(&self, item: MenuItem) -> DomainResult<()> {
        self.rows.insert(item.id.clone(), item);
        Ok(())
    }

    async fn deactivate(&self, id: &str) -> DomainResult<()> {
        if let Some(mut entry) = self.rows.get_mut(id) {
            entry.active = false;
        }
        Ok(())
    }
}

// ── Provider ───────────────────────────────────────────────────

/// In-memory provider bundling all three repositories.
#[derive(Default)]
pub struct InMemoryRepositories {
    reservations: InMemoryReservationRepository,
    quotas: InMemoryQuotaRepository,
    menu_items: InMemoryMenuItemRepository,
}

impl InMemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self::new())
    }

    /// Direct access for test setup.
    pub fn quotas_mut(&self) -> &InMemoryQuotaRepository {
        &self.quotas
    }
}

impl RepositoryProvider for InMemoryRepositories {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HistoryAction, ReservationStatus};
    use chrono::Duration;
    use std::sync::Arc;

    fn slot() -> SlotKey {
        SlotKey::for_reservation(
            "R1",
            DateTime::parse_from_rfc3339("2025-01-08T19:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        )
    }

    fn sample(id: &str) -> Reservation {
        let now = Utc::now();
        Reservation {
            id: id.to_string(),
            user_id: "U1".to_string(),
            restaurant_id: "R1".to_string(),
            table_id: None,
            reservation_time: now + Duration::days(7),
            duration_minutes: 120,
            party_size: 4,
            status: ReservationStatus::Pending,
            customer_name: "John Doe".to_string(),
            customer_phone: Some("+11234567890".to_string()),
            customer_email: None,
            special_requests: None,
            reminders_enabled: true,
            created_at: now,
            updated_at: now,
            confirmation_deadline: now + Duration::minutes(15),
            confirmed_at: None,
            cancelled_at: None,
            completed_at: None,
            cancellation_reason: None,
            history: Vec::new(),
            menu_items: Vec::new(),
            version: 0,
        }
    }

    #[tokio::test]
    async fn save_bumps_version_and_detects_conflicts() {
        let repo = InMemoryReservationRepository::default();
        let saved = repo.save(sample("res-1")).await.unwrap();
        assert_eq!(saved.version, 1);

        // stale copy loses
        let stale = sample("res-1");
        let err = repo.save(stale).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        // fresh copy wins
        let mut fresh = saved.clone();
        fresh.record(HistoryAction::Confirmed, "ok", "U1", Utc::now());
        let saved_again = repo.save(fresh).await.unwrap();
        assert_eq!(saved_again.version, 2);
        assert_eq!(saved_again.history.len(), 1);
    }

    #[tokio::test]
    async fn quota_try_reserve_is_serializable() {
        let repo = Arc::new(InMemoryQuotaRepository::default());
        let key = slot();

        let mut handles = Vec::new();
        for _ in 0..30 {
            let repo = repo.clone();
            let key = key.clone();
            handles.push(tokio::spawn(
                async move { repo.try_reserve(&key, 4).await },
            ));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == QuotaDecision::Granted {
                granted += 1;
            }
        }
        // defaults: 10 reservations max, 100 capacity; the count cap binds first
        assert_eq!(granted, 10);
        let quota = repo.get(&key).await.unwrap().unwrap();
        assert_eq!(quota.current_reservations, 10);
        assert_eq!(quota.current_capacity, 40);
    }

    #[tokio::test]
    async fn quota_release_clamps_at_zero_and_ignores_missing_rows() {
        let repo = InMemoryQuotaRepository::default();
        let key = slot();

        // release with no row: no-op
        repo.release(&key, 4).await.unwrap();
        assert!(repo.get(&key).await.unwrap().is_none());

        repo.try_reserve(&key, 4).await.unwrap();
        repo.release(&key, 10).await.unwrap();
        repo.release(&key, 10).await.unwrap();
        let quota = repo.get(&key).await.unwrap().unwrap();
        assert_eq!(quota.current_reservations, 0);
        assert_eq!(quota.current_capacity, 0);
    }

    #[tokio::test]
    async fn conflicting_reservations_overlap_window() {
        let repo = InMemoryReservationRepository::default();
        let mut r = sample("res-1");
        r.table_id = Some("T1".to_string());
        let r = repo.save(r).await.unwrap();

        let overlapping = repo
            .find_conflicting(
                "R1",
                "T1",
                r.reservation_time - Duration::minutes(30),
                r.reservation_time + Duration::minutes(30),
            )
            .await
            .unwrap();
        assert_eq!(overlapping.len(), 1);

        // adjacent window [end_time, …) does not overlap
        let adjacent = repo
            .find_conflicting("R1", "T1", r.end_time(), r.end_time() + Duration::hours(1))
            .await
            .unwrap();
        assert!(adjacent.is_empty());
    }

    #[tokio::test]
    async fn cleanup_removes_only_old_terminal_rows() {
        let repo = InMemoryReservationRepository::default();
        let live = repo.save(sample("live")).await.unwrap();
        let mut done = sample("done");
        done.cancel("test", Utc::now());
        repo.save(done).await.unwrap();

        // nothing is old yet
        let removed = repo
            .delete_terminal_older_than(Utc::now() - Duration::days(90))
            .await
            .unwrap();
        assert_eq!(removed, 0);

        // everything updated before a future cutoff, but only terminal rows go
        let removed = repo
            .delete_terminal_older_than(Utc::now() + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(repo.find_by_id(&live.id).await.unwrap().is_some());
        assert!(repo.find_by_id("done").await.unwrap().is_none());
    }
}
