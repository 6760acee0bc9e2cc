//! Table assigner — obtains a physical table for a reservation
//!
//! Primary path asks the table-inventory service over the bus
//! (correlated, bounded by `table.availability.request.timeout`); on
//! timeout or failure it degrades to the restaurant service's REST
//! endpoint and filters candidates locally: capacity, cached status,
//! and overlap conflicts in our own store. Candidate order from the
//! remote is preserved, so ties resolve deterministically to the first
//! listed table.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::application::correlation::SharedCorrelationBrokers;
use crate::cache::SharedTableStatusCache;
use crate::domain::{DomainResult, RepositoryProvider, Reservation, TableStatus};
use crate::infrastructure::rest::AvailableTablesApi;
use crate::messaging::messages::{FindAvailableTableRequest, TableStatusMessage};
use crate::messaging::{OutboundEvent, SharedEventPublisher};

/// A table whose cached status the assigner just flipped; carried to
/// the post-persist announcement (cache first, events after commit).
#[derive(Debug, Clone)]
pub struct TableTransition {
    pub table_id: String,
    pub old_status: Option<TableStatus>,
    pub new_status: TableStatus,
}

pub struct TableAssigner {
    brokers: SharedCorrelationBrokers,
    publisher: SharedEventPublisher,
    repos: Arc<dyn RepositoryProvider>,
    status_cache: SharedTableStatusCache,
    tables_api: Arc<dyn AvailableTablesApi>,
    find_timeout: Duration,
}

impl TableAssigner {
    pub fn new(
        brokers: SharedCorrelationBrokers,
        publisher: SharedEventPublisher,
        repos: Arc<dyn RepositoryProvider>,
        status_cache: SharedTableStatusCache,
        tables_api: Arc<dyn AvailableTablesApi>,
        find_timeout: Duration,
    ) -> Self {
        Self {
            brokers,
            publisher,
            repos,
            status_cache,
            tables_api,
            find_timeout,
        }
    }

    /// Find a table id satisfying the reservation's window and party
    /// size, or None when neither path produced one.
    pub async fn find_table(&self, reservation: &Reservation) -> DomainResult<Option<String>> {
        if let Some(table_id) = self.find_via_bus(reservation).await {
            return Ok(Some(table_id));
        }
        self.find_via_rest(reservation).await
    }

    async fn find_via_bus(&self, reservation: &Reservation) -> Option<String> {
        let correlation_id = Uuid::new_v4().to_string();
        let pending = match self.brokers.table_find.register(&correlation_id) {
            Ok(pending) => pending,
            Err(e) => {
                warn!(error = %e, "Table-find registration failed, falling back to REST");
                return None;
            }
        };

        let request = FindAvailableTableRequest {
            reservation_id: reservation.id.clone(),
            restaurant_id: reservation.restaurant_id.clone(),
            start_time: reservation.reservation_time,
            end_time: reservation.end_time(),
            party_size: reservation.party_size,
            correlation_id: correlation_id.clone(),
        };
        if let Err(e) = self.publisher.publish(OutboundEvent::FindTable(request)).await {
            self.brokers
                .table_find
                .cancel(&correlation_id, "publish failed");
            warn!(error = %e, "Table-find publish failed, falling back to REST");
            return None;
        }

        match self
            .brokers
            .table_find
            .wait(pending, self.find_timeout)
            .await
        {
            Ok(response) if response.success && response.table_id.is_some() => response.table_id,
            Ok(response) => {
                info!(
                    reservation_id = reservation.id.as_str(),
                    error = response.error_message.as_deref().unwrap_or("no table"),
                    "Table finder answered without a table, falling back to REST"
                );
                None
            }
            Err(e) => {
                warn!(
                    reservation_id = reservation.id.as_str(),
                    error = %e,
                    "Table finder did not answer, falling back to REST"
                );
                None
            }
        }
    }

    async fn find_via_rest(&self, reservation: &Reservation) -> DomainResult<Option<String>> {
        let Some(candidates) = self
            .tables_api
            .fetch_available(&reservation.restaurant_id)
            .await
        else {
            return Ok(None);
        };

        for candidate in candidates {
            if candidate.capacity < reservation.party_size {
                continue;
            }
            // the cache is a hint; only a known non-available status skips
            if matches!(
                self.status_cache.get(&candidate.id),
                Some(status) if status != TableStatus::Available
            ) {
                continue;
            }
            let conflicts = self
                .repos
                .reservations()
                .find_conflicting(
                    &reservation.restaurant_id,
                    &candidate.id,
                    reservation.reservation_time,
                    reservation.end_time(),
                )
                .await?;
            if conflicts.is_empty() {
                return Ok(Some(candidate.id));
            }
        }
        Ok(None)
    }

    /// Find a table and mark it on the aggregate + cache. The caller
    /// persists the aggregate and then announces via
    /// [`announce_assignment`](Self::announce_assignment).
    pub async fn assign(
        &self,
        reservation: &mut Reservation,
    ) -> DomainResult<Option<TableTransition>> {
        let Some(table_id) = self.find_table(reservation).await? else {
            return Ok(None);
        };
        let old_status = self.status_cache.put(&table_id, TableStatus::Reserved);
        reservation.table_id = Some(table_id.clone());
        Ok(Some(TableTransition {
            table_id,
            old_status,
            new_status: TableStatus::Reserved,
        }))
    }

    /// Clear the table assignment and flip the cache back to AVAILABLE.
    /// Returns None when nothing was assigned.
    pub fn release(&self, reservation: &mut Reservation) -> Option<TableTransition> {
        let table_id = reservation.table_id.take()?;
        let old_status = self.status_cache.put(&table_id, TableStatus::Available);
        Some(TableTransition {
            table_id,
            old_status,
            new_status: TableStatus::Available,
        })
    }

    /// Undo a not-yet-announced transition (failure between assign and
    /// persist): restore the previous cached status.
    pub fn revert(&self, transition: &TableTransition) {
        match transition.old_status {
            Some(status) => {
                self.status_cache.put(&transition.table_id, status);
            }
            None => {
                self.status_cache
                    .put(&transition.table_id, TableStatus::Available);
            }
        }
    }

    /// Emit TableAssigned + TableStatusChanged after the aggregate
    /// committed. Best-effort: publish failures are logged only.
    pub async fn announce_assignment(
        &self,
        reservation: &Reservation,
        transition: &TableTransition,
    ) {
        let assigned = TableStatusMessage::TableAssigned {
            restaurant_id: reservation.restaurant_id.clone(),
            table_id: transition.table_id.clone(),
            reservation_id: reservation.id.clone(),
        };
        if let Err(e) = self.publisher.publish(OutboundEvent::TableStatus(assigned)).await {
            warn!(error = %e, "TableAssigned publish failed");
        }
        self.announce_transition(&reservation.restaurant_id, transition, Some(&reservation.id))
            .await;
    }

    /// Emit the status change for a released table after commit.
    pub async fn announce_release(
        &self,
        restaurant_id: &str,
        transition: &TableTransition,
        reservation_id: &str,
    ) {
        self.announce_transition(restaurant_id, transition, Some(reservation_id))
            .await;
    }

    async fn announce_transition(
        &self,
        restaurant_id: &str,
        transition: &TableTransition,
        reservation_id: Option<&str>,
    ) {
        let changed = TableStatusMessage::TableStatusChanged {
            restaurant_id: restaurant_id.to_string(),
            table_id: transition.table_id.clone(),
            old_status: transition.old_status,
            new_status: transition.new_status,
            reservation_id: reservation_id.map(String::from),
        };
        if let Err(e) = self.publisher.publish(OutboundEvent::TableStatus(changed)).await {
            warn!(error = %e, "TableStatusChanged publish failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::correlation::CorrelationBrokers;
    use crate::application::testkit::{RemoteScript, ScriptedBus, StubTablesApi};
    use crate::cache::TableStatusCache;
    use crate::domain::ReservationRepository;
    use crate::infrastructure::memory::InMemoryRepositories;
    use crate::infrastructure::rest::TableCandidate;
    use chrono::{Duration as ChronoDuration, Utc};

    fn reservation() -> Reservation {
        let now = Utc::now();
        Reservation {
            id: "res-1".to_string(),
            user_id: "U1".to_string(),
            restaurant_id: "R1".to_string(),
            table_id: None,
            reservation_time: now + ChronoDuration::days(7),
            duration_minutes: 120,
            party_size: 4,
            status: crate::domain::ReservationStatus::Pending,
            customer_name: "John Doe".to_string(),
            customer_phone: Some("+11234567890".to_string()),
            customer_email: None,
            special_requests: None,
            reminders_enabled: true,
            created_at: now,
            updated_at: now,
            confirmation_deadline: now + ChronoDuration::minutes(15),
            confirmed_at: None,
            cancelled_at: None,
            completed_at: None,
            cancellation_reason: None,
            history: Vec::new(),
            menu_items: Vec::new(),
            version: 0,
        }
    }

    fn assigner_with(
        script: RemoteScript,
        tables: Option<Vec<TableCandidate>>,
    ) -> (TableAssigner, Arc<InMemoryRepositories>, SharedTableStatusCache) {
        let brokers = CorrelationBrokers::shared();
        let bus = Arc::new(ScriptedBus::new(brokers.clone(), script));
        let repos = InMemoryRepositories::shared();
        let cache = TableStatusCache::shared();
        let assigner = TableAssigner::new(
            brokers,
            bus,
            repos.clone(),
            cache.clone(),
            Arc::new(StubTablesApi { tables }),
            Duration::from_millis(40),
        );
        (assigner, repos, cache)
    }

    #[tokio::test]
    async fn bus_path_wins_when_finder_answers() {
        let (assigner, _, _) = assigner_with(RemoteScript::default(), None);
        let found = assigner.find_table(&reservation()).await.unwrap();
        assert_eq!(found.as_deref(), Some("T1"));
    }

    #[tokio::test]
    async fn fallback_filters_capacity_cache_and_conflicts() {
        let script = RemoteScript {
            table_silent: true, // force fallback
            ..RemoteScript::default()
        };
        let tables = vec![
            TableCandidate {
                id: "small".to_string(),
                capacity: 2,
            },
            TableCandidate {
                id: "occupied".to_string(),
                capacity: 6,
            },
            TableCandidate {
                id: "busy".to_string(),
                capacity: 4,
            },
            TableCandidate {
                id: "free".to_string(),
                capacity: 4,
            },
        ];
        let (assigner, repos, cache) = assigner_with(script, Some(tables));
        cache.put("occupied", TableStatus::Occupied);

        // "busy" already holds an overlapping live reservation
        let mut existing = reservation();
        existing.id = "other".to_string();
        existing.table_id = Some("busy".to_string());
        repos.reservations().save(existing).await.unwrap();

        let found = assigner.find_table(&reservation()).await.unwrap();
        assert_eq!(found.as_deref(), Some("free"));
    }

    #[tokio::test]
    async fn fallback_preserves_remote_order() {
        let script = RemoteScript {
            table_success: false, // finder answers but has nothing
            table: None,
            ..RemoteScript::default()
        };
        let tables = vec![
            TableCandidate {
                id: "first".to_string(),
                capacity: 8,
            },
            TableCandidate {
                id: "second".to_string(),
                capacity: 8,
            },
        ];
        let (assigner, _, _) = assigner_with(script, Some(tables));
        let found = assigner.find_table(&reservation()).await.unwrap();
        assert_eq!(found.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn no_table_anywhere_is_none() {
        let script = RemoteScript {
            table_silent: true,
            ..RemoteScript::default()
        };
        let (assigner, _, _) = assigner_with(script, None);
        assert_eq!(assigner.find_table(&reservation()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn assign_updates_cache_and_release_reverts_it() {
        let (assigner, _, cache) = assigner_with(RemoteScript::default(), None);
        let mut r = reservation();

        let transition = assigner.assign(&mut r).await.unwrap().unwrap();
        assert_eq!(r.table_id.as_deref(), Some("T1"));
        assert_eq!(transition.new_status, TableStatus::Reserved);
        assert_eq!(cache.get("T1"), Some(TableStatus::Reserved));

        let released = assigner.release(&mut r).unwrap();
        assert_eq!(r.table_id, None);
        assert_eq!(released.new_status, TableStatus::Available);
        assert_eq!(cache.get("T1"), Some(TableStatus::Available));

        // releasing again is a no-op
        assert!(assigner.release(&mut r).is_none());
    }
}
