//! Background reconciliation of overdue reservations.
//!
//! Three periodic passes, each running in its own tokio loop until
//! shutdown:
//! - expire-pending: PENDING past the confirmation deadline is
//!   cancelled by SYSTEM with quota + table released;
//! - complete-past: CONFIRMED an hour past its end time is closed per
//!   the completion policy (no quota release; past slots do not
//!   compete with future bookings);
//! - data-cleanup: terminal aggregates older than the retention window
//!   are deleted outright.
//!
//! Every pass re-checks the row's status before acting and treats an
//! optimistic-lock conflict as "the interactive path won", which makes
//! re-running a pass on the same snapshot a no-op.

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use tracing::{debug, info, warn};

use super::{release_quota_with_retry, TableAssigner};
use crate::application::correlation::SharedCorrelationBrokers;
use crate::domain::{
    DomainError, DomainResult, HistoryAction, RepositoryProvider, ReservationStatus, SlotKey,
    SYSTEM_ACTOR,
};
use crate::messaging::messages::ReservationCancelledEvent;
use crate::messaging::{OutboundEvent, SharedEventPublisher};
use crate::shared::{SharedClock, ShutdownSignal};

/// Reason recorded when the system cancels an unconfirmed reservation.
const DEADLINE_EXPIRED_REASON: &str = "Confirmation deadline expired";

/// Grace period after `end_time` before a CONFIRMED reservation is
/// considered over.
const COMPLETION_GRACE_HOURS: i64 = 1;

/// What to do with a CONFIRMED reservation whose window passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionPolicy {
    /// Assume the party showed up (the default).
    Complete,
    /// Assume the party never arrived.
    NoShow,
}

/// Intervals and retention for the reconciler loops.
#[derive(Debug, Clone)]
pub struct ReconcilerSchedule {
    pub expired_reservations_interval: Duration,
    pub data_cleanup_interval: Duration,
    pub data_cleanup_initial_delay: Duration,
    pub data_cleanup_age_days: i64,
}

impl Default for ReconcilerSchedule {
    fn default() -> Self {
        Self {
            expired_reservations_interval: Duration::from_millis(60_000),
            data_cleanup_interval: Duration::from_millis(86_400_000),
            data_cleanup_initial_delay: Duration::from_millis(3_600_000),
            data_cleanup_age_days: 90,
        }
    }
}

pub struct ExpirationReconciler {
    repos: Arc<dyn RepositoryProvider>,
    assigner: Arc<TableAssigner>,
    publisher: SharedEventPublisher,
    clock: SharedClock,
    policy: CompletionPolicy,
}

impl ExpirationReconciler {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        assigner: Arc<TableAssigner>,
        publisher: SharedEventPublisher,
        clock: SharedClock,
        policy: CompletionPolicy,
    ) -> Self {
        Self {
            repos,
            assigner,
            publisher,
            clock,
            policy,
        }
    }

    /// Cancel every PENDING reservation whose confirmation deadline
    /// passed. Returns how many rows were transitioned.
    pub async fn expire_pending_pass(&self) -> DomainResult<usize> {
        let now = self.clock.now();
        let expired = self.repos.reservations().find_expired_pending(now).await?;
        if expired.is_empty() {
            return Ok(0);
        }
        info!(count = expired.len(), "Expiring overdue pending reservations");

        let mut transitioned = 0;
        for mut reservation in expired {
            // act only on rows still in the qualifying state
            if reservation.status != ReservationStatus::Pending
                || reservation.confirmation_deadline >= now
            {
                continue;
            }

            let previous_status = reservation.status;
            reservation.cancel(DEADLINE_EXPIRED_REASON, now);
            reservation.record(
                HistoryAction::Cancelled,
                DEADLINE_EXPIRED_REASON,
                SYSTEM_ACTOR,
                now,
            );
            let released = self.assigner.release(&mut reservation);

            let saved = match self.repos.reservations().save(reservation).await {
                Ok(saved) => saved,
                Err(DomainError::Conflict(_)) => {
                    // interactive confirm/cancel committed first
                    if let Some(t) = &released {
                        self.assigner.revert(t);
                    }
                    debug!("Skipping expiry, reservation changed concurrently");
                    continue;
                }
                Err(e) => {
                    if let Some(t) = &released {
                        self.assigner.revert(t);
                    }
                    warn!(error = %e, "Failed to expire reservation");
                    continue;
                }
            };

            if let Some(t) = &released {
                self.assigner
                    .announce_release(&saved.restaurant_id, t, &saved.id)
                    .await;
            }
            let slot = SlotKey::for_reservation(&saved.restaurant_id, saved.reservation_time);
            release_quota_with_retry(&self.repos, &slot, saved.party_size).await;

            let event = ReservationCancelledEvent {
                reservation_id: saved.id.clone(),
                restaurant_id: saved.restaurant_id.clone(),
                user_id: saved.user_id.clone(),
                previous_status: previous_status.as_str().to_string(),
                reason: DEADLINE_EXPIRED_REASON.to_string(),
            };
            if let Err(e) = self
                .publisher
                .publish(OutboundEvent::ReservationCancelled(event))
                .await
            {
                warn!(reservation_id = saved.id.as_str(), error = %e, "Expiry cancel publish failed");
            }
            metrics::counter!("reservations_expired_total").increment(1);
            transitioned += 1;
        }
        Ok(transitioned)
    }

    /// Close every CONFIRMED reservation whose window ended more than
    /// an hour ago, per the completion policy.
    pub async fn complete_past_pass(&self) -> DomainResult<usize> {
        let now = self.clock.now();
        let cutoff = now - ChronoDuration::hours(COMPLETION_GRACE_HOURS);
        let overdue = self.repos.reservations().find_uncompleted_past(cutoff).await?;
        if overdue.is_empty() {
            return Ok(0);
        }
        info!(count = overdue.len(), policy = ?self.policy, "Closing past confirmed reservations");

        let mut transitioned = 0;
        for mut reservation in overdue {
            if reservation.status != ReservationStatus::Confirmed
                || reservation.end_time() >= cutoff
            {
                continue;
            }

            match self.policy {
                CompletionPolicy::Complete => {
                    reservation.complete(now);
                    reservation.record(
                        HistoryAction::Completed,
                        "Reservation completed",
                        SYSTEM_ACTOR,
                        now,
                    );
                }
                CompletionPolicy::NoShow => {
                    reservation.mark_no_show(now);
                    reservation.record(
                        HistoryAction::NoShow,
                        "Customer did not show up",
                        SYSTEM_ACTOR,
                        now,
                    );
                }
            }
            let released = self.assigner.release(&mut reservation);

            let saved = match self.repos.reservations().save(reservation).await {
                Ok(saved) => saved,
                Err(DomainError::Conflict(_)) => {
                    if let Some(t) = &released {
                        self.assigner.revert(t);
                    }
                    continue;
                }
                Err(e) => {
                    if let Some(t) = &released {
                        self.assigner.revert(t);
                    }
                    warn!(error = %e, "Failed to close past reservation");
                    continue;
                }
            };

            if let Some(t) = &released {
                self.assigner
                    .announce_release(&saved.restaurant_id, t, &saved.id)
                    .await;
            }
            metrics::counter!("reservations_completed_total").increment(1);
            transitioned += 1;
        }
        Ok(transitioned)
    }

    /// Drop terminal aggregates older than the retention window.
    pub async fn cleanup_pass(&self, age_days: i64) -> DomainResult<u64> {
        let cutoff = self.clock.now() - ChronoDuration::days(age_days);
        let removed = self
            .repos
            .reservations()
            .delete_terminal_older_than(cutoff)
            .await?;
        if removed > 0 {
            info!(removed, age_days, "Cleaned up old terminal reservations");
        }
        Ok(removed)
    }
}

/// Start the reconciler loops. Each loop runs until `shutdown`
/// triggers; pass errors are logged and the loop keeps going.
pub fn start_reconciler_tasks(
    reconciler: Arc<ExpirationReconciler>,
    brokers: SharedCorrelationBrokers,
    schedule: ReconcilerSchedule,
    shutdown: ShutdownSignal,
) {
    {
        let reconciler = reconciler.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            info!(
                interval_ms = schedule.expired_reservations_interval.as_millis() as u64,
                "Expired-reservations task started"
            );
            let mut interval = tokio::time::interval(schedule.expired_reservations_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = reconciler.expire_pending_pass().await {
                            warn!(error = %e, "Expire-pending pass error");
                        }
                        if let Err(e) = reconciler.complete_past_pass().await {
                            warn!(error = %e, "Complete-past pass error");
                        }
                        let swept = brokers.sweep_all();
                        if swept > 0 {
                            debug!(swept, "Swept abandoned correlation slots");
                        }
                    }
                    _ = shutdown.wait() => {
                        info!("Expired-reservations task shutting down");
                        break;
                    }
                }
            }
        });
    }

    tokio::spawn(async move {
        info!(
            interval_ms = schedule.data_cleanup_interval.as_millis() as u64,
            initial_delay_ms = schedule.data_cleanup_initial_delay.as_millis() as u64,
            "Data-cleanup task started"
        );
        tokio::select! {
            _ = tokio::time::sleep(schedule.data_cleanup_initial_delay) => {}
            _ = shutdown.wait() => return,
        }
        let mut interval = tokio::time::interval(schedule.data_cleanup_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = reconciler.cleanup_pass(schedule.data_cleanup_age_days).await {
                        warn!(error = %e, "Data-cleanup pass error");
                    }
                }
                _ = shutdown.wait() => {
                    info!("Data-cleanup task shutting down");
                    break;
                }
            }
        }
    });
}

// ── Tests ──────────────────────────────────────────────────────
