//! Application services

mod expiry;
mod menu_projection;
mod reservation_service;
mod restaurant_validator;
mod table_assigner;

pub use expiry::{
    start_reconciler_tasks, CompletionPolicy, ExpirationReconciler, ReconcilerSchedule,
};
pub use menu_projection::MenuProjection;
pub use reservation_service::{ReservationRules, ReservationService};
pub use restaurant_validator::RestaurantValidator;
pub use table_assigner::{TableAssigner, TableTransition};

use std::sync::Arc;

use tracing::error;

use crate::domain::{RepositoryProvider, SlotKey};
use crate::shared::retry::{retry_with_backoff, RetryConfig};

/// Record operation latency and throughput to Prometheus.
fn record_operation_latency(operation: &'static str, start: std::time::Instant) {
    let duration = start.elapsed().as_secs_f64();
    metrics::histogram!("reservation_operation_seconds", "operation" => operation)
        .record(duration);
    metrics::counter!("reservation_operations_total", "operation" => operation).increment(1);
}

/// Give a claimed slot back, retrying transient failures. Quota drift
/// corrupts availability decisions, so this logs at error level when
/// it ultimately fails instead of propagating.
pub(crate) async fn release_quota_with_retry(
    repos: &Arc<dyn RepositoryProvider>,
    key: &SlotKey,
    party_size: i32,
) {
    let result = retry_with_backoff(
        RetryConfig::default(),
        || repos.quotas().release(key, party_size),
        |e| e.is_transient(),
        "quota_release",
    )
    .await;
    if let Err(e) = result {
        error!(
            restaurant_id = key.restaurant_id.as_str(),
            slot = key.descriptor().as_str(),
            party_size,
            error = %e,
            "Quota release failed; counters for this slot may drift"
        );
        metrics::counter!("quota_release_failures_total").increment(1);
    }
}
