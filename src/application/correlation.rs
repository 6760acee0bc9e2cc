//! Correlation broker — bridges fire-and-forget bus exchanges into
//! bounded request/response calls.
//!
//! ## Architecture
//!
//! ```text
//! Caller ──► register(correlation_id) ─► PendingResponse
//!        ──► publish request on the bus (keyed by correlation_id)
//!        ──► wait(pending, timeout) ◄─── deliver() from a consumer loop
//! ```
//!
//! One broker instance per response kind: a flood of table-find
//! responses can never starve ownership waiters, and each kind keeps
//! its own `DashMap<correlation_id, waiter>`. Waiters are single-shot
//! (`oneshot`), so `deliver` never blocks on consumption, and a
//! delivery for an unknown or already-completed id is logged and
//! discarded as late/duplicate.

use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, warn};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CorrelationError {
    #[error("Correlation id already in flight: {0}")]
    AlreadyRegistered(String),

    #[error("Response timeout")]
    Timeout,

    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// The waiter slot vanished (broker dropped mid-wait).
    #[error("Response channel closed")]
    ChannelClosed,
}

/// A registered waiter, consumed exactly once by [`CorrelationBroker::wait`].
#[derive(Debug)]
pub struct PendingResponse<T> {
    correlation_id: String,
    receiver: oneshot::Receiver<Result<T, CorrelationError>>,
}

impl<T> PendingResponse<T> {
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Tracks in-flight correlation ids for one response kind.
pub struct CorrelationBroker<T> {
    kind: &'static str,
    pending: DashMap<String, oneshot::Sender<Result<T, CorrelationError>>>,
}

impl<T: Send + 'static> CorrelationBroker<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            pending: DashMap::new(),
        }
    }

    /// Create a pending slot keyed by a caller-generated unique id.
    ///
    /// Fails when the id is already in flight; correlation ids are
    /// never reused within a kind.
    pub fn register(&self, correlation_id: &str) -> Result<PendingResponse<T>, CorrelationError> {
        if self.pending.contains_key(correlation_id) {
            return Err(CorrelationError::AlreadyRegistered(
                correlation_id.to_string(),
            ));
        }
        let (tx, rx) = oneshot::channel();
        if self
            .pending
            .insert(correlation_id.to_string(), tx)
            .is_some()
        {
            // Lost a register/register race on the same id.
            return Err(CorrelationError::AlreadyRegistered(
                correlation_id.to_string(),
            ));
        }
        Ok(PendingResponse {
            correlation_id: correlation_id.to_string(),
            receiver: rx,
        })
    }

    /// Block until delivery, timeout, or cancel. The slot is always
    /// cleaned up before returning, so a late response after a timeout
    /// finds nothing and is discarded by [`deliver`](Self::deliver).
    pub async fn wait(
        &self,
        pending: PendingResponse<T>,
        timeout: Duration,
    ) -> Result<T, CorrelationError> {
        let PendingResponse {
            correlation_id,
            receiver,
        } = pending;

        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => {
                self.pending.remove(&correlation_id);
                Err(CorrelationError::ChannelClosed)
            }
            Err(_) => {
                self.pending.remove(&correlation_id);
                warn!(
                    kind = self.kind,
                    correlation_id = correlation_id.as_str(),
                    timeout_ms = timeout.as_millis() as u64,
                    "Correlated request timed out"
                );
                metrics::counter!("correlation_timeouts_total", "kind" => self.kind).increment(1);
                Err(CorrelationError::Timeout)
            }
        }
    }

    /// Complete the waiter for `correlation_id` exactly once.
    /// Returns whether a waiter was found.
    pub fn deliver(&self, correlation_id: &str, response: T) -> bool {
        match self.pending.remove(correlation_id) {
            Some((_, waiter)) => {
                debug!(
                    kind = self.kind,
                    correlation_id, "Delivering correlated response"
                );
                metrics::counter!("correlation_deliveries_total", "kind" => self.kind)
                    .increment(1);
                // The waiter may have just timed out and dropped its
                // receiver; that is the same late-response case.
                waiter.send(Ok(response)).is_ok()
            }
            None => {
                warn!(
                    kind = self.kind,
                    correlation_id, "Response for unknown correlation id (late or duplicate)"
                );
                false
            }
        }
    }

    /// Complete the waiter with `Cancelled`. Idempotent.
    pub fn cancel(&self, correlation_id: &str, reason: &str) {
        if let Some((_, waiter)) = self.pending.remove(correlation_id) {
            let _ = waiter.send(Err(CorrelationError::Cancelled(reason.to_string())));
        }
    }

    /// Drop slots whose waiter already went away (memory hygiene).
    /// Safe under concurrent delivery: a removed slot just makes a
    /// late `deliver` take the unknown-id path.
    pub fn sweep(&self) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, waiter| !waiter.is_closed());
        before - self.pending.len()
    }

    /// Number of in-flight correlation ids.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }
}

// ── Per-kind broker bundle ─────────────────────────────────────

use std::sync::Arc;

use crate::messaging::messages::{
    FindAvailableTableResponse, RestaurantOwnershipResponse, RestaurantSearchResponse,
    RestaurantValidationResponse,
};

/// The process-wide broker set, one instance per response kind.
///
/// Existence/active checks and operating-hours checks both answer with
/// [`RestaurantValidationResponse`], but each keeps its own map: their
/// consumer groups are independent and a delivery for the other kind's
/// correlation id must land in the unknown-id path.
pub struct CorrelationBrokers {
    pub restaurant_validation: CorrelationBroker<RestaurantValidationResponse>,
    pub time_validation: CorrelationBroker<RestaurantValidationResponse>,
    pub ownership: CorrelationBroker<RestaurantOwnershipResponse>,
    pub table_find: CorrelationBroker<FindAvailableTableResponse>,
    pub search: CorrelationBroker<RestaurantSearchResponse>,
}

/// Shared, reference-counted broker bundle.
pub type SharedCorrelationBrokers = Arc<CorrelationBrokers>;

impl CorrelationBrokers {
    pub fn new() -> Self {
        Self {
            restaurant_validation: CorrelationBroker::new("restaurant-validation"),
            time_validation: CorrelationBroker::new("time-validation"),
            ownership: CorrelationBroker::new("ownership"),
            table_find: CorrelationBroker::new("table-find"),
            search: CorrelationBroker::new("search"),
        }
    }

    /// Wrap in `Arc` for shared ownership.
    pub fn shared() -> SharedCorrelationBrokers {
        Arc::new(Self::new())
    }

    /// Sweep every kind; returns the total number of slots removed.
    pub fn sweep_all(&self) -> usize {
        self.restaurant_validation.sweep()
            + self.time_validation.sweep()
            + self.ownership.sweep()
            + self.table_find.sweep()
            + self.search.sweep()
    }
}

impl Default for CorrelationBrokers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deliver_completes_waiter() {
        let broker = Arc::new(CorrelationBroker::<u32>::new("test"));
        let pending = broker.register("c1").unwrap();

        let delivering = broker.clone();
        tokio::spawn(async move {
            assert!(delivering.deliver("c1", 7));
        });

        let value = broker.wait(pending, Duration::from_secs(1)).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(broker.in_flight(), 0);
    }

    #[tokio::test]
    async fn duplicate_register_fails() {
        let broker = CorrelationBroker::<u32>::new("test");
        let _pending = broker.register("c1").unwrap();
        assert_eq!(
            broker.register("c1").unwrap_err(),
            CorrelationError::AlreadyRegistered("c1".to_string())
        );
    }

    #[tokio::test]
    async fn deliver_unknown_id_is_discarded() {
        let broker = CorrelationBroker::<u32>::new("test");
        // must not panic, must report no waiter
        assert!(!broker.deliver("ghost", 1));
    }

    #[tokio::test]
    async fn wait_times_out_and_cleans_slot() {
        let broker = CorrelationBroker::<u32>::new("test");
        let pending = broker.register("c1").unwrap();

        let started = tokio::time::Instant::now();
        let err = broker
            .wait(pending, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert_eq!(err, CorrelationError::Timeout);
        // bounded scheduling slack, not unbounded blocking
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(broker.in_flight(), 0);

        // the late response is now a no-op
        assert!(!broker.deliver("c1", 9));
    }

    #[tokio::test]
    async fn wait_after_cancel_returns_cancelled() {
        let broker = CorrelationBroker::<u32>::new("test");
        let pending = broker.register("c1").unwrap();
        broker.cancel("c1", "publish failed");
        broker.cancel("c1", "again"); // idempotent

        let err = broker
            .wait(pending, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CorrelationError::Cancelled("publish failed".to_string())
        );
    }

    #[tokio::test]
    async fn sweep_removes_abandoned_slots() {
        let broker = CorrelationBroker::<u32>::new("test");
        {
            let _dropped = broker.register("gone").unwrap();
            // receiver dropped at end of scope
        }
        let kept = broker.register("alive").unwrap();
        assert_eq!(broker.in_flight(), 2);
        assert_eq!(broker.sweep(), 1);
        assert_eq!(broker.in_flight(), 1);

        broker.deliver("alive", 3);
        assert_eq!(broker.wait(kept, Duration::from_secs(1)).await, Ok(3));
    }

    #[tokio::test]
    async fn concurrent_deliveries_complete_each_waiter_once() {
        let broker = Arc::new(CorrelationBroker::<usize>::new("test"));
        let mut waits = Vec::new();
        for i in 0..32 {
            let pending = broker.register(&format!("c{}", i)).unwrap();
            let b = broker.clone();
            waits.push(tokio::spawn(async move {
                b.wait(pending, Duration::from_secs(1)).await
            }));
        }
        for i in 0..32 {
            let b = broker.clone();
            tokio::spawn(async move {
                b.deliver(&format!("c{}", i), i);
            });
        }
        for (i, handle) in waits.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), Ok(i));
        }
        assert_eq!(broker.in_flight(), 0);
    }
}
