//! Inbound consumer loops.
//!
//! One loop per message kind, each with its own consumer group id, so
//! a stalled kind never blocks the others. A payload that fails to
//! deserialize is logged and skipped; the subscription always keeps
//! going.

use std::sync::Arc;

use rdkafka::message::Message;
use tracing::{debug, info, warn};

use super::kafka::{create_consumer, subscribe, KafkaSettings};
use super::messages::{
    FindAvailableTableResponse, MenuItemMessage, RestaurantOwnershipResponse,
    RestaurantSearchResponse, RestaurantValidationResponse, TableStatusMessage,
};
use super::topics::{self, groups};
use crate::application::correlation::SharedCorrelationBrokers;
use crate::application::MenuProjection;
use crate::cache::SharedTableStatusCache;
use crate::domain::InfraError;
use crate::shared::ShutdownSignal;

/// Which inbound subscription a loop serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsumerKind {
    TableFind,
    RestaurantValidation,
    TimeValidation,
    Ownership,
    Search,
    TableStatus,
    MenuItem,
    User,
}

impl ConsumerKind {
    const ALL: [ConsumerKind; 8] = [
        ConsumerKind::TableFind,
        ConsumerKind::RestaurantValidation,
        ConsumerKind::TimeValidation,
        ConsumerKind::Ownership,
        ConsumerKind::Search,
        ConsumerKind::TableStatus,
        ConsumerKind::MenuItem,
        ConsumerKind::User,
    ];

    fn topic(&self) -> &'static str {
        match self {
            Self::TableFind => topics::TABLE_FIND_RESPONSE,
            // both validation kinds answer on the same topic with
            // disjoint correlation-id spaces
            Self::RestaurantValidation | Self::TimeValidation => {
                topics::RESTAURANT_VALIDATION_RESPONSE
            }
            Self::Ownership => topics::RESTAURANT_OWNERSHIP_RESPONSE,
            Self::Search => topics::RESTAURANT_SEARCH_RESPONSE,
            Self::TableStatus => topics::TABLE_STATUS,
            Self::MenuItem => topics::MENU_ITEM_EVENTS,
            Self::User => topics::USER_EVENTS,
        }
    }

    fn group_suffix(&self) -> &'static str {
        match self {
            Self::TableFind => groups::TABLE_AVAILABILITY,
            Self::RestaurantValidation => groups::RESTAURANT_VALIDATION,
            Self::TimeValidation => groups::TIME_VALIDATION,
            Self::Ownership => groups::RESTAURANT_OWNERSHIP,
            Self::Search => groups::RESTAURANT_SEARCH,
            Self::TableStatus => groups::TABLE_STATUS,
            Self::MenuItem => groups::MENU_ITEM,
            Self::User => groups::USER,
        }
    }
}

/// Routes inbound payloads to the brokers, the status cache, and the
/// menu projection.
pub struct InboundRouter {
    pub brokers: SharedCorrelationBrokers,
    pub table_statuses: SharedTableStatusCache,
    pub menu_projection: Arc<MenuProjection>,
}

impl InboundRouter {
    async fn dispatch(&self, kind: ConsumerKind, payload: &[u8]) {
        match kind {
            ConsumerKind::TableFind => self.handle_table_find(payload),
            ConsumerKind::RestaurantValidation => self.handle_restaurant_validation(payload),
            ConsumerKind::TimeValidation => self.handle_time_validation(payload),
            ConsumerKind::Ownership => self.handle_ownership(payload),
            ConsumerKind::Search => self.handle_search(payload),
            ConsumerKind::TableStatus => self.handle_table_status(payload),
            ConsumerKind::MenuItem => self.handle_menu_item(payload).await,
            ConsumerKind::User => self.handle_user_event(payload),
        }
    }

    pub fn handle_table_find(&self, payload: &[u8]) {
        match serde_json::from_slice::<FindAvailableTableResponse>(payload) {
            Ok(response) => {
                self.brokers
                    .table_find
                    .deliver(&response.correlation_id.clone(), response);
            }
            Err(e) => warn!(error = %e, "Skipping malformed table.find.response"),
        }
    }

    pub fn handle_restaurant_validation(&self, payload: &[u8]) {
        match serde_json::from_slice::<RestaurantValidationResponse>(payload) {
            Ok(response) => {
                self.brokers
                    .restaurant_validation
                    .deliver(&response.correlation_id.clone(), response);
            }
            Err(e) => warn!(error = %e, "Skipping malformed restaurant.validation.response"),
        }
    }

    pub fn handle_time_validation(&self, payload: &[u8]) {
        match serde_json::from_slice::<RestaurantValidationResponse>(payload) {
            Ok(response) => {
                self.brokers
                    .time_validation
                    .deliver(&response.correlation_id.clone(), response);
            }
            Err(e) => warn!(error = %e, "Skipping malformed time-validation response"),
        }
    }

    pub fn handle_ownership(&self, payload: &[u8]) {
        match serde_json::from_slice::<RestaurantOwnershipResponse>(payload) {
            Ok(response) => {
                self.brokers
                    .ownership
                    .deliver(&response.correlation_id.clone(), response);
            }
            Err(e) => warn!(error = %e, "Skipping malformed restaurant.ownership.response"),
        }
    }

    pub fn handle_search(&self, payload: &[u8]) {
        match serde_json::from_slice::<RestaurantSearchResponse>(payload) {
            Ok(response) => {
                self.brokers
                    .search
                    .deliver(&response.correlation_id.clone(), response);
            }
            Err(e) => warn!(error = %e, "Skipping malformed restaurant.search.response"),
        }
    }

    pub fn handle_table_status(&self, payload: &[u8]) {
        match serde_json::from_slice::<TableStatusMessage>(payload) {
            Ok(TableStatusMessage::TableStatusChanged {
                table_id,
                new_status,
                ..
            }) => {
                self.table_statuses.put(&table_id, new_status);
            }
            Ok(TableStatusMessage::TableStatus { table_id, status }) => {
                self.table_statuses.put(&table_id, status);
            }
            // our own assignment notifications carry no status
            Ok(TableStatusMessage::TableAssigned { .. }) => {}
            Err(e) => warn!(error = %e, "Skipping malformed table.status message"),
        }
    }

    pub async fn handle_menu_item(&self, payload: &[u8]) {
        match serde_json::from_slice::<MenuItemMessage>(payload) {
            Ok(message) => {
                if let Err(e) = self.menu_projection.apply(message).await {
                    warn!(error = %e, "Menu projection update failed");
                }
            }
            Err(e) => warn!(error = %e, "Skipping malformed menu.item event"),
        }
    }

    /// user.* events are audit-only; nothing here may block or fail
    /// the subscription.
    pub fn handle_user_event(&self, payload: &[u8]) {
        match serde_json::from_slice::<serde_json::Value>(payload) {
            Ok(value) => {
                let event_type = value
                    .get("type")
                    .and_then(|t| t.as_str())
                    .unwrap_or("unknown");
                debug!(event_type, "User event observed");
            }
            Err(e) => warn!(error = %e, "Skipping malformed user event"),
        }
    }
}

/// Spawn one consumer loop per inbound kind. Fails fast when a
/// consumer cannot be created (bad broker config); individual message
/// errors never stop a loop.
pub fn spawn_consumers(
    settings: &KafkaSettings,
    router: Arc<InboundRouter>,
    shutdown: ShutdownSignal,
) -> Result<(), InfraError> {
    for kind in ConsumerKind::ALL {
        let consumer = create_consumer(settings, kind.group_suffix())?;
        subscribe(&consumer, kind.topic())?;
        let router = router.clone();
        let shutdown = shutdown.clone();

        tokio::spawn(async move {
            info!(topic = kind.topic(), group = kind.group_suffix(), "Consumer loop started");
            loop {
                tokio::select! {
                    _ = shutdown.wait() => {
                        info!(topic = kind.topic(), "Consumer loop shutting down");
                        break;
                    }
                    received = consumer.recv() => {
                        match received {
                            Ok(message) => {
                                let Some(payload) = message.payload() else {
                                    debug!(topic = kind.topic(), "Skipping empty payload");
                                    continue;
                                };
                                metrics::counter!(
                                    "bus_messages_consumed_total",
                                    "topic" => kind.topic()
                                )
                                .increment(1);
                                router.dispatch(kind, payload).await;
                            }
                            Err(e) => {
                                warn!(topic = kind.topic(), error = %e, "Consumer receive error");
                            }
                        }
                    }
                }
            }
        });
    }
    Ok(())
}
