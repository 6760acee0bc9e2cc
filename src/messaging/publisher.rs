//! Outbound publishing port
//!
//! The coordinator and its helpers publish through this trait; the
//! Kafka implementation lives in [`super::kafka`], and tests substitute
//! a recording double.

use std::sync::Arc;

use async_trait::async_trait;

use super::messages::{
    FindAvailableTableRequest, ReservationCancelledEvent, ReservationConfirmedEvent,
    ReservationCreatedEvent, ReservationTimeValidationRequest, ReservationUpdatedEvent,
    RestaurantOwnershipRequest, RestaurantSearchRequest, RestaurantValidationRequest,
    TableStatusMessage,
};
use super::topics;
use crate::domain::InfraError;

/// Everything the core ever sends to the bus.
#[derive(Debug, Clone)]
pub enum OutboundEvent {
    ReservationCreated(ReservationCreatedEvent),
    ReservationUpdated(ReservationUpdatedEvent),
    ReservationCancelled(ReservationCancelledEvent),
    ReservationConfirmed(ReservationConfirmedEvent),
    TableStatus(TableStatusMessage),
    FindTable(FindAvailableTableRequest),
    RestaurantValidation(RestaurantValidationRequest),
    TimeValidation(ReservationTimeValidationRequest),
    RestaurantSearch(RestaurantSearchRequest),
    RestaurantOwnership(RestaurantOwnershipRequest),
}

impl OutboundEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            Self::ReservationCreated(_) => topics::RESERVATION_CREATE,
            Self::ReservationUpdated(_) => topics::RESERVATION_UPDATE,
            Self::ReservationCancelled(_) => topics::RESERVATION_CANCEL,
            Self::ReservationConfirmed(_) => topics::RESERVATION_EVENTS,
            Self::TableStatus(_) => topics::TABLE_STATUS,
            Self::FindTable(_) => topics::TABLE_FIND_REQUEST,
            Self::RestaurantValidation(_) => topics::RESTAURANT_VALIDATION_REQUEST,
            Self::TimeValidation(_) => topics::RESTAURANT_TIME_VALIDATION_REQUEST,
            Self::RestaurantSearch(_) => topics::RESTAURANT_SEARCH_REQUEST,
            Self::RestaurantOwnership(_) => topics::RESTAURANT_OWNERSHIP_REQUEST,
        }
    }

    /// Logical event name carried in the `type` header.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ReservationCreated(_) => "ReservationCreated",
            Self::ReservationUpdated(_) => "ReservationModified",
            Self::ReservationCancelled(_) => "ReservationCancelled",
            Self::ReservationConfirmed(_) => "ReservationConfirmed",
            Self::TableStatus(msg) => msg.type_name(),
            Self::FindTable(_) => "FindAvailableTableRequest",
            Self::RestaurantValidation(_) => "RestaurantValidationRequest",
            Self::TimeValidation(_) => "ReservationTimeValidationRequest",
            Self::RestaurantSearch(_) => "RestaurantSearchRequest",
            Self::RestaurantOwnership(_) => "RestaurantOwnershipRequest",
        }
    }

    /// Message key: correlation id for request/response exchanges
    /// (response routing and partitioning stay symmetric), reservation
    /// or table id for lifecycle events.
    pub fn key(&self) -> &str {
        match self {
            Self::ReservationCreated(e) => &e.reservation_id,
            Self::ReservationUpdated(e) => &e.reservation_id,
            Self::ReservationCancelled(e) => &e.reservation_id,
            Self::ReservationConfirmed(e) => &e.reservation_id,
            Self::TableStatus(msg) => msg.key(),
            Self::FindTable(req) => &req.correlation_id,
            Self::RestaurantValidation(req) => &req.correlation_id,
            Self::TimeValidation(req) => &req.correlation_id,
            Self::RestaurantSearch(req) => &req.correlation_id,
            Self::RestaurantOwnership(req) => &req.correlation_id,
        }
    }

    pub fn payload_json(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::ReservationCreated(e) => serde_json::to_string(e),
            Self::ReservationUpdated(e) => serde_json::to_string(e),
            Self::ReservationCancelled(e) => serde_json::to_string(e),
            Self::ReservationConfirmed(e) => serde_json::to_string(e),
            Self::TableStatus(msg) => serde_json::to_string(msg),
            Self::FindTable(req) => serde_json::to_string(req),
            Self::RestaurantValidation(req) => serde_json::to_string(req),
            Self::TimeValidation(req) => serde_json::to_string(req),
            Self::RestaurantSearch(req) => serde_json::to_string(req),
            Self::RestaurantOwnership(req) => serde_json::to_string(req),
        }
    }
}

/// Port for publishing core events to the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: OutboundEvent) -> Result<(), InfraError>;
}

/// Shared, reference-counted publisher.
pub type SharedEventPublisher = Arc<dyn EventPublisher>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_events_are_keyed_by_correlation_id() {
        let event = OutboundEvent::RestaurantValidation(RestaurantValidationRequest {
            restaurant_id: "R1".into(),
            correlation_id: "corr-42".into(),
        });
        assert_eq!(event.topic(), topics::RESTAURANT_VALIDATION_REQUEST);
        assert_eq!(event.key(), "corr-42");
        assert_eq!(event.type_name(), "RestaurantValidationRequest");
        assert!(event.payload_json().unwrap().contains("\"restaurantId\":\"R1\""));
    }

    #[test]
    fn lifecycle_events_are_keyed_by_reservation_id() {
        let event = OutboundEvent::ReservationCancelled(ReservationCancelledEvent {
            reservation_id: "res-9".into(),
            restaurant_id: "R1".into(),
            user_id: "U1".into(),
            previous_status: "PENDING".into(),
            reason: "test".into(),
        });
        assert_eq!(event.topic(), topics::RESERVATION_CANCEL);
        assert_eq!(event.key(), "res-9");
    }
}
