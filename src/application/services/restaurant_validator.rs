//! Restaurant validator — remote facts behind bounded request/response
//!
//! Existence/activity, operating hours, ownership, and search all live
//! in the restaurant service, reachable only via the bus. Each call
//! registers a fresh correlation id, publishes the request (keyed by
//! that id), and waits on the matching broker with a bounded timeout.

use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::application::correlation::{CorrelationError, SharedCorrelationBrokers};
use crate::application::dto::RestaurantSearchCriteria;
use crate::domain::{DomainError, DomainResult};
use crate::messaging::messages::{
    ReservationTimeValidationRequest, RestaurantOwnershipRequest, RestaurantSearchRequest,
    RestaurantSummary, RestaurantValidationRequest,
};
use crate::messaging::{OutboundEvent, SharedEventPublisher};

/// Substring the restaurant service uses to flag an out-of-hours time.
const OUTSIDE_HOURS_MARKER: &str = "outside operating hours";

pub struct RestaurantValidator {
    brokers: SharedCorrelationBrokers,
    publisher: SharedEventPublisher,
    /// Upper bound on each validation round-trip.
    validation_timeout: Duration,
}

impl RestaurantValidator {
    pub fn new(
        brokers: SharedCorrelationBrokers,
        publisher: SharedEventPublisher,
        validation_timeout: Duration,
    ) -> Self {
        Self {
            brokers,
            publisher,
            validation_timeout,
        }
    }

    fn new_correlation_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Fail unless the restaurant exists and is active.
    ///
    /// A missing restaurant is `NotFound`; inactive or unverifiable
    /// (timeout) surfaces as `Validation` with a retry-friendly message.
    pub async fn ensure_exists_and_active(&self, restaurant_id: &str) -> DomainResult<()> {
        let correlation_id = Self::new_correlation_id();
        let pending = self
            .brokers
            .restaurant_validation
            .register(&correlation_id)
            .map_err(|e| DomainError::Transient(e.to_string()))?;

        let request = RestaurantValidationRequest {
            restaurant_id: restaurant_id.to_string(),
            correlation_id: correlation_id.clone(),
        };
        if let Err(e) = self
            .publisher
            .publish(OutboundEvent::RestaurantValidation(request))
            .await
        {
            self.brokers
                .restaurant_validation
                .cancel(&correlation_id, "publish failed");
            return Err(DomainError::Transient(e.to_string()));
        }

        match self
            .brokers
            .restaurant_validation
            .wait(pending, self.validation_timeout)
            .await
        {
            Ok(response) if !response.exists => Err(DomainError::NotFound {
                entity: "Restaurant",
                field: "id",
                value: restaurant_id.to_string(),
            }),
            Ok(response) if !response.active => Err(DomainError::field(
                "restaurantId",
                "restaurant is not active",
            )),
            Ok(_) => Ok(()),
            Err(CorrelationError::Timeout) => {
                warn!(restaurant_id, "Restaurant validation timed out");
                Err(DomainError::field(
                    "restaurantId",
                    "restaurant could not be verified, please try again",
                ))
            }
            Err(e) => Err(DomainError::Transient(e.to_string())),
        }
    }

    /// Fail unless `reservation_time` falls inside the restaurant's
    /// operating hours, as judged remotely.
    pub async fn ensure_within_operating_hours(
        &self,
        restaurant_id: &str,
        reservation_time: chrono::DateTime<chrono::Utc>,
    ) -> DomainResult<()> {
        let correlation_id = Self::new_correlation_id();
        let pending = self
            .brokers
            .time_validation
            .register(&correlation_id)
            .map_err(|e| DomainError::Transient(e.to_string()))?;

        let request = ReservationTimeValidationRequest {
            restaurant_id: restaurant_id.to_string(),
            correlation_id: correlation_id.clone(),
            reservation_time,
        };
        if let Err(e) = self
            .publisher
            .publish(OutboundEvent::TimeValidation(request))
            .await
        {
            self.brokers
                .time_validation
                .cancel(&correlation_id, "publish failed");
            return Err(DomainError::Transient(e.to_string()));
        }

        match self
            .brokers
            .time_validation
            .wait(pending, self.validation_timeout)
            .await
        {
            Ok(response) => match response.error_message {
                Some(message) if message.contains(OUTSIDE_HOURS_MARKER) => {
                    Err(DomainError::field("reservationTime", message))
                }
                Some(message) if !message.is_empty() => {
                    Err(DomainError::field("reservationTime", message))
                }
                _ => Ok(()),
            },
            Err(CorrelationError::Timeout) => {
                warn!(restaurant_id, "Operating-hours validation timed out");
                Err(DomainError::field(
                    "reservationTime",
                    "operating hours could not be verified, please try again",
                ))
            }
            Err(e) => Err(DomainError::Transient(e.to_string())),
        }
    }

    /// Whether `user_id` administrates `restaurant_id`.
    ///
    /// Fail-closed: any timeout or error answers `false`, so an
    /// unavailable ownership oracle can never authorize a cancel.
    pub async fn is_owner(&self, restaurant_id: &str, user_id: &str) -> bool {
        let correlation_id = Self::new_correlation_id();
        let pending = match self.brokers.ownership.register(&correlation_id) {
            Ok(pending) => pending,
            Err(e) => {
                warn!(restaurant_id, user_id, error = %e, "Ownership check could not register");
                return false;
            }
        };

        let request = RestaurantOwnershipRequest {
            restaurant_id: restaurant_id.to_string(),
            user_id: user_id.to_string(),
            correlation_id: correlation_id.clone(),
        };
        if let Err(e) = self
            .publisher
            .publish(OutboundEvent::RestaurantOwnership(request))
            .await
        {
            self.brokers
                .ownership
                .cancel(&correlation_id, "publish failed");
            warn!(restaurant_id, user_id, error = %e, "Ownership request publish failed");
            return false;
        }

        match self
            .brokers
            .ownership
            .wait(pending, self.validation_timeout)
            .await
        {
            Ok(response) => {
                if let Some(message) = response.error_message.filter(|m| !m.is_empty()) {
                    warn!(restaurant_id, user_id, message, "Ownership check errored");
                    return false;
                }
                response.is_owner
            }
            Err(e) => {
                warn!(restaurant_id, user_id, error = %e, "Ownership check failed closed");
                false
            }
        }
    }

    /// Forward a search to the restaurant service and wait for the
    /// matching result set.
    pub async fn search(
        &self,
        criteria: RestaurantSearchCriteria,
    ) -> DomainResult<Vec<RestaurantSummary>> {
        let correlation_id = Self::new_correlation_id();
        let pending = self
            .brokers
            .search
            .register(&correlation_id)
            .map_err(|e| DomainError::Transient(e.to_string()))?;

        let request = RestaurantSearchRequest {
            date: criteria.date,
            time: criteria.time,
            party_size: criteria.party_size,
            cuisine: criteria.cuisine,
            city: criteria.city,
            latitude: criteria.latitude,
            longitude: criteria.longitude,
            distance: criteria.distance,
            restaurant_id: criteria.restaurant_id,
            correlation_id: correlation_id.clone(),
        };
        if let Err(e) = self
            .publisher
            .publish(OutboundEvent::RestaurantSearch(request))
            .await
        {
            self.brokers.search.cancel(&correlation_id, "publish failed");
            return Err(DomainError::Transient(e.to_string()));
        }

        match self
            .brokers
            .search
            .wait(pending, self.validation_timeout)
            .await
        {
            Ok(response) if response.success => {
                info!(results = response.restaurants.len(), "Restaurant search answered");
                Ok(response.restaurants)
            }
            Ok(response) => Err(DomainError::Transient(
                response
                    .error_message
                    .unwrap_or_else(|| "restaurant search failed".to_string()),
            )),
            Err(CorrelationError::Timeout) => Err(DomainError::Timeout(
                "restaurant search did not answer in time".to_string(),
            )),
            Err(e) => Err(DomainError::Transient(e.to_string())),
        }
    }
}
