//! Test doubles for the coordinator's collaborators.
//!
//! [`ScriptedBus`] implements [`EventPublisher`], records every
//! outbound event, and plays the remote side of each request/response
//! exchange by delivering scripted answers straight into the
//! correlation brokers. Registration always precedes publishing, so a
//! synchronous delivery here lands before the caller starts waiting.

use std::sync::Mutex;

use crate::application::correlation::SharedCorrelationBrokers;
use crate::domain::InfraError;
use crate::messaging::messages::{
    FindAvailableTableResponse, RestaurantOwnershipResponse, RestaurantSearchResponse,
    RestaurantSummary, RestaurantValidationResponse,
};
use crate::messaging::{EventPublisher, OutboundEvent};

/// Canned remote behavior; the default is the all-green happy path.
#[derive(Debug, Clone)]
pub struct RemoteScript {
    pub restaurant_exists: bool,
    pub restaurant_active: bool,
    /// Leave existence/activity requests unanswered (simulates timeout).
    pub validation_silent: bool,
    /// Error message for the operating-hours answer; None = hours ok.
    pub hours_error: Option<String>,
    pub hours_silent: bool,
    pub owner: bool,
    pub ownership_silent: bool,
    /// Table id the remote finder answers with.
    pub table: Option<String>,
    pub table_success: bool,
    pub table_silent: bool,
    pub search_results: Vec<RestaurantSummary>,
    pub search_silent: bool,
    /// Make every publish fail with a bus error.
    pub fail_publish: bool,
}

impl Default for RemoteScript {
    fn default() -> Self {
        Self {
            restaurant_exists: true,
            restaurant_active: true,
            validation_silent: false,
            hours_error: None,
            hours_silent: false,
            owner: false,
            ownership_silent: false,
            table: Some("T1".to_string()),
            table_success: true,
            table_silent: false,
            search_results: Vec::new(),
            search_silent: false,
            fail_publish: false,
        }
    }
}

/// Stub REST endpoint answering with a fixed candidate list.
pub struct StubTablesApi {
    pub tables: Option<Vec<crate::infrastructure::rest::TableCandidate>>,
}

#[async_trait::async_trait]
impl crate::infrastructure::rest::AvailableTablesApi for StubTablesApi {
    async fn fetch_available(
        &self,
        _restaurant_id: &str,
    ) -> Option<Vec<crate::infrastructure::rest::TableCandidate>> {
        self.tables.clone()
    }
}

/// Recording publisher that answers correlated requests per script.
pub struct ScriptedBus {
    brokers: SharedCorrelationBrokers,
    script: Mutex<RemoteScript>,
    sent: Mutex<Vec<OutboundEvent>>,
}

impl ScriptedBus {
    pub fn new(brokers: SharedCorrelationBrokers, script: RemoteScript) -> Self {
        Self {
            brokers,
            script: Mutex::new(script),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Swap the scripted behavior mid-test.
    pub fn set_script(&self, script: RemoteScript) {
        *self.script.lock().unwrap() = script;
    }

    pub fn sent(&self) -> Vec<OutboundEvent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Events published to a given topic, in order.
    pub fn sent_to(&self, topic: &str) -> Vec<OutboundEvent> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.topic() == topic)
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl EventPublisher for ScriptedBus {
    async fn publish(&self, event: OutboundEvent) -> Result<(), InfraError> {
        let script = self.script.lock().unwrap().clone();
        if script.fail_publish {
            return Err(InfraError::Bus("scripted publish failure".to_string()));
        }
        self.sent.lock().unwrap().push(event.clone());

        match &event {
            OutboundEvent::RestaurantValidation(request) => {
                if !script.validation_silent {
                    self.brokers.restaurant_validation.deliver(
                        &request.correlation_id,
                        RestaurantValidationResponse {
                            correlation_id: request.correlation_id.clone(),
                            restaurant_id: request.restaurant_id.clone(),
                            exists: script.restaurant_exists,
                            active: script.restaurant_active,
                            error_message: None,
                        },
                    );
                }
            }
            OutboundEvent::TimeValidation(request) => {
                if !script.hours_silent {
                    self.brokers.time_validation.deliver(
                        &request.correlation_id,
                        RestaurantValidationResponse {
                            correlation_id: request.correlation_id.clone(),
                            restaurant_id: request.restaurant_id.clone(),
                            exists: true,
                            active: true,
                            error_message: script.hours_error.clone(),
                        },
                    );
                }
            }
            OutboundEvent::RestaurantOwnership(request) => {
                if !script.ownership_silent {
                    self.brokers.ownership.deliver(
                        &request.correlation_id,
                        RestaurantOwnershipResponse {
                            correlation_id: request.correlation_id.clone(),
                            restaurant_id: request.restaurant_id.clone(),
                            user_id: request.user_id.clone(),
                            is_owner: script.owner,
                            error_message: None,
                        },
                    );
                }
            }
            OutboundEvent::FindTable(request) => {
                if !script.table_silent {
                    self.brokers.table_find.deliver(
                        &request.correlation_id,
                        FindAvailableTableResponse {
                            correlation_id: request.correlation_id.clone(),
                            success: script.table_success,
                            table_id: script.table.clone(),
                            error_message: None,
                        },
                    );
                }
            }
            OutboundEvent::RestaurantSearch(request) => {
                if !script.search_silent {
                    self.brokers.search.deliver(
                        &request.correlation_id,
                        RestaurantSearchResponse {
                            correlation_id: request.correlation_id.clone(),
                            success: true,
                            restaurants: script.search_results.clone(),
                            error_message: None,
                        },
                    );
                }
            }
            // Lifecycle and table-status events are recorded only.
            _ => {}
        }
        Ok(())
    }
}
