//! Application layer - use-case orchestration and supporting services

pub mod correlation;
pub mod dto;
pub mod services;

#[cfg(test)]
pub mod testkit;

pub use correlation::{
    CorrelationBroker, CorrelationBrokers, CorrelationError, PendingResponse,
    SharedCorrelationBrokers,
};
pub use dto::{CreateReservationRequest, MenuItemSelection, UpdateReservationRequest};
pub use services::{
    start_reconciler_tasks, CompletionPolicy, ExpirationReconciler, MenuProjection,
    ReconcilerSchedule, ReservationRules, ReservationService, RestaurantValidator, TableAssigner,
};
