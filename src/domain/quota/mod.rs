//! Per-slot reservation quota
//!
//! Guards concurrent creates: one counter row per
//! (restaurant, date, time-slot) with atomic conditional updates.

pub mod model;
pub mod repository;

pub use model::{ReservationQuota, SlotKey, DEFAULT_MAX_CAPACITY, DEFAULT_MAX_RESERVATIONS};
pub use repository::{QuotaDecision, QuotaRepository};
