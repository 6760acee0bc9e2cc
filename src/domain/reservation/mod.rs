//! Reservation aggregate
//!
//! Contains the Reservation entity, its history log and menu-item
//! attachments, and the repository interface.

pub mod model;
pub mod repository;

pub use model::{
    HistoryAction, HistoryRecord, Reservation, ReservationMenuItem, ReservationStatus,
    SYSTEM_ACTOR,
};
pub use repository::ReservationRepository;
