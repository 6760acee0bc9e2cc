//! Domain layer - core business entities and types

pub mod error;
pub mod menu;
pub mod quota;
pub mod repositories;
pub mod reservation;
pub mod table;

pub use error::{AppError, CapacityKind, DomainError, DomainResult, InfraError};
pub use menu::{MenuItem, MenuItemRepository};
pub use quota::{QuotaDecision, QuotaRepository, ReservationQuota, SlotKey};
pub use repositories::RepositoryProvider;
pub use reservation::{
    HistoryAction, HistoryRecord, Reservation, ReservationMenuItem, ReservationRepository,
    ReservationStatus, SYSTEM_ACTOR,
};
pub use table::TableStatus;
