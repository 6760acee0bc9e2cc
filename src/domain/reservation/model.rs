//! Reservation domain entity

use chrono::{DateTime, Duration, Utc};

/// Actor recorded on history entries written by background jobs.
pub const SYSTEM_ACTOR: &str = "SYSTEM";

/// Reservation lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationStatus {
    /// Created, awaiting customer confirmation
    Pending,
    /// Confirmed by the customer before the deadline
    Confirmed,
    /// Cancelled by user, owner, or the system
    Cancelled,
    /// Completed after the reserved window passed
    Completed,
    /// Customer never showed up
    NoShow,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
            Self::Completed => "COMPLETED",
            Self::NoShow => "NO_SHOW",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "PENDING" => Self::Pending,
            "CONFIRMED" => Self::Confirmed,
            "COMPLETED" => Self::Completed,
            "NO_SHOW" => Self::NoShow,
            _ => Self::Cancelled,
        }
    }

    /// CANCELLED / COMPLETED / NO_SHOW admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed | Self::NoShow)
    }

    /// PENDING or CONFIRMED: counted against the slot quota.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Action recorded in the reservation history log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Created,
    Confirmed,
    Cancelled,
    Modified,
    MenuItemsAdded,
    Completed,
    NoShow,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
            Self::Modified => "MODIFIED",
            Self::MenuItemsAdded => "MENU_ITEMS_ADDED",
            Self::Completed => "COMPLETED",
            Self::NoShow => "NO_SHOW",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "CREATED" => Self::Created,
            "CONFIRMED" => Self::Confirmed,
            "MODIFIED" => Self::Modified,
            "MENU_ITEMS_ADDED" => Self::MenuItemsAdded,
            "COMPLETED" => Self::Completed,
            "NO_SHOW" => Self::NoShow,
            _ => Self::Cancelled,
        }
    }
}

impl std::fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable, append-only history entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub action: HistoryAction,
    pub timestamp: DateTime<Utc>,
    pub details: String,
    /// User id, or [`SYSTEM_ACTOR`] for background transitions
    pub performed_by: String,
}

/// A menu item attached to a reservation, with the price snapshotted
/// at attach time (minor currency units).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationMenuItem {
    pub reservation_id: String,
    pub menu_item_id: String,
    pub quantity: i32,
    pub special_instructions: Option<String>,
    pub price_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Restaurant reservation aggregate root
#[derive(Debug, Clone)]
pub struct Reservation {
    pub id: String,
    pub user_id: String,
    pub restaurant_id: String,
    /// Assigned physical table; None transiently in PENDING and in
    /// terminal states.
    pub table_id: Option<String>,
    pub reservation_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub party_size: i32,
    pub status: ReservationStatus,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub special_requests: Option<String>,
    pub reminders_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmation_deadline: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub history: Vec<HistoryRecord>,
    pub menu_items: Vec<ReservationMenuItem>,
    /// Optimistic-lock version; 0 = never persisted.
    pub version: i32,
}

impl Reservation {
    /// Derived end of the reserved window.
    pub fn end_time(&self) -> DateTime<Utc> {
        self.reservation_time + Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Menu items may be attached only while PENDING or CONFIRMED.
    pub fn can_attach_menu_items(&self) -> bool {
        self.status.is_live()
    }

    /// Append a history record. The log is append-only; nothing ever
    /// removes or rewrites an entry.
    pub fn record(
        &mut self,
        action: HistoryAction,
        details: impl Into<String>,
        performed_by: impl Into<String>,
        at: DateTime<Utc>,
    ) {
        self.history.push(HistoryRecord {
            action,
            timestamp: at,
            details: details.into(),
            performed_by: performed_by.into(),
        });
    }

    /// PENDING → CONFIRMED. Deadline and caller checks live in the
    /// coordinator; this only flips the state.
    pub fn confirm(&mut self, at: DateTime<Utc>) {
        self.status = ReservationStatus::Confirmed;
        self.confirmed_at = Some(at);
    }

    /// Any live status → CANCELLED.
    pub fn cancel(&mut self, reason: impl Into<String>, at: DateTime<Utc>) {
        self.status = ReservationStatus::Cancelled;
        self.cancelled_at = Some(at);
        self.cancellation_reason = Some(reason.into());
    }

    /// CONFIRMED → COMPLETED.
    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.status = ReservationStatus::Completed;
        self.completed_at = Some(at);
    }

    /// CONFIRMED → NO_SHOW.
    pub fn mark_no_show(&mut self, at: DateTime<Utc>) {
        self.status = ReservationStatus::NoShow;
        self.completed_at = Some(at);
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_reservation() -> Reservation {
        let now = Utc::now();
        Reservation {
            id: "res-1".to_string(),
            user_id: "U1".to_string(),
            restaurant_id: "R1".to_string(),
            table_id: None,
            reservation_time: now + Duration::days(7),
            duration_minutes: 120,
            party_size: 4,
            status: ReservationStatus::Pending,
            customer_name: "John Doe".to_string(),
            customer_phone: Some("+11234567890".to_string()),
            customer_email: None,
            special_requests: None,
            reminders_enabled: true,
            created_at: now,
            updated_at: now,
            confirmation_deadline: now + Duration::minutes(15),
            confirmed_at: None,
            cancelled_at: None,
            completed_at: None,
            cancellation_reason: None,
            history: Vec::new(),
            menu_items: Vec::new(),
            version: 0,
        }
    }

    #[test]
    fn end_time_is_start_plus_duration() {
        let r = sample_reservation();
        assert_eq!(r.end_time(), r.reservation_time + Duration::minutes(120));
    }

    #[test]
    fn new_reservation_is_live_not_terminal() {
        let r = sample_reservation();
        assert!(r.status.is_live());
        assert!(!r.is_terminal());
        assert!(r.can_attach_menu_items());
    }

    #[test]
    fn cancel_sets_reason_and_terminal() {
        let mut r = sample_reservation();
        let at = Utc::now();
        r.cancel("changed plans", at);
        assert_eq!(r.status, ReservationStatus::Cancelled);
        assert_eq!(r.cancellation_reason.as_deref(), Some("changed plans"));
        assert_eq!(r.cancelled_at, Some(at));
        assert!(r.is_terminal());
        assert!(!r.can_attach_menu_items());
    }

    #[test]
    fn confirm_records_timestamp() {
        let mut r = sample_reservation();
        let at = Utc::now();
        r.confirm(at);
        assert_eq!(r.status, ReservationStatus::Confirmed);
        assert_eq!(r.confirmed_at, Some(at));
        assert!(r.status.is_live());
    }

    #[test]
    fn history_appends_in_order() {
        let mut r = sample_reservation();
        let t0 = Utc::now();
        r.record(HistoryAction::Created, "created", "U1", t0);
        r.record(
            HistoryAction::Confirmed,
            "confirmed",
            "U1",
            t0 + Duration::minutes(5),
        );
        assert_eq!(r.history.len(), 2);
        assert_eq!(r.history[0].action, HistoryAction::Created);
        assert_eq!(r.history[1].action, HistoryAction::Confirmed);
        assert!(r.history[0].timestamp <= r.history[1].timestamp);
    }

    #[test]
    fn status_string_roundtrip() {
        for status in &[
            ReservationStatus::Pending,
            ReservationStatus::Confirmed,
            ReservationStatus::Cancelled,
            ReservationStatus::Completed,
            ReservationStatus::NoShow,
        ] {
            assert_eq!(&ReservationStatus::from_str(status.as_str()), status);
        }
    }

    #[test]
    fn unknown_status_defaults_to_cancelled() {
        assert_eq!(
            ReservationStatus::from_str("GARBAGE"),
            ReservationStatus::Cancelled
        );
    }

    #[test]
    fn terminal_statuses() {
        assert!(ReservationStatus::Cancelled.is_terminal());
        assert!(ReservationStatus::Completed.is_terminal());
        assert!(ReservationStatus::NoShow.is_terminal());
        assert!(!ReservationStatus::Pending.is_terminal());
        assert!(!ReservationStatus::Confirmed.is_terminal());
    }
}
