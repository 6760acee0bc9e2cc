//! Quota domain entity

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};

/// Defaults applied when a slot has no quota row yet.
pub const DEFAULT_MAX_RESERVATIONS: i32 = 10;
pub const DEFAULT_MAX_CAPACITY: i32 = 100;

/// Identifies one bookable slot: the (date, time-of-day) pair at which
/// a reservation begins, per restaurant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub restaurant_id: String,
    pub date: NaiveDate,
    pub time_slot: NaiveTime,
}

impl SlotKey {
    /// Derive the slot a reservation instant falls into (UTC, minute
    /// precision; seconds are not part of the slot identity).
    pub fn for_reservation(restaurant_id: &str, at: DateTime<Utc>) -> Self {
        let time = at.time();
        Self {
            restaurant_id: restaurant_id.to_string(),
            date: at.date_naive(),
            time_slot: NaiveTime::from_hms_opt(time.hour(), time.minute(), 0)
                .unwrap_or(NaiveTime::MIN),
        }
    }

    /// Human-readable descriptor for capacity error messages.
    pub fn descriptor(&self) -> String {
        format!("{}, {}", self.date, self.time_slot.format("%H:%M"))
    }
}

/// Capacity counters for one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationQuota {
    pub restaurant_id: String,
    pub date: NaiveDate,
    pub time_slot: NaiveTime,
    pub max_reservations: i32,
    pub current_reservations: i32,
    pub max_capacity: i32,
    pub current_capacity: i32,
    /// 1..=100; below 100 the slot closes early once the occupancy
    /// percentage reaches it (strict less-than comparison).
    pub threshold_percentage: i32,
}

impl ReservationQuota {
    /// Fresh quota row with the implicit-creation defaults.
    pub fn with_defaults(key: &SlotKey) -> Self {
        Self {
            restaurant_id: key.restaurant_id.clone(),
            date: key.date,
            time_slot: key.time_slot,
            max_reservations: DEFAULT_MAX_RESERVATIONS,
            current_reservations: 0,
            max_capacity: DEFAULT_MAX_CAPACITY,
            current_capacity: 0,
            threshold_percentage: 100,
        }
    }

    pub fn key(&self) -> SlotKey {
        SlotKey {
            restaurant_id: self.restaurant_id.clone(),
            date: self.date,
            time_slot: self.time_slot,
        }
    }

    /// Another reservation may still be taken in this slot.
    pub fn has_availability(&self) -> bool {
        if self.current_reservations >= self.max_reservations {
            return false;
        }
        if self.threshold_percentage >= 100 {
            return true;
        }
        if self.max_capacity <= 0 {
            return false;
        }
        (i64::from(self.current_capacity) * 100) / i64::from(self.max_capacity)
            < i64::from(self.threshold_percentage)
    }

    /// A party of `party_size` fits into the remaining capacity.
    pub fn can_accommodate(&self, party_size: i32) -> bool {
        self.current_capacity + party_size <= self.max_capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot() -> SlotKey {
        SlotKey {
            restaurant_id: "R1".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 8).unwrap(),
            time_slot: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
        }
    }

    #[test]
    fn slot_key_truncates_seconds() {
        let at = DateTime::parse_from_rfc3339("2025-01-08T19:00:42Z")
            .unwrap()
            .with_timezone(&Utc);
        let key = SlotKey::for_reservation("R1", at);
        assert_eq!(key, slot());
        assert_eq!(key.descriptor(), "2025-01-08, 19:00");
    }

    #[test]
    fn defaults_have_availability() {
        let q = ReservationQuota::with_defaults(&slot());
        assert!(q.has_availability());
        assert!(q.can_accommodate(20));
        assert_eq!(q.max_reservations, 10);
        assert_eq!(q.max_capacity, 100);
    }

    #[test]
    fn full_reservation_count_blocks() {
        let mut q = ReservationQuota::with_defaults(&slot());
        q.current_reservations = q.max_reservations;
        assert!(!q.has_availability());
    }

    #[test]
    fn threshold_uses_strict_less_than() {
        let mut q = ReservationQuota::with_defaults(&slot());
        q.threshold_percentage = 80;
        q.current_capacity = 79;
        assert!(q.has_availability());
        // exactly at the threshold counts as full
        q.current_capacity = 80;
        assert!(!q.has_availability());
    }

    #[test]
    fn threshold_100_ignores_occupancy_percentage() {
        let mut q = ReservationQuota::with_defaults(&slot());
        q.current_capacity = 99;
        assert!(q.has_availability());
    }

    #[test]
    fn can_accommodate_bounds() {
        let mut q = ReservationQuota::with_defaults(&slot());
        q.current_capacity = 96;
        assert!(q.can_accommodate(4));
        assert!(!q.can_accommodate(5));
    }
}
