//! Configuration module
//!
//! TOML-based application configuration
//! (~/.config/dinesync-reservations/config.toml by default, overridable
//! via `RESERVATION_CONFIG`). Every section falls back to its documented
//! default, so a missing file still yields a runnable configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::application::{CompletionPolicy, ReconcilerSchedule, ReservationRules};
use crate::messaging::kafka::KafkaSettings;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSection,
    pub kafka: KafkaSection,
    pub restaurant_service: RestaurantServiceSection,
    pub reservation: ReservationSection,
    pub timeouts: TimeoutsSection,
    pub scheduling: SchedulingSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: "sqlite://./reservations.db?mode=rwc".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KafkaSection {
    pub brokers: String,
    pub group_base: String,
    pub publish_timeout_secs: u64,
}

impl Default for KafkaSection {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            group_base: "reservation-service".to_string(),
            publish_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RestaurantServiceSection {
    /// Base URL for the REST fallback paths.
    pub url: String,
}

impl Default for RestaurantServiceSection {
    fn default() -> Self {
        Self {
            url: "http://localhost:8081".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReservationSection {
    pub confirmation_expiration_minutes: i64,
    pub default_session_length_minutes: i32,
    pub min_advance_booking_minutes: i64,
    pub max_party_size: i32,
    pub max_future_days: i64,
}

impl Default for ReservationSection {
    fn default() -> Self {
        Self {
            confirmation_expiration_minutes: 15,
            default_session_length_minutes: 120,
            min_advance_booking_minutes: 60,
            max_party_size: 20,
            max_future_days: 90,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutsSection {
    /// table.availability.request.timeout (seconds)
    pub table_availability_request_secs: u64,
    /// restaurant.validation.request.timeout (seconds)
    pub restaurant_validation_request_secs: u64,
}

impl Default for TimeoutsSection {
    fn default() -> Self {
        Self {
            table_availability_request_secs: 10,
            restaurant_validation_request_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulingSection {
    pub expired_reservations_interval_ms: u64,
    pub data_cleanup_interval_ms: u64,
    pub data_cleanup_initial_delay_ms: u64,
    pub data_cleanup_age_days: i64,
    /// "completed" (default) or "no-show"
    pub past_confirmed_policy: String,
}

impl Default for SchedulingSection {
    fn default() -> Self {
        Self {
            expired_reservations_interval_ms: 60_000,
            data_cleanup_interval_ms: 86_400_000,
            data_cleanup_initial_delay_ms: 3_600_000,
            data_cleanup_age_days: 90,
            past_confirmed_policy: "completed".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        toml::from_str(&raw).map_err(|e| format!("cannot parse {}: {}", path.display(), e))
    }

    pub fn kafka_settings(&self) -> KafkaSettings {
        KafkaSettings {
            brokers: self.kafka.brokers.clone(),
            group_base: self.kafka.group_base.clone(),
            publish_timeout: Duration::from_secs(self.kafka.publish_timeout_secs),
        }
    }

    pub fn reservation_rules(&self) -> ReservationRules {
        ReservationRules {
            confirmation_expiration_minutes: self.reservation.confirmation_expiration_minutes,
            default_session_length_minutes: self.reservation.default_session_length_minutes,
            min_advance_booking_minutes: self.reservation.min_advance_booking_minutes,
            max_party_size: self.reservation.max_party_size,
            max_future_days: self.reservation.max_future_days,
        }
    }

    pub fn reconciler_schedule(&self) -> ReconcilerSchedule {
        ReconcilerSchedule {
            expired_reservations_interval: Duration::from_millis(
                self.scheduling.expired_reservations_interval_ms,
            ),
            data_cleanup_interval: Duration::from_millis(self.scheduling.data_cleanup_interval_ms),
            data_cleanup_initial_delay: Duration::from_millis(
                self.scheduling.data_cleanup_initial_delay_ms,
            ),
            data_cleanup_age_days: self.scheduling.data_cleanup_age_days,
        }
    }

    pub fn completion_policy(&self) -> CompletionPolicy {
        match self.scheduling.past_confirmed_policy.as_str() {
            "no-show" | "no_show" => CompletionPolicy::NoShow,
            _ => CompletionPolicy::Complete,
        }
    }

    pub fn table_availability_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.table_availability_request_secs)
    }

    pub fn restaurant_validation_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.restaurant_validation_request_secs)
    }
}

/// Default configuration path under the platform config dir.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dinesync-reservations")
        .join("config.toml")
}
