//! Domain error taxonomy.
//!
//! `Validation`, `NotFound` and `Capacity` are produced by normal business
//! flow; `Conflict` signals a lost optimistic-lock race; `Timeout` a remote
//! oracle that never answered; `Transient` an infrastructure blip the
//! caller may retry.

use std::collections::BTreeMap;

use thiserror::Error;

/// Which capacity limit was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityKind {
    /// The slot's reservation-count or threshold limit is reached.
    NoAvailability,
    /// No table (or remaining capacity) accommodates the party.
    NoSuitableTables,
}

impl std::fmt::Display for CapacityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAvailability => write!(f, "No availability"),
            Self::NoSuitableTables => write!(f, "No suitable tables"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// Input failed structural or business-rule validation.
    /// Carries one message per offending field.
    #[error("Validation failed: {}", format_fields(.fields))]
    Validation { fields: BTreeMap<String, String> },

    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    /// Slot or table capacity exhausted. `slot` is a human-readable
    /// descriptor ("<date>, <time>") for UI surfacing.
    #[error("{kind} for slot {slot}")]
    Capacity { kind: CapacityKind, slot: String },

    /// Concurrent modification detected at the store.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A remote oracle did not answer within its timeout.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Infrastructure blip (store connectivity, bus publish failure).
    #[error("Transient failure: {0}")]
    Transient(String),
}

fn format_fields(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(field, msg)| format!("{}: {}", field, msg))
        .collect::<Vec<_>>()
        .join("; ")
}

impl DomainError {
    /// Single-field validation failure.
    pub fn field(name: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(name.into(), message.into());
        Self::Validation { fields }
    }

    pub fn validation(fields: BTreeMap<String, String>) -> Self {
        Self::Validation { fields }
    }

    pub const fn capacity(kind: CapacityKind, slot: String) -> Self {
        Self::Capacity { kind, slot }
    }

    /// Whether the operation may succeed if retried as-is.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_))
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Bus error: {0}")]
    Bus(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Infra(#[from] InfraError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_joins_fields() {
        let mut fields = BTreeMap::new();
        fields.insert("partySize".to_string(), "must be at least 1".to_string());
        fields.insert("customerName".to_string(), "too short".to_string());
        let err = DomainError::validation(fields);
        let text = err.to_string();
        // BTreeMap keeps field order deterministic
        assert_eq!(
            text,
            "Validation failed: customerName: too short; partySize: must be at least 1"
        );
    }

    #[test]
    fn transient_classification() {
        assert!(DomainError::Transient("db".into()).is_transient());
        assert!(DomainError::Timeout("oracle".into()).is_transient());
        assert!(!DomainError::field("userId", "not allowed").is_transient());
        assert!(!DomainError::Conflict("version".into()).is_transient());
    }
}
