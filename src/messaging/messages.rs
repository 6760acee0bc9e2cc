//! Wire message types
//!
//! Field layout matches the collaborating services (JVM, Jackson-style
//! camelCase) in both directions; instants travel as ISO-8601.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::TableStatus;

// ── Outbound lifecycle events ──────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationCreatedEvent {
    pub reservation_id: String,
    pub restaurant_id: String,
    pub user_id: String,
    pub reservation_time: DateTime<Utc>,
    pub party_size: i32,
    pub table_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationUpdatedEvent {
    pub reservation_id: String,
    pub restaurant_id: String,
    pub user_id: String,
    pub old_reservation_time: DateTime<Utc>,
    pub new_reservation_time: DateTime<Utc>,
    pub old_party_size: i32,
    pub new_party_size: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationCancelledEvent {
    pub reservation_id: String,
    pub restaurant_id: String,
    pub user_id: String,
    pub previous_status: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationConfirmedEvent {
    pub reservation_id: String,
    pub restaurant_id: String,
    pub user_id: String,
    pub table_id: Option<String>,
}

// ── Table status (both directions) ─────────────────────────────

/// Messages on the `table.status` topic, discriminated in-band so
/// either side can route without the header.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TableStatusMessage {
    #[serde(rename_all = "camelCase")]
    TableAssigned {
        restaurant_id: String,
        table_id: String,
        reservation_id: String,
    },
    #[serde(rename_all = "camelCase")]
    TableStatusChanged {
        restaurant_id: String,
        table_id: String,
        old_status: Option<TableStatus>,
        new_status: TableStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        reservation_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    TableStatus {
        table_id: String,
        status: TableStatus,
    },
}

impl TableStatusMessage {
    /// Logical event name, also written into the `type` bus header.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::TableAssigned { .. } => "TableAssigned",
            Self::TableStatusChanged { .. } => "TableStatusChanged",
            Self::TableStatus { .. } => "TableStatus",
        }
    }

    /// Partitioning key: reservation id when present, table id otherwise.
    pub fn key(&self) -> &str {
        match self {
            Self::TableAssigned { reservation_id, .. } => reservation_id,
            Self::TableStatusChanged {
                reservation_id,
                table_id,
                ..
            } => reservation_id.as_deref().unwrap_or(table_id),
            Self::TableStatus { table_id, .. } => table_id,
        }
    }
}

// ── Correlated requests (outbound) ─────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindAvailableTableRequest {
    pub reservation_id: String,
    pub restaurant_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub party_size: i32,
    pub correlation_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantValidationRequest {
    pub restaurant_id: String,
    pub correlation_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationTimeValidationRequest {
    pub restaurant_id: String,
    pub correlation_id: String,
    pub reservation_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantOwnershipRequest {
    pub restaurant_id: String,
    pub user_id: String,
    pub correlation_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantSearchRequest {
    pub date: String,
    pub time: String,
    pub party_size: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restaurant_id: Option<String>,
    pub correlation_id: String,
}

// ── Correlated responses (inbound) ─────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindAvailableTableResponse {
    pub correlation_id: String,
    pub success: bool,
    #[serde(default)]
    pub table_id: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantValidationResponse {
    pub correlation_id: String,
    pub restaurant_id: String,
    pub exists: bool,
    pub active: bool,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantOwnershipResponse {
    pub correlation_id: String,
    pub restaurant_id: String,
    pub user_id: String,
    pub is_owner: bool,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub cuisine_type: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantSearchResponse {
    pub correlation_id: String,
    pub success: bool,
    #[serde(default)]
    pub restaurants: Vec<RestaurantSummary>,
    #[serde(default)]
    pub error_message: Option<String>,
}

// ── Menu projection events (inbound) ───────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MenuItemMessage {
    #[serde(rename_all = "camelCase")]
    MenuItemCreated {
        id: String,
        restaurant_id: String,
        name: String,
        #[serde(default)]
        description: Option<String>,
        price: Decimal,
        #[serde(default)]
        category_id: Option<String>,
        available: bool,
        active: bool,
    },
    #[serde(rename_all = "camelCase")]
    MenuItemUpdated {
        id: String,
        restaurant_id: String,
        name: String,
        #[serde(default)]
        description: Option<String>,
        price: Decimal,
        #[serde(default)]
        category_id: Option<String>,
        available: bool,
        active: bool,
    },
    #[serde(rename_all = "camelCase")]
    MenuItemDeleted { id: String },
}
