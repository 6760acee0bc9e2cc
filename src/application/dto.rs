//! Coordinator request DTOs
//!
//! Structural constraints are expressed with `validator` derives; the
//! coordinator flattens the resulting `ValidationErrors` into the
//! per-field message map of [`DomainError::Validation`] and layers the
//! business-rule checks (contact presence, booking window) on top.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

/// E.164-ish phone shape: optional `+`, 7–15 digits, no leading zero.
fn phone_regex() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^\+?[1-9][0-9]{6,14}$").expect("static phone pattern"))
}

fn validate_phone(value: &str) -> Result<(), ValidationError> {
    if phone_regex().is_match(value) {
        return Ok(());
    }
    let mut error = ValidationError::new("phone");
    error.message = Some("must be a valid phone number".into());
    Err(error)
}

/// One requested menu item on create / add-menu-items.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemSelection {
    #[validate(length(min = 1, message = "is required"))]
    pub menu_item_id: String,

    #[validate(range(min = 1, message = "must be at least 1"))]
    pub quantity: i32,

    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub restaurant_id: String,

    pub reservation_time: DateTime<Utc>,

    /// Defaults to the configured session length when absent.
    #[validate(range(min = 15, max = 480, message = "must be between 15 and 480 minutes"))]
    pub duration_minutes: Option<i32>,

    pub party_size: i32,

    #[validate(length(min = 2, max = 100, message = "must be between 2 and 100 characters"))]
    pub customer_name: String,

    #[validate(custom(function = validate_phone))]
    pub customer_phone: Option<String>,

    #[validate(email(message = "must be a valid email address"))]
    pub customer_email: Option<String>,

    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub special_requests: Option<String>,

    #[serde(default)]
    pub reminders_enabled: bool,

    #[serde(default)]
    #[validate(nested)]
    pub menu_items: Vec<MenuItemSelection>,
}

/// Patch for an existing reservation; None leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReservationRequest {
    pub reservation_time: Option<DateTime<Utc>>,

    pub party_size: Option<i32>,

    #[validate(range(min = 15, max = 480, message = "must be between 15 and 480 minutes"))]
    pub duration_minutes: Option<i32>,

    #[validate(length(min = 2, max = 100, message = "must be between 2 and 100 characters"))]
    pub customer_name: Option<String>,

    #[validate(custom(function = validate_phone))]
    pub customer_phone: Option<String>,

    #[validate(email(message = "must be a valid email address"))]
    pub customer_email: Option<String>,

    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub special_requests: Option<String>,
}

impl UpdateReservationRequest {
    pub fn is_empty(&self) -> bool {
        self.reservation_time.is_none()
            && self.party_size.is_none()
            && self.duration_minutes.is_none()
            && self.customer_name.is_none()
            && self.customer_phone.is_none()
            && self.customer_email.is_none()
            && self.special_requests.is_none()
    }
}

/// Search criteria forwarded to the restaurant service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantSearchCriteria {
    pub date: String,
    pub time: String,
    pub party_size: i32,
    pub cuisine: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub distance: Option<f64>,
    pub restaurant_id: Option<String>,
}

// ── Error-map helpers ──────────────────────────────────────────

fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for c in field.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Flatten `validator` output into `field → message`, camelCased to
/// match the wire naming. Nested list errors keep their index path
/// (`menuItems[0].quantity`).
pub fn collect_field_errors(errors: &ValidationErrors) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    collect_into(errors, "", &mut fields);
    fields
}

fn collect_into(errors: &ValidationErrors, prefix: &str, out: &mut BTreeMap<String, String>) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let name = if prefix.is_empty() {
            to_camel_case(field)
        } else {
            format!("{}.{}", prefix, to_camel_case(field))
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(first) = list.first() {
                    let message = first
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{:?}", first.code));
                    out.insert(name, message);
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_into(nested, &name, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_into(nested, &format!("{}[{}]", name, index), out);
                }
            }
        }
    }
}
