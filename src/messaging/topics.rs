//! Bus topic names and consumer group suffixes.

// ── Outbound ───────────────────────────────────────────────────

pub const RESERVATION_CREATE: &str = "reservation.create";
pub const RESERVATION_UPDATE: &str = "reservation.update";
pub const RESERVATION_CANCEL: &str = "reservation.cancel";
pub const RESERVATION_EVENTS: &str = "reservation.events";
pub const TABLE_STATUS: &str = "table.status";
pub const TABLE_FIND_REQUEST: &str = "table.find.request";
pub const RESTAURANT_VALIDATION_REQUEST: &str = "restaurant.validation.request";
pub const RESTAURANT_TIME_VALIDATION_REQUEST: &str = "restaurant.time-validation.request";
pub const RESTAURANT_SEARCH_REQUEST: &str = "restaurant.search.request";
pub const RESTAURANT_OWNERSHIP_REQUEST: &str = "restaurant.ownership.request";

// ── Inbound ────────────────────────────────────────────────────

pub const TABLE_FIND_RESPONSE: &str = "table.find.response";
pub const RESTAURANT_VALIDATION_RESPONSE: &str = "restaurant.validation.response";
pub const RESTAURANT_OWNERSHIP_RESPONSE: &str = "restaurant.ownership.response";
pub const RESTAURANT_SEARCH_RESPONSE: &str = "restaurant.search.response";
pub const USER_EVENTS: &str = "user.events";
pub const MENU_ITEM_EVENTS: &str = "menu.item.events";

/// Consumer group suffixes; the full group id is `<base>-<suffix>`.
pub mod groups {
    pub const USER: &str = "user";
    pub const TABLE_AVAILABILITY: &str = "table-availability";
    pub const TABLE_STATUS: &str = "table-status";
    pub const RESTAURANT_VALIDATION: &str = "restaurant-validation";
    pub const TIME_VALIDATION: &str = "time-validation";
    pub const RESTAURANT_OWNERSHIP: &str = "restaurant-ownership";
    pub const RESTAURANT_SEARCH: &str = "restaurant-search";
    pub const MENU_ITEM: &str = "menu-item";
}
