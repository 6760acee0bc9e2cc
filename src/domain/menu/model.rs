//! Menu item projection entity

/// Local projection of a menu item owned by the kitchen service.
///
/// Eventually consistent; never gates safety-critical decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    /// External menu-item id (primary key of the projection).
    pub id: String,
    pub restaurant_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Minor currency units.
    pub price_cents: i64,
    pub category_id: Option<String>,
    pub available: bool,
    pub active: bool,
}

impl MenuItem {
    /// Items that were deactivated upstream or are temporarily
    /// unavailable cannot be attached to reservations.
    pub fn is_attachable(&self) -> bool {
        self.active && self.available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(active: bool, available: bool) -> MenuItem {
        MenuItem {
            id: "M1".to_string(),
            restaurant_id: "R1".to_string(),
            name: "Margherita".to_string(),
            description: None,
            price_cents: 1250,
            category_id: None,
            available,
            active,
        }
    }

    #[test]
    fn attachable_requires_active_and_available() {
        assert!(item(true, true).is_attachable());
        assert!(!item(false, true).is_attachable());
        assert!(!item(true, false).is_attachable());
    }
}
