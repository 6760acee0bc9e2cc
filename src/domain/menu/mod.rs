//! Menu item projection
//!
//! A read-only local copy of the kitchen service's menu, kept in sync
//! from inbound bus events. Used solely to resolve a menu-item id into
//! a priced snapshot at attach time.

pub mod model;
pub mod repository;

pub use model::MenuItem;
pub use repository::MenuItemRepository;
