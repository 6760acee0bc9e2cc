//! Database entities module

pub mod menu_item;
pub mod reservation;
pub mod reservation_history;
pub mod reservation_menu_item;
pub mod reservation_quota;

pub use menu_item::Entity as MenuItem;
pub use reservation::Entity as Reservation;
pub use reservation_history::Entity as ReservationHistory;
pub use reservation_menu_item::Entity as ReservationMenuItem;
pub use reservation_quota::Entity as ReservationQuota;
