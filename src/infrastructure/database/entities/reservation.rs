//! Reservation entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub user_id: String,
    pub restaurant_id: String,

    #[sea_orm(nullable)]
    pub table_id: Option<String>,

    pub reservation_time: DateTimeUtc,
    pub duration_minutes: i32,
    /// Denormalized `reservation_time + duration` for overlap queries.
    pub end_time: DateTimeUtc,
    pub party_size: i32,

    /// Reservation status: PENDING, CONFIRMED, CANCELLED, COMPLETED, NO_SHOW
    pub status: String,

    pub customer_name: String,
    #[sea_orm(nullable)]
    pub customer_phone: Option<String>,
    #[sea_orm(nullable)]
    pub customer_email: Option<String>,
    #[sea_orm(nullable)]
    pub special_requests: Option<String>,
    pub reminders_enabled: bool,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub confirmation_deadline: DateTimeUtc,
    #[sea_orm(nullable)]
    pub confirmed_at: Option<DateTimeUtc>,
    #[sea_orm(nullable)]
    pub cancelled_at: Option<DateTimeUtc>,
    #[sea_orm(nullable)]
    pub completed_at: Option<DateTimeUtc>,
    #[sea_orm(nullable)]
    pub cancellation_reason: Option<String>,

    /// Optimistic-lock version.
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::reservation_history::Entity")]
    History,
    #[sea_orm(has_many = "super::reservation_menu_item::Entity")]
    MenuItems,
}

impl Related<super::reservation_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

impl Related<super::reservation_menu_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MenuItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
