//! Reservation history entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservation_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub reservation_id: String,

    /// CREATED, CONFIRMED, CANCELLED, MODIFIED, MENU_ITEMS_ADDED,
    /// COMPLETED, NO_SHOW
    pub action: String,

    pub timestamp: DateTimeUtc,
    pub details: String,
    pub performed_by: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::reservation::Entity",
        from = "Column::ReservationId",
        to = "super::reservation::Column::Id"
    )]
    Reservation,
}

impl Related<super::reservation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
