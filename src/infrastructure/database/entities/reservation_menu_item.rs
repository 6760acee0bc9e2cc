//! Reservation menu item entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservation_menu_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub reservation_id: String,
    pub menu_item_id: String,
    pub quantity: i32,

    #[sea_orm(nullable)]
    pub special_instructions: Option<String>,

    /// Price snapshot at attach time, minor currency units.
    pub price_cents: i64,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
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
