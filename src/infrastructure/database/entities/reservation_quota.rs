//! Reservation quota entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservation_quotas")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub restaurant_id: String,
    pub date: Date,
    pub time_slot: Time,

    pub max_reservations: i32,
    pub current_reservations: i32,
    pub max_capacity: i32,
    pub current_capacity: i32,
    pub threshold_percentage: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
