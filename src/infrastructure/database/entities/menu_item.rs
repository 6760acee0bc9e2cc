//! Menu item projection entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "menu_items")]
pub struct Model {
    /// External menu-item id.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub restaurant_id: String,
    pub name: String,

    #[sea_orm(nullable)]
    pub description: Option<String>,

    /// Minor currency units.
    pub price_cents: i64,

    #[sea_orm(nullable)]
    pub category_id: Option<String>,

    pub available: bool,
    pub active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
