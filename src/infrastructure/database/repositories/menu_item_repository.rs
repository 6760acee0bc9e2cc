//! SeaORM implementation of MenuItemRepository

use async_trait::async_trait;
use log::debug;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::domain::menu::{MenuItem, MenuItemRepository};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::menu_item;

pub struct SeaOrmMenuItemRepository {
    db: DatabaseConnection,
}

impl SeaOrmMenuItemRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: menu_item::Model) -> MenuItem {
    MenuItem {
        id: m.id,
        restaurant_id: m.restaurant_id,
        name: m.name,
        description: m.description,
        price_cents: m.price_cents,
        category_id: m.category_id,
        available: m.available,
        active: m.active,
    }
}

fn to_active(item: &MenuItem) -> menu_item::ActiveModel {
    menu_item::ActiveModel {
        id: Set(item.id.clone()),
        restaurant_id: Set(item.restaurant_id.clone()),
        name: Set(item.name.clone()),
        description: Set(item.description.clone()),
        price_cents: Set(item.price_cents),
        category_id: Set(item.category_id.clone()),
        available: Set(item.available),
        active: Set(item.active),
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Transient(format!("database error: {}", e))
}

#[async_trait]
impl MenuItemRepository for SeaOrmMenuItemRepository {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<MenuItem>> {
        let model = menu_item::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_by_restaurant(&self, restaurant_id: &str) -> DomainResult<Vec<MenuItem>> {
        let models = menu_item::Entity::find()
            .filter(menu_item::Column::RestaurantId.eq(restaurant_id))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn upsert(&self, item: MenuItem) -> DomainResult<()> {
        debug!("Projecting menu item: {}", item.id);
        let existing = menu_item::Entity::find_by_id(&item.id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        let active = to_active(&item);
        if existing.is_some() {
            active.update(&self.db).await.map_err(db_err)?;
        } else {
            active.insert(&self.db).await.map_err(db_err)?;
        }
        Ok(())
    }

    async fn deactivate(&self, id: &str) -> DomainResult<()> {
        let Some(existing) = menu_item::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
        else {
            return Ok(());
        };
        let mut active: menu_item::ActiveModel = existing.into();
        active.active = Set(false);
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }
}
