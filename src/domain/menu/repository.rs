//! Menu item projection repository interface

use async_trait::async_trait;

use super::model::MenuItem;
use crate::domain::DomainResult;

#[async_trait]
pub trait MenuItemRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<MenuItem>>;

    async fn find_by_restaurant(&self, restaurant_id: &str) -> DomainResult<Vec<MenuItem>>;

    /// Insert or replace the projected row.
    async fn upsert(&self, item: MenuItem) -> DomainResult<()>;

    /// Mark an item inactive (deletions upstream are soft here).
    /// Unknown ids are a no-op.
    async fn deactivate(&self, id: &str) -> DomainResult<()>;
}
