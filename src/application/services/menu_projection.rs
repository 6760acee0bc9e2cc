//! Menu item projection maintenance.
//!
//! Applies inbound `menu.item.*` events to the local read-only copy.
//! Upstream deletions become soft deactivations so already-attached
//! snapshots keep resolving.

use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::{DomainResult, MenuItem, RepositoryProvider};
use crate::messaging::messages::MenuItemMessage;

pub struct MenuProjection {
    repos: Arc<dyn RepositoryProvider>,
}

impl MenuProjection {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    pub async fn apply(&self, message: MenuItemMessage) -> DomainResult<()> {
        match message {
            MenuItemMessage::MenuItemCreated {
                id,
                restaurant_id,
                name,
                description,
                price,
                category_id,
                available,
                active,
            }
            | MenuItemMessage::MenuItemUpdated {
                id,
                restaurant_id,
                name,
                description,
                price,
                category_id,
                available,
                active,
            } => {
                debug!(menu_item_id = id.as_str(), restaurant_id = restaurant_id.as_str(), "Projecting menu item");
                self.repos
                    .menu_items()
                    .upsert(MenuItem {
                        id,
                        restaurant_id,
                        name,
                        description,
                        price_cents: to_cents(price),
                        category_id,
                        available,
                        active,
                    })
                    .await
            }
            MenuItemMessage::MenuItemDeleted { id } => {
                debug!(menu_item_id = id.as_str(), "Deactivating projected menu item");
                self.repos.menu_items().deactivate(&id).await
            }
        }
    }
}

/// Wire prices arrive as decimals; the projection stores minor units.
/// Negative or overflowing values clamp to zero rather than poisoning
/// the row.
fn to_cents(price: Decimal) -> i64 {
    (price * Decimal::from(100))
        .round()
        .to_i64()
        .unwrap_or(0)
        .max(0)
}
