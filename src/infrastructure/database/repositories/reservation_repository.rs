//! SeaORM implementation of ReservationRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::domain::reservation::{
    HistoryAction, HistoryRecord, Reservation, ReservationMenuItem, ReservationRepository,
    ReservationStatus,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{
    reservation, reservation_history, reservation_menu_item,
};
use crate::shared::PaginatedResult;

const LIVE_STATUSES: [&str; 2] = ["PENDING", "CONFIRMED"];
const TERMINAL_STATUSES: [&str; 3] = ["CANCELLED", "COMPLETED", "NO_SHOW"];

pub struct SeaOrmReservationRepository {
    db: DatabaseConnection,
}

impl SeaOrmReservationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn row_to_domain(
    m: reservation::Model,
    history: Vec<reservation_history::Model>,
    menu_items: Vec<reservation_menu_item::Model>,
) -> Reservation {
    Reservation {
        id: m.id,
        user_id: m.user_id,
        restaurant_id: m.restaurant_id,
        table_id: m.table_id,
        reservation_time: m.reservation_time,
        duration_minutes: m.duration_minutes,
        party_size: m.party_size,
        status: ReservationStatus::from_str(&m.status),
        customer_name: m.customer_name,
        customer_phone: m.customer_phone,
        customer_email: m.customer_email,
        special_requests: m.special_requests,
        reminders_enabled: m.reminders_enabled,
        created_at: m.created_at,
        updated_at: m.updated_at,
        confirmation_deadline: m.confirmation_deadline,
        confirmed_at: m.confirmed_at,
        cancelled_at: m.cancelled_at,
        completed_at: m.completed_at,
        cancellation_reason: m.cancellation_reason,
        history: history
            .into_iter()
            .map(|h| HistoryRecord {
                action: HistoryAction::from_str(&h.action),
                timestamp: h.timestamp,
                details: h.details,
                performed_by: h.performed_by,
            })
            .collect(),
        menu_items: menu_items
            .into_iter()
            .map(|item| ReservationMenuItem {
                reservation_id: item.reservation_id,
                menu_item_id: item.menu_item_id,
                quantity: item.quantity,
                special_instructions: item.special_instructions,
                price_cents: item.price_cents,
                created_at: item.created_at,
                updated_at: item.updated_at,
            })
            .collect(),
        version: m.version,
    }
}

fn to_active(r: &Reservation) -> reservation::ActiveModel {
    reservation::ActiveModel {
        id: Set(r.id.clone()),
        user_id: Set(r.user_id.clone()),
        restaurant_id: Set(r.restaurant_id.clone()),
        table_id: Set(r.table_id.clone()),
        reservation_time: Set(r.reservation_time),
        duration_minutes: Set(r.duration_minutes),
        end_time: Set(r.end_time()),
        party_size: Set(r.party_size),
        status: Set(r.status.as_str().to_string()),
        customer_name: Set(r.customer_name.clone()),
        customer_phone: Set(r.customer_phone.clone()),
        customer_email: Set(r.customer_email.clone()),
        special_requests: Set(r.special_requests.clone()),
        reminders_enabled: Set(r.reminders_enabled),
        created_at: Set(r.created_at),
        updated_at: Set(r.updated_at),
        confirmation_deadline: Set(r.confirmation_deadline),
        confirmed_at: Set(r.confirmed_at),
        cancelled_at: Set(r.cancelled_at),
        completed_at: Set(r.completed_at),
        cancellation_reason: Set(r.cancellation_reason.clone()),
        version: Set(r.version),
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Transient(format!("database error: {}", e))
}

async fn insert_children<C: ConnectionTrait>(txn: &C, r: &Reservation) -> DomainResult<()> {
    for record in &r.history {
        reservation_history::ActiveModel {
            id: NotSet,
            reservation_id: Set(r.id.clone()),
            action: Set(record.action.as_str().to_string()),
            timestamp: Set(record.timestamp),
            details: Set(record.details.clone()),
            performed_by: Set(record.performed_by.clone()),
        }
        .insert(txn)
        .await
        .map_err(db_err)?;
    }
    for item in &r.menu_items {
        reservation_menu_item::ActiveModel {
            id: NotSet,
            reservation_id: Set(r.id.clone()),
            menu_item_id: Set(item.menu_item_id.clone()),
            quantity: Set(item.quantity),
            special_instructions: Set(item.special_instructions.clone()),
            price_cents: Set(item.price_cents),
            created_at: Set(item.created_at),
            updated_at: Set(item.updated_at),
        }
        .insert(txn)
        .await
        .map_err(db_err)?;
    }
    Ok(())
}

// ── ReservationRepository impl ──────────────────────────────────

#[async_trait]
impl ReservationRepository for SeaOrmReservationRepository {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Reservation>> {
        let Some(model) = reservation::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };
        let history = reservation_history::Entity::find()
            .filter(reservation_history::Column::ReservationId.eq(id))
            .order_by_asc(reservation_history::Column::Timestamp)
            .order_by_asc(reservation_history::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        let menu_items = reservation_menu_item::Entity::find()
            .filter(reservation_menu_item::Column::ReservationId.eq(id))
            .order_by_asc(reservation_menu_item::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(Some(row_to_domain(model, history, menu_items)))
    }

    async fn save(&self, mut r: Reservation) -> DomainResult<Reservation> {
        debug!("Saving reservation: {}", r.id);
        let txn = self.db.begin().await.map_err(db_err)?;
        r.updated_at = Utc::now();

        if r.version == 0 {
            r.version = 1;
            to_active(&r).insert(&txn).await.map_err(db_err)?;
        } else {
            let expected = r.version;
            r.version += 1;
            let mut active = to_active(&r);
            active.id = NotSet;
            active.created_at = NotSet;
            let result = reservation::Entity::update_many()
                .set(active)
                .filter(reservation::Column::Id.eq(r.id.clone()))
                .filter(reservation::Column::Version.eq(expected))
                .exec(&txn)
                .await
                .map_err(db_err)?;
            if result.rows_affected == 0 {
                let _ = txn.rollback().await;
                return Err(DomainError::Conflict(format!(
                    "reservation {} was modified concurrently",
                    r.id
                )));
            }
            // children are rewritten wholesale; the history list itself
            // is append-only at the domain layer
            reservation_history::Entity::delete_many()
                .filter(reservation_history::Column::ReservationId.eq(r.id.clone()))
                .exec(&txn)
                .await
                .map_err(db_err)?;
            reservation_menu_item::Entity::delete_many()
                .filter(reservation_menu_item::Column::ReservationId.eq(r.id.clone()))
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }

        insert_children(&txn, &r).await?;
        txn.commit().await.map_err(db_err)?;
        Ok(r)
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;
        reservation_history::Entity::delete_many()
            .filter(reservation_history::Column::ReservationId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        reservation_menu_item::Entity::delete_many()
            .filter(reservation_menu_item::Column::ReservationId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        reservation::Entity::delete_many()
            .filter(reservation::Column::Id.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)
    }

    async fn page_by_user(
        &self,
        user_id: &str,
        page: u64,
        limit: u64,
    ) -> DomainResult<PaginatedResult<Reservation>> {
        let paginator = reservation::Entity::find()
            .filter(reservation::Column::UserId.eq(user_id))
            .order_by_desc(reservation::Column::ReservationTime)
            .paginate(&self.db, limit);
        let total = paginator.num_items().await.map_err(db_err)?;
        let models = paginator.fetch_page(page - 1).await.map_err(db_err)?;
        let items = models
            .into_iter()
            .map(|m| row_to_domain(m, Vec::new(), Vec::new()))
            .collect();
        Ok(PaginatedResult::new(items, total, page, limit))
    }

    async fn page_by_restaurant(
        &self,
        restaurant_id: &str,
        page: u64,
        limit: u64,
    ) -> DomainResult<PaginatedResult<Reservation>> {
        let paginator = reservation::Entity::find()
            .filter(reservation::Column::RestaurantId.eq(restaurant_id))
            .order_by_desc(reservation::Column::ReservationTime)
            .paginate(&self.db, limit);
        let total = paginator.num_items().await.map_err(db_err)?;
        let models = paginator.fetch_page(page - 1).await.map_err(db_err)?;
        let items = models
            .into_iter()
            .map(|m| row_to_domain(m, Vec::new(), Vec::new()))
            .collect();
        Ok(PaginatedResult::new(items, total, page, limit))
    }

    async fn find_expired_pending(&self, as_of: DateTime<Utc>) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::Status.eq("PENDING"))
            .filter(reservation::Column::ConfirmationDeadline.lt(as_of))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models
            .into_iter()
            .map(|m| row_to_domain(m, Vec::new(), Vec::new()))
            .collect())
    }

    async fn find_uncompleted_past(
        &self,
        as_of: DateTime<Utc>,
    ) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::Status.eq("CONFIRMED"))
            .filter(reservation::Column::EndTime.lt(as_of))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models
            .into_iter()
            .map(|m| row_to_domain(m, Vec::new(), Vec::new()))
            .collect())
    }

    async fn find_conflicting(
        &self,
        restaurant_id: &str,
        table_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::RestaurantId.eq(restaurant_id))
            .filter(reservation::Column::TableId.eq(table_id))
            .filter(reservation::Column::Status.is_in(LIVE_STATUSES))
            .filter(reservation::Column::ReservationTime.lt(end))
            .filter(reservation::Column::EndTime.gt(start))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models
            .into_iter()
            .map(|m| row_to_domain(m, Vec::new(), Vec::new()))
            .collect())
    }

    async fn delete_terminal_older_than(&self, cutoff: DateTime<Utc>) -> DomainResult<u64> {
        let stale: Vec<String> = reservation::Entity::find()
            .filter(reservation::Column::Status.is_in(TERMINAL_STATUSES))
            .filter(reservation::Column::UpdatedAt.lt(cutoff))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|m| m.id)
            .collect();
        if stale.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin().await.map_err(db_err)?;
        reservation_history::Entity::delete_many()
            .filter(reservation_history::Column::ReservationId.is_in(stale.clone()))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        reservation_menu_item::Entity::delete_many()
            .filter(reservation_menu_item::Column::ReservationId.is_in(stale.clone()))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        let result = reservation::Entity::delete_many()
            .filter(reservation::Column::Id.is_in(stale))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;
        Ok(result.rows_affected)
    }
}
