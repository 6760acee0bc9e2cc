//! SeaORM implementation of QuotaRepository
//!
//! Atomicity is a conditional UPDATE whose WHERE clause matches the
//! previously read counter values; losers of the race re-read and try
//! again up to a small bound. Implicit row creation leans on the
//! unique (restaurant, date, time_slot) index: a racing insert fails
//! and the loop falls through to the update path.

use async_trait::async_trait;
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, Set,
};

use crate::domain::quota::{QuotaDecision, QuotaRepository, ReservationQuota, SlotKey};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::reservation_quota;

const MAX_ATTEMPTS: usize = 5;

pub struct SeaOrmQuotaRepository {
    db: DatabaseConnection,
}

impl SeaOrmQuotaRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_row(&self, key: &SlotKey) -> DomainResult<Option<reservation_quota::Model>> {
        reservation_quota::Entity::find()
            .filter(reservation_quota::Column::RestaurantId.eq(key.restaurant_id.clone()))
            .filter(reservation_quota::Column::Date.eq(key.date))
            .filter(reservation_quota::Column::TimeSlot.eq(key.time_slot))
            .one(&self.db)
            .await
            .map_err(db_err)
    }
}

fn model_to_domain(m: &reservation_quota::Model) -> ReservationQuota {
    ReservationQuota {
        restaurant_id: m.restaurant_id.clone(),
        date: m.date,
        time_slot: m.time_slot,
        max_reservations: m.max_reservations,
        current_reservations: m.current_reservations,
        max_capacity: m.max_capacity,
        current_capacity: m.current_capacity,
        threshold_percentage: m.threshold_percentage,
    }
}

fn evaluate(quota: &ReservationQuota, party_size: i32) -> QuotaDecision {
    if !quota.has_availability() {
        QuotaDecision::Unavailable
    } else if !quota.can_accommodate(party_size) {
        QuotaDecision::CannotAccommodate
    } else {
        QuotaDecision::Granted
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Transient(format!("database error: {}", e))
}

#[async_trait]
impl QuotaRepository for SeaOrmQuotaRepository {
    async fn get(&self, key: &SlotKey) -> DomainResult<Option<ReservationQuota>> {
        Ok(self.find_row(key).await?.as_ref().map(model_to_domain))
    }

    async fn try_reserve(&self, key: &SlotKey, party_size: i32) -> DomainResult<QuotaDecision> {
        for attempt in 0..MAX_ATTEMPTS {
            match self.find_row(key).await? {
                None => {
                    let defaults = ReservationQuota::with_defaults(key);
                    let decision = evaluate(&defaults, party_size);
                    if decision != QuotaDecision::Granted {
                        return Ok(decision);
                    }
                    let row = reservation_quota::ActiveModel {
                        id: NotSet,
                        restaurant_id: Set(key.restaurant_id.clone()),
                        date: Set(key.date),
                        time_slot: Set(key.time_slot),
                        max_reservations: Set(defaults.max_reservations),
                        current_reservations: Set(1),
                        max_capacity: Set(defaults.max_capacity),
                        current_capacity: Set(party_size),
                        threshold_percentage: Set(defaults.threshold_percentage),
                    };
                    match row.insert(&self.db).await {
                        Ok(_) => return Ok(QuotaDecision::Granted),
                        Err(e) => {
                            // unique-index race: someone created the
                            // row first; re-read and contend normally
                            debug!(
                                "Quota insert lost creation race (attempt {}): {}",
                                attempt, e
                            );
                            continue;
                        }
                    }
                }
                Some(model) => {
                    let quota = model_to_domain(&model);
                    let decision = evaluate(&quota, party_size);
                    if decision != QuotaDecision::Granted {
                        return Ok(decision);
                    }
                    let result = reservation_quota::Entity::update_many()
                        .col_expr(
                            reservation_quota::Column::CurrentReservations,
                            Expr::value(model.current_reservations + 1),
                        )
                        .col_expr(
                            reservation_quota::Column::CurrentCapacity,
                            Expr::value(model.current_capacity + party_size),
                        )
                        .filter(reservation_quota::Column::Id.eq(model.id))
                        .filter(
                            reservation_quota::Column::CurrentReservations
                                .eq(model.current_reservations),
                        )
                        .filter(
                            reservation_quota::Column::CurrentCapacity
                                .eq(model.current_capacity),
                        )
                        .exec(&self.db)
                        .await
                        .map_err(db_err)?;
                    if result.rows_affected == 1 {
                        return Ok(QuotaDecision::Granted);
                    }
                    // counters moved underneath us; retry
                }
            }
        }
        Err(DomainError::Conflict(format!(
            "quota contention on slot {}",
            key.descriptor()
        )))
    }

    async fn release(&self, key: &SlotKey, party_size: i32) -> DomainResult<()> {
        for _ in 0..MAX_ATTEMPTS {
            let Some(model) = self.find_row(key).await? else {
                // releasing a slot that never got a row is a no-op
                return Ok(());
            };
            let result = reservation_quota::Entity::update_many()
                .col_expr(
                    reservation_quota::Column::CurrentReservations,
                    Expr::value((model.current_reservations - 1).max(0)),
                )
                .col_expr(
                    reservation_quota::Column::CurrentCapacity,
                    Expr::value((model.current_capacity - party_size).max(0)),
                )
                .filter(reservation_quota::Column::Id.eq(model.id))
                .filter(
                    reservation_quota::Column::CurrentReservations
                        .eq(model.current_reservations),
                )
                .filter(reservation_quota::Column::CurrentCapacity.eq(model.current_capacity))
                .exec(&self.db)
                .await
                .map_err(db_err)?;
            if result.rows_affected == 1 {
                return Ok(());
            }
        }
        Err(DomainError::Conflict(format!(
            "quota contention on slot {}",
            key.descriptor()
        )))
    }

    async fn check(&self, key: &SlotKey, party_size: i32) -> DomainResult<QuotaDecision> {
        let quota = self
            .find_row(key)
            .await?
            .as_ref()
            .map(model_to_domain)
            .unwrap_or_else(|| ReservationQuota::with_defaults(key));
        Ok(evaluate(&quota, party_size))
    }
}
