//! Create reservation_quotas table
//!
//! One counter row per (restaurant, date, time-slot); the unique index
//! is what makes implicit creation race-safe.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReservationQuotas::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReservationQuotas::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ReservationQuotas::RestaurantId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReservationQuotas::Date).date().not_null())
                    .col(ColumnDef::new(ReservationQuotas::TimeSlot).time().not_null())
                    .col(
                        ColumnDef::new(ReservationQuotas::MaxReservations)
                            .integer()
                            .not_null()
                            .default(10),
                    )
                    .col(
                        ColumnDef::new(ReservationQuotas::CurrentReservations)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ReservationQuotas::MaxCapacity)
                            .integer()
                            .not_null()
                            .default(100),
                    )
                    .col(
                        ColumnDef::new(ReservationQuotas::CurrentCapacity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ReservationQuotas::ThresholdPercentage)
                            .integer()
                            .not_null()
                            .default(100),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservation_quotas_slot")
                    .table(ReservationQuotas::Table)
                    .col(ReservationQuotas::RestaurantId)
                    .col(ReservationQuotas::Date)
                    .col(ReservationQuotas::TimeSlot)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReservationQuotas::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ReservationQuotas {
    Table,
    Id,
    RestaurantId,
    Date,
    TimeSlot,
    MaxReservations,
    CurrentReservations,
    MaxCapacity,
    CurrentCapacity,
    ThresholdPercentage,
}
