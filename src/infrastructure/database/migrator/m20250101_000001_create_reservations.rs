//! Create reservations table
//!
//! The aggregate root row. History and menu items live in their own
//! tables and cascade with this one.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reservations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reservations::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Reservations::UserId).string().not_null())
                    .col(
                        ColumnDef::new(Reservations::RestaurantId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Reservations::TableId).string())
                    .col(
                        ColumnDef::new(Reservations::ReservationTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Reservations::DurationMinutes)
                            .integer()
                            .not_null()
                            .default(120),
                    )
                    .col(
                        ColumnDef::new(Reservations::EndTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Reservations::PartySize)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Reservations::Status)
                            .string()
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(
                        ColumnDef::new(Reservations::CustomerName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Reservations::CustomerPhone).string())
                    .col(ColumnDef::new(Reservations::CustomerEmail).string())
                    .col(ColumnDef::new(Reservations::SpecialRequests).string())
                    .col(
                        ColumnDef::new(Reservations::RemindersEnabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Reservations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Reservations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Reservations::ConfirmationDeadline)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Reservations::ConfirmedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Reservations::CancelledAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Reservations::CompletedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Reservations::CancellationReason).string())
                    .col(
                        ColumnDef::new(Reservations::Version)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_user")
                    .table(Reservations::Table)
                    .col(Reservations::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_restaurant")
                    .table(Reservations::Table)
                    .col(Reservations::RestaurantId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_status")
                    .table(Reservations::Table)
                    .col(Reservations::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_time")
                    .table(Reservations::Table)
                    .col(Reservations::ReservationTime)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reservations::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Reservations {
    Table,
    Id,
    UserId,
    RestaurantId,
    TableId,
    ReservationTime,
    DurationMinutes,
    EndTime,
    PartySize,
    Status,
    CustomerName,
    CustomerPhone,
    CustomerEmail,
    SpecialRequests,
    RemindersEnabled,
    CreatedAt,
    UpdatedAt,
    ConfirmationDeadline,
    ConfirmedAt,
    CancelledAt,
    CompletedAt,
    CancellationReason,
    Version,
}
