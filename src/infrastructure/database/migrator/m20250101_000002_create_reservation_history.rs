//! Create reservation_history table
//!
//! Append-only audit log, one row per status-changing operation.

use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_reservations::Reservations;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReservationHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReservationHistory::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ReservationHistory::ReservationId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReservationHistory::Action)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReservationHistory::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReservationHistory::Details)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(ReservationHistory::PerformedBy)
                            .string()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservation_history_reservation")
                            .from(
                                ReservationHistory::Table,
                                ReservationHistory::ReservationId,
                            )
                            .to(Reservations::Table, Reservations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservation_history_reservation")
                    .table(ReservationHistory::Table)
                    .col(ReservationHistory::ReservationId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReservationHistory::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ReservationHistory {
    Table,
    Id,
    ReservationId,
    Action,
    Timestamp,
    Details,
    PerformedBy,
}
