//! Create reservation_menu_items table
//!
//! Priced menu snapshots attached to a reservation; cascade with it.

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
                    .table(ReservationMenuItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReservationMenuItems::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ReservationMenuItems::ReservationId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReservationMenuItems::MenuItemId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReservationMenuItems::Quantity)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(ReservationMenuItems::SpecialInstructions).string())
                    .col(
                        ColumnDef::new(ReservationMenuItems::PriceCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReservationMenuItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReservationMenuItems::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservation_menu_items_reservation")
                            .from(
                                ReservationMenuItems::Table,
                                ReservationMenuItems::ReservationId,
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
                    .name("idx_reservation_menu_items_reservation")
                    .table(ReservationMenuItems::Table)
                    .col(ReservationMenuItems::ReservationId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReservationMenuItems::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ReservationMenuItems {
    Table,
    Id,
    ReservationId,
    MenuItemId,
    Quantity,
    SpecialInstructions,
    PriceCents,
    CreatedAt,
    UpdatedAt,
}
