use sea_orm_migration::prelude::*;

use crate::m20240315_000003_create_orders_table::Orders;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Party-scoped listings are always newest-first
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_buyer_created")
                    .table(Orders::Table)
                    .col(Orders::BuyerId)
                    .col((Orders::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_seller_created")
                    .table(Orders::Table)
                    .col(Orders::SellerId)
                    .col((Orders::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        // The legacy by-gig operations select the most recent active order
        // for a gig/seller pair
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_gig_created")
                    .table(Orders::Table)
                    .col(Orders::GigId)
                    .col((Orders::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_orders_buyer_created")
                    .table(Orders::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_orders_seller_created")
                    .table(Orders::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_orders_gig_created")
                    .table(Orders::Table)
                    .to_owned(),
            )
            .await
    }
}
