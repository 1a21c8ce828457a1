use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Gig catalog CRUD lives in a separate service; checkout only reads
        // seller and price from here. Price is nullable: a gig without a price
        // is purchasable for free.
        manager
            .create_table(
                Table::create()
                    .table(Gigs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Gigs::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Gigs::SellerId).uuid().not_null())
                    .col(ColumnDef::new(Gigs::Title).string().not_null())
                    .col(ColumnDef::new(Gigs::Description).string().null())
                    .col(ColumnDef::new(Gigs::Price).decimal().null())
                    .col(ColumnDef::new(Gigs::Category).string().null())
                    .col(ColumnDef::new(Gigs::DeliveryDays).integer().null())
                    .col(
                        ColumnDef::new(Gigs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Gigs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_gigs_seller_id")
                    .table(Gigs::Table)
                    .col(Gigs::SellerId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Gigs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Gigs {
    Table,
    Id,
    SellerId,
    Title,
    Description,
    Price,
    Category,
    DeliveryDays,
    CreatedAt,
    UpdatedAt,
}
