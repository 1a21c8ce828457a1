pub use sea_orm_migration::prelude::*;

mod m20240315_000001_create_users_table;
mod m20240315_000002_create_gigs_table;
mod m20240315_000003_create_orders_table;
mod m20240722_000004_add_order_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240315_000001_create_users_table::Migration),
            Box::new(m20240315_000002_create_gigs_table::Migration),
            Box::new(m20240315_000003_create_orders_table::Migration),
            Box::new(m20240722_000004_add_order_indexes::Migration),
        ]
    }
}
