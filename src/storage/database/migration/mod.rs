use sea_orm_migration::prelude::*;

mod m20240301_000001_create_webhooks_table;
mod m20240301_000002_create_webhook_deliveries_table;
mod m20240315_000003_add_webhook_filters;

/// Database migrator for SeaORM
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_webhooks_table::Migration),
            Box::new(m20240301_000002_create_webhook_deliveries_table::Migration),
            Box::new(m20240315_000003_add_webhook_filters::Migration),
        ]
    }
}
