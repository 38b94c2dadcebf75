pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_users_table;
mod m20250301_000002_create_jobs_table;
mod m20250301_000003_create_proposals_table;
mod m20250301_000004_create_contracts_table;
mod m20250301_000005_create_milestones_table;
mod m20250301_000006_create_invoices_tables;
mod m20250301_000007_create_transactions_table;
mod m20250301_000008_create_disputes_table;
mod m20250301_000009_create_messages_table;
mod m20250301_000010_create_notifications_table;
mod m20250301_000011_create_reviews_table;
mod m20250301_000012_add_lookup_indexes;
mod m20250301_000013_add_account_recovery_columns;
mod m20250301_000014_create_organizations_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_users_table::Migration),
            Box::new(m20250301_000002_create_jobs_table::Migration),
            Box::new(m20250301_000003_create_proposals_table::Migration),
            Box::new(m20250301_000004_create_contracts_table::Migration),
            Box::new(m20250301_000005_create_milestones_table::Migration),
            Box::new(m20250301_000006_create_invoices_tables::Migration),
            Box::new(m20250301_000007_create_transactions_table::Migration),
            Box::new(m20250301_000008_create_disputes_table::Migration),
            Box::new(m20250301_000009_create_messages_table::Migration),
            Box::new(m20250301_000010_create_notifications_table::Migration),
            Box::new(m20250301_000011_create_reviews_table::Migration),
            Box::new(m20250301_000012_add_lookup_indexes::Migration),
            Box::new(m20250301_000013_add_account_recovery_columns::Migration),
            Box::new(m20250301_000014_create_organizations_tables::Migration),
        ]
    }
}
