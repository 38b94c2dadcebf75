pub mod contracts;
pub mod disputes;
pub mod invoices;
pub mod jobs;
pub mod messages;
pub mod milestones;
pub mod notifications;
pub mod organizations;
pub mod proposals;
pub mod reviews;
pub mod stats;
pub mod transactions;
pub mod users;

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::time::Duration;

/// Create a SeaORM connection pool and bring the schema up to date.
pub async fn create_pool(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(20)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}
