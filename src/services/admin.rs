use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use crate::auth::authorization::require_role;
use crate::db::{contracts as contract_db, jobs as job_db, stats, transactions as transaction_db};
use crate::error::AppError;
use crate::models::users::{self, Roles};

/// Dashboard figures for admins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminStats {
    pub total_users: u64,
    pub clients: u64,
    pub freelancers: u64,
    pub admins: u64,
    pub total_jobs: u64,
    pub total_contracts: u64,
    pub revenue: f64,
}

pub async fn dashboard_stats(
    db: &DatabaseConnection,
    acting: &users::Model,
) -> Result<AdminStats, AppError> {
    require_role(acting, Roles::Admin)?;
    collect_stats(db).await
}

pub async fn collect_stats(db: &DatabaseConnection) -> Result<AdminStats, AppError> {
    Ok(AdminStats {
        total_users: stats::count_users(db).await?,
        clients: stats::count_users_with_role(db, Roles::Client).await?,
        freelancers: stats::count_users_with_role(db, Roles::Freelancer).await?,
        admins: stats::count_users_with_role(db, Roles::Admin).await?,
        total_jobs: job_db::count_jobs(db).await?,
        total_contracts: contract_db::count_contracts(db).await?,
        revenue: transaction_db::total_revenue(db).await?,
    })
}
