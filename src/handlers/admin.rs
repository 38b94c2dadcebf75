use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;

use crate::auth::authorization::require_role;
use crate::auth::middleware::AuthenticatedUser;
use crate::cache::{CacheConfig, CacheData, keys};
use crate::error::AppError;
use crate::models::users::Roles;
use crate::services::admin::{self as admin_service, AdminStats};

/// GET /api/admin/stats: cached dashboard figures.
pub async fn get_stats(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    cache: web::Data<CacheData>,
    cache_config: web::Data<CacheConfig>,
) -> Result<HttpResponse, AppError> {
    require_role(&user.0, Roles::Admin)?;

    let stats: AdminStats = cache
        .get_or_load(&keys::admin_stats(), cache_config.stats_ttl, || {
            admin_service::dashboard_stats(db.get_ref(), &user.0)
        })
        .await?;
    Ok(HttpResponse::Ok().json(stats))
}
