use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::cache::{CacheConfig, CacheData, keys};
use crate::error::AppError;
use crate::models::PaginationQuery;
use crate::models::users::{UpdateUser, UserResponse};
use crate::services::users as user_service;

/// GET /api/users?page=1&limit=20: admin only.
pub async fn get_users(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    query: web::Query<PaginationQuery>,
) -> Result<HttpResponse, AppError> {
    let users = user_service::list_users(db.get_ref(), &user.0, &query).await?;
    Ok(HttpResponse::Ok().json(users))
}

/// GET /api/users/{id}
pub async fn get_user(
    _user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    cache: web::Data<CacheData>,
    cache_config: web::Data<CacheConfig>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let profile: UserResponse = cache
        .get_or_load(&keys::user(id), cache_config.user_ttl, || {
            user_service::get_user(db.get_ref(), id)
        })
        .await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// PUT /api/users/{id}: users may only update themselves.
pub async fn update_user(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    cache: web::Data<CacheData>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateUser>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let updated = user_service::update_user(db.get_ref(), &user.0, id, body.into_inner()).await?;

    cache.invalidate(&keys::user(id)).await;
    Ok(HttpResponse::Ok().json(updated))
}
