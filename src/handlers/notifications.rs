use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::error::AppError;
use crate::models::PaginationQuery;
use crate::services::notifications as notification_service;

/// GET /api/notifications?page=1&limit=20
pub async fn get_notifications(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    query: web::Query<PaginationQuery>,
) -> Result<HttpResponse, AppError> {
    let notifications = notification_service::list(db.get_ref(), user.0.id, &query).await?;
    Ok(HttpResponse::Ok().json(notifications))
}

/// PATCH /api/notifications/{id}/read
pub async fn mark_read(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    notification_service::mark_read(db.get_ref(), user.0.id, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// PATCH /api/notifications/read-all
pub async fn mark_all_read(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let updated = notification_service::mark_all_read(db.get_ref(), user.0.id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "updated": updated })))
}
