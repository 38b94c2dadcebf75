use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::error::AppError;
use crate::models::PaginationQuery;
use crate::models::disputes::{CreateDispute, UpdateDispute};
use crate::services::disputes as dispute_service;

/// POST /api/disputes: a contract party raises a dispute.
pub async fn create_dispute(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    body: web::Json<CreateDispute>,
) -> Result<HttpResponse, AppError> {
    let dispute = dispute_service::create_dispute(db.get_ref(), &user.0, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(dispute))
}

/// GET /api/disputes/mine
pub async fn my_disputes(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let disputes = dispute_service::my_disputes(db.get_ref(), &user.0).await?;
    Ok(HttpResponse::Ok().json(disputes))
}

/// GET /api/disputes: admin only.
pub async fn get_disputes(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    query: web::Query<PaginationQuery>,
) -> Result<HttpResponse, AppError> {
    let disputes = dispute_service::list_all(db.get_ref(), &user.0, &query).await?;
    Ok(HttpResponse::Ok().json(disputes))
}

/// GET /api/disputes/{id}
pub async fn get_dispute(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let dispute = dispute_service::get_dispute(db.get_ref(), &user.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(dispute))
}

/// PATCH /api/disputes/{id}: admin only.
pub async fn update_dispute(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateDispute>,
) -> Result<HttpResponse, AppError> {
    let dispute = dispute_service::update_dispute(
        db.get_ref(),
        &user.0,
        path.into_inner(),
        body.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(dispute))
}
