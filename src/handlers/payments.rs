use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::error::AppError;
use crate::services::payments as payment_service;

/// GET /api/payments: recorded payments made by the caller.
pub async fn get_payments(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let payments = payment_service::my_payments(db.get_ref(), &user.0).await?;
    Ok(HttpResponse::Ok().json(payments))
}

/// GET /api/payments/{id}
pub async fn get_payment(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let payment = payment_service::get_payment(db.get_ref(), &user.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(payment))
}
