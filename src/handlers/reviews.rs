use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::error::AppError;
use crate::models::reviews::CreateReview;
use crate::services::reviews as review_service;

/// POST /api/reviews
pub async fn create_review(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    body: web::Json<CreateReview>,
) -> Result<HttpResponse, AppError> {
    let review = review_service::create_review(db.get_ref(), &user.0, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(review))
}

/// GET /api/reviews/user/{user_id}: reviews received, with the average rating.
pub async fn get_user_reviews(
    _user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let reviews = review_service::reviews_for_user(db.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(reviews))
}

/// DELETE /api/reviews/{id}: author only.
pub async fn delete_review(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    review_service::delete_review(db.get_ref(), &user.0, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
