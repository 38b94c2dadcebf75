use sea_orm::DatabaseConnection;
use uuid::Uuid;
use validator::Validate;

use crate::auth::authorization::verify_contract_party;
use crate::db::reviews as review_db;
use crate::error::AppError;
use crate::models::contracts::ContractStatus;
use crate::models::reviews::{self, CreateReview, UserReviews};
use crate::models::users;

/// Review the other party of a completed contract. One review per reviewer
/// per contract.
pub async fn create_review(
    db: &DatabaseConnection,
    acting: &users::Model,
    input: CreateReview,
) -> Result<reviews::Model, AppError> {
    input.validate()?;

    let contract = verify_contract_party(db, input.contract_id, acting.id).await?;
    if contract.status != ContractStatus::Completed {
        return Err(AppError::InvalidState(
            "Reviews can only be left on completed contracts".to_string(),
        ));
    }

    if review_db::review_exists(db, contract.id, acting.id).await? {
        return Err(AppError::Conflict(
            "You have already reviewed this contract".to_string(),
        ));
    }

    let reviewee_id = contract
        .counterpart_of(acting.id)
        .ok_or_else(|| AppError::Authorization("You are not a party to this contract".to_string()))?;

    let review = review_db::insert_review(
        db,
        contract.id,
        acting.id,
        reviewee_id,
        input.rating,
        input.comment,
    )
    .await?;

    tracing::info!(review_id = %review.id, contract_id = %contract.id, "review left");
    Ok(review)
}

pub fn average_rating(reviews: &[reviews::Model]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let sum: i64 = reviews.iter().map(|r| i64::from(r.rating)).sum();
    Some(sum as f64 / reviews.len() as f64)
}

pub async fn reviews_for_user(db: &DatabaseConnection, user_id: Uuid) -> Result<UserReviews, AppError> {
    let reviews = review_db::get_reviews_for_user(db, user_id).await?;
    Ok(UserReviews {
        count: reviews.len(),
        average_rating: average_rating(&reviews),
        reviews,
    })
}

pub async fn delete_review(
    db: &DatabaseConnection,
    acting: &users::Model,
    id: Uuid,
) -> Result<(), AppError> {
    let review = review_db::get_review_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Review {id} not found")))?;

    if review.reviewer_id != acting.id {
        return Err(AppError::Authorization(
            "You can only delete your own reviews".to_string(),
        ));
    }

    review_db::delete_review(db, id).await?;
    tracing::info!(review_id = %id, "review deleted");
    Ok(())
}
