use sea_orm::*;
use uuid::Uuid;

use crate::models::reviews;

pub async fn insert_review(
    db: &DatabaseConnection,
    contract_id: Uuid,
    reviewer_id: Uuid,
    reviewee_id: Uuid,
    rating: i32,
    comment: Option<String>,
) -> Result<reviews::Model, DbErr> {
    let new_review = reviews::ActiveModel {
        id: Set(Uuid::new_v4()),
        contract_id: Set(contract_id),
        reviewer_id: Set(reviewer_id),
        reviewee_id: Set(reviewee_id),
        rating: Set(rating),
        comment: Set(comment),
        created_at: Set(chrono::Utc::now()),
    };

    new_review.insert(db).await
}

pub async fn review_exists(
    db: &DatabaseConnection,
    contract_id: Uuid,
    reviewer_id: Uuid,
) -> Result<bool, DbErr> {
    let count = reviews::Entity::find()
        .filter(reviews::Column::ContractId.eq(contract_id))
        .filter(reviews::Column::ReviewerId.eq(reviewer_id))
        .count(db)
        .await?;

    Ok(count > 0)
}

/// Reviews received by a user, newest first.
pub async fn get_reviews_for_user(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Vec<reviews::Model>, DbErr> {
    reviews::Entity::find()
        .filter(reviews::Column::RevieweeId.eq(user_id))
        .order_by_desc(reviews::Column::CreatedAt)
        .all(db)
        .await
}

pub async fn get_review_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<reviews::Model>, DbErr> {
    reviews::Entity::find_by_id(id).one(db).await
}

pub async fn delete_review(db: &DatabaseConnection, id: Uuid) -> Result<DeleteResult, DbErr> {
    reviews::Entity::delete_by_id(id).exec(db).await
}
