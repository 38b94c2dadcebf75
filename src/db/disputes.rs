use sea_orm::*;
use uuid::Uuid;

use crate::models::disputes::{self, CreateDispute, DisputeStatus, UpdateDispute};

pub async fn insert_dispute(
    db: &DatabaseConnection,
    input: CreateDispute,
    raised_by: Uuid,
) -> Result<disputes::Model, DbErr> {
    let new_dispute = disputes::ActiveModel {
        id: Set(Uuid::new_v4()),
        contract_id: Set(input.contract_id),
        milestone_id: Set(input.milestone_id),
        raised_by: Set(raised_by),
        reason: Set(input.reason),
        description: Set(input.description),
        resolution: Set(None),
        status: Set(DisputeStatus::Open),
        created_at: Set(chrono::Utc::now()),
        updated_at: Set(None),
    };

    new_dispute.insert(db).await
}

pub async fn get_dispute_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<disputes::Model>, DbErr> {
    disputes::Entity::find_by_id(id).one(db).await
}

pub async fn get_disputes_raised_by(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Vec<disputes::Model>, DbErr> {
    disputes::Entity::find()
        .filter(disputes::Column::RaisedBy.eq(user_id))
        .order_by_desc(disputes::Column::CreatedAt)
        .all(db)
        .await
}

pub async fn get_all_disputes(
    db: &DatabaseConnection,
    page: u64,
    limit: u64,
) -> Result<Vec<disputes::Model>, DbErr> {
    disputes::Entity::find()
        .order_by_desc(disputes::Column::CreatedAt)
        .paginate(db, limit)
        .fetch_page(page - 1)
        .await
}

/// Apply the supplied status and/or resolution.
pub async fn update_dispute(
    db: &DatabaseConnection,
    dispute: disputes::Model,
    input: UpdateDispute,
) -> Result<disputes::Model, DbErr> {
    let mut active: disputes::ActiveModel = dispute.into();

    if let Some(status) = input.status {
        active.status = Set(status);
    }
    if let Some(resolution) = input.resolution {
        active.resolution = Set(Some(resolution));
    }
    active.updated_at = Set(Some(chrono::Utc::now()));

    active.update(db).await
}
