use sea_orm::*;
use uuid::Uuid;

use crate::models::milestones::{self, CreateMilestone, UpdateMilestone};

pub async fn insert_milestone(
    db: &DatabaseConnection,
    contract_id: Uuid,
    input: CreateMilestone,
) -> Result<milestones::Model, DbErr> {
    let new_milestone = milestones::ActiveModel {
        id: Set(Uuid::new_v4()),
        contract_id: Set(contract_id),
        title: Set(input.title),
        description: Set(input.description),
        due_date: Set(input.due_date),
        amount: Set(input.amount),
        is_complete: Set(false),
        created_at: Set(chrono::Utc::now()),
        updated_at: Set(None),
    };

    new_milestone.insert(db).await
}

/// Milestones of a contract ordered by due date.
pub async fn get_milestones_by_contract(
    db: &DatabaseConnection,
    contract_id: Uuid,
) -> Result<Vec<milestones::Model>, DbErr> {
    milestones::Entity::find()
        .filter(milestones::Column::ContractId.eq(contract_id))
        .order_by_asc(milestones::Column::DueDate)
        .order_by_asc(milestones::Column::CreatedAt)
        .all(db)
        .await
}

/// Fetch a milestone only if it belongs to the given contract.
pub async fn get_milestone_in_contract(
    db: &DatabaseConnection,
    contract_id: Uuid,
    milestone_id: Uuid,
) -> Result<Option<milestones::Model>, DbErr> {
    milestones::Entity::find_by_id(milestone_id)
        .filter(milestones::Column::ContractId.eq(contract_id))
        .one(db)
        .await
}

/// Apply only the supplied fields.
pub async fn update_milestone(
    db: &DatabaseConnection,
    milestone: milestones::Model,
    input: UpdateMilestone,
) -> Result<milestones::Model, DbErr> {
    let mut active: milestones::ActiveModel = milestone.into();

    if let Some(title) = input.title {
        active.title = Set(title);
    }
    if let Some(description) = input.description {
        active.description = Set(description);
    }
    if let Some(due_date) = input.due_date {
        active.due_date = Set(due_date);
    }
    if let Some(amount) = input.amount {
        active.amount = Set(amount);
    }
    if let Some(is_complete) = input.is_complete {
        active.is_complete = Set(is_complete);
    }
    active.updated_at = Set(Some(chrono::Utc::now()));

    active.update(db).await
}

pub async fn delete_milestone(db: &DatabaseConnection, id: Uuid) -> Result<DeleteResult, DbErr> {
    milestones::Entity::delete_by_id(id).exec(db).await
}
