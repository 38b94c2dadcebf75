use sea_orm::*;
use uuid::Uuid;

use crate::models::contracts::{self, ContractStatus, CreateContract};
use crate::models::milestones;

/// Insert a new contract. Contracts start active.
pub async fn insert_contract(
    db: &DatabaseConnection,
    input: CreateContract,
    client_id: Uuid,
) -> Result<contracts::Model, DbErr> {
    let new_contract = contracts::ActiveModel {
        id: Set(Uuid::new_v4()),
        job_id: Set(input.job_id),
        client_id: Set(client_id),
        freelancer_id: Set(input.freelancer_id),
        terms: Set(input.terms),
        start_date: Set(input.start_date),
        end_date: Set(input.end_date),
        status: Set(ContractStatus::Active),
        approved_at: Set(None),
        created_at: Set(chrono::Utc::now()),
        updated_at: Set(None),
    };

    new_contract.insert(db).await
}

/// Fetch a single contract by ID.
pub async fn get_contract_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<contracts::Model>, DbErr> {
    contracts::Entity::find_by_id(id).one(db).await
}

/// Check whether a contract already exists for this job and freelancer.
pub async fn contract_exists_for_job_and_freelancer(
    db: &DatabaseConnection,
    job_id: Uuid,
    freelancer_id: Uuid,
) -> Result<bool, DbErr> {
    let count = contracts::Entity::find()
        .filter(contracts::Column::JobId.eq(job_id))
        .filter(contracts::Column::FreelancerId.eq(freelancer_id))
        .count(db)
        .await?;

    Ok(count > 0)
}

/// Contracts where the user is either side, newest first.
pub async fn get_contracts_for_user(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Vec<contracts::Model>, DbErr> {
    contracts::Entity::find()
        .filter(
            Condition::any()
                .add(contracts::Column::ClientId.eq(user_id))
                .add(contracts::Column::FreelancerId.eq(user_id)),
        )
        .order_by_desc(contracts::Column::CreatedAt)
        .all(db)
        .await
}

pub async fn update_contract_status(
    db: &DatabaseConnection,
    contract: contracts::Model,
    status: ContractStatus,
) -> Result<contracts::Model, DbErr> {
    let mut active: contracts::ActiveModel = contract.into();
    active.status = Set(status);
    active.updated_at = Set(Some(chrono::Utc::now()));
    active.update(db).await
}

/// Record the freelancer's approval. The first timestamp is kept.
pub async fn mark_approved(
    db: &DatabaseConnection,
    contract: contracts::Model,
) -> Result<contracts::Model, DbErr> {
    if contract.approved_at.is_some() {
        return Ok(contract);
    }
    let now = chrono::Utc::now();
    let mut active: contracts::ActiveModel = contract.into();
    active.approved_at = Set(Some(now));
    active.updated_at = Set(Some(now));
    active.update(db).await
}

/// Delete a contract together with the milestones it owns, atomically.
pub async fn delete_contract_with_milestones(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<DeleteResult, DbErr> {
    let txn = db.begin().await?;

    milestones::Entity::delete_many()
        .filter(milestones::Column::ContractId.eq(id))
        .exec(&txn)
        .await?;
    let result = contracts::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    Ok(result)
}

pub async fn count_contracts(db: &DatabaseConnection) -> Result<u64, DbErr> {
    contracts::Entity::find().count(db).await
}
