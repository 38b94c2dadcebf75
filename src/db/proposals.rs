use sea_orm::prelude::Expr;
use sea_orm::*;
use uuid::Uuid;

use crate::models::proposals::{self, ProposalStatus, SubmitProposal};

/// Insert a pending proposal. The `(job_id, freelancer_id)` unique index
/// rejects a second proposal for the same pair.
pub async fn insert_proposal(
    db: &DatabaseConnection,
    job_id: Uuid,
    freelancer_id: Uuid,
    input: SubmitProposal,
) -> Result<proposals::Model, DbErr> {
    let new_proposal = proposals::ActiveModel {
        id: Set(Uuid::new_v4()),
        job_id: Set(job_id),
        freelancer_id: Set(freelancer_id),
        cover_letter: Set(input.cover_letter),
        expected_rate: Set(input.expected_rate),
        estimated_time: Set(input.estimated_time),
        status: Set(ProposalStatus::Pending),
        created_at: Set(chrono::Utc::now()),
    };

    new_proposal.insert(db).await
}

pub async fn get_proposal_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<proposals::Model>, DbErr> {
    proposals::Entity::find_by_id(id).one(db).await
}

pub async fn find_by_job_and_freelancer(
    db: &DatabaseConnection,
    job_id: Uuid,
    freelancer_id: Uuid,
) -> Result<Option<proposals::Model>, DbErr> {
    proposals::Entity::find()
        .filter(proposals::Column::JobId.eq(job_id))
        .filter(proposals::Column::FreelancerId.eq(freelancer_id))
        .one(db)
        .await
}

/// Check whether the freelancer holds an accepted proposal on the job.
pub async fn has_accepted_proposal(
    db: &DatabaseConnection,
    job_id: Uuid,
    freelancer_id: Uuid,
) -> Result<bool, DbErr> {
    let count = proposals::Entity::find()
        .filter(proposals::Column::JobId.eq(job_id))
        .filter(proposals::Column::FreelancerId.eq(freelancer_id))
        .filter(proposals::Column::Status.eq(ProposalStatus::Accepted))
        .count(db)
        .await?;

    Ok(count > 0)
}

pub async fn get_proposals_by_job(
    db: &DatabaseConnection,
    job_id: Uuid,
) -> Result<Vec<proposals::Model>, DbErr> {
    proposals::Entity::find()
        .filter(proposals::Column::JobId.eq(job_id))
        .order_by_desc(proposals::Column::CreatedAt)
        .all(db)
        .await
}

pub async fn get_proposals_by_freelancer(
    db: &DatabaseConnection,
    freelancer_id: Uuid,
) -> Result<Vec<proposals::Model>, DbErr> {
    proposals::Entity::find()
        .filter(proposals::Column::FreelancerId.eq(freelancer_id))
        .order_by_desc(proposals::Column::CreatedAt)
        .all(db)
        .await
}

/// Move a proposal out of `pending`. Returns `None` if it was no longer pending,
/// so two concurrent responses cannot both succeed.
pub async fn respond_if_pending(
    db: &DatabaseConnection,
    id: Uuid,
    status: ProposalStatus,
) -> Result<Option<proposals::Model>, DbErr> {
    let result = proposals::Entity::update_many()
        .col_expr(proposals::Column::Status, Expr::value(status))
        .filter(proposals::Column::Id.eq(id))
        .filter(proposals::Column::Status.eq(ProposalStatus::Pending))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Ok(None);
    }
    proposals::Entity::find_by_id(id).one(db).await
}

pub async fn delete_proposal(db: &DatabaseConnection, id: Uuid) -> Result<DeleteResult, DbErr> {
    proposals::Entity::delete_by_id(id).exec(db).await
}
