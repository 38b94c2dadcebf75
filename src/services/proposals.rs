use sea_orm::DatabaseConnection;
use uuid::Uuid;
use validator::Validate;

use crate::auth::authorization::require_role;
use crate::db::jobs as job_db;
use crate::db::proposals as proposal_db;
use crate::error::AppError;
use crate::models::jobs::JobStatus;
use crate::models::notifications::NewNotification;
use crate::models::proposals::{self, ProposalStatus, RespondToProposal, SubmitProposal};
use crate::models::users::{self, Roles};
use crate::realtime::EventHub;
use crate::services::notifications::notify;

pub async fn submit_proposal(
    db: &DatabaseConnection,
    hub: &EventHub,
    acting: &users::Model,
    job_id: Uuid,
    input: SubmitProposal,
) -> Result<proposals::Model, AppError> {
    require_role(acting, Roles::Freelancer)?;
    input.validate()?;

    let job = job_db::get_job_by_id(db, job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

    if job.status != JobStatus::Open {
        return Err(AppError::InvalidState(
            "Proposals can only be submitted to open jobs".to_string(),
        ));
    }

    if proposal_db::find_by_job_and_freelancer(db, job_id, acting.id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "You have already submitted a proposal for this job".to_string(),
        ));
    }

    let proposal = proposal_db::insert_proposal(db, job_id, acting.id, input).await?;
    tracing::info!(proposal_id = %proposal.id, job_id = %job_id, "proposal submitted");

    notify(
        db,
        hub,
        NewNotification::info(
            job.client_id,
            format!("New proposal from {} on \"{}\"", acting.name, job.title),
            Some(format!("/jobs/{job_id}/proposals")),
        ),
    )
    .await;

    Ok(proposal)
}

/// Accept or reject a pending proposal. Only the job owner may respond, and
/// only once.
pub async fn respond_to_proposal(
    db: &DatabaseConnection,
    hub: &EventHub,
    acting: &users::Model,
    proposal_id: Uuid,
    input: RespondToProposal,
) -> Result<proposals::Model, AppError> {
    if input.status == ProposalStatus::Pending {
        return Err(AppError::Validation(
            "Status must be accepted or rejected".to_string(),
        ));
    }

    let proposal = proposal_db::get_proposal_by_id(db, proposal_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Proposal {proposal_id} not found")))?;

    let job = job_db::get_job_by_id(db, proposal.job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found", proposal.job_id)))?;

    if job.client_id != acting.id {
        return Err(AppError::Authorization(
            "Only the job owner can respond to proposals".to_string(),
        ));
    }

    let updated = proposal_db::respond_if_pending(db, proposal_id, input.status)
        .await?
        .ok_or_else(|| {
            AppError::InvalidState("This proposal has already been answered".to_string())
        })?;

    tracing::info!(proposal_id = %proposal_id, status = ?input.status, "proposal answered");

    let link = Some("/proposals/mine".to_string());
    let notification = match input.status {
        ProposalStatus::Accepted => NewNotification::success(
            updated.freelancer_id,
            format!("Your proposal for \"{}\" was accepted", job.title),
            link,
        ),
        _ => NewNotification::info(
            updated.freelancer_id,
            format!("Your proposal for \"{}\" was rejected", job.title),
            link,
        ),
    };
    notify(db, hub, notification).await;

    Ok(updated)
}

pub async fn get_job_proposals(
    db: &DatabaseConnection,
    acting: &users::Model,
    job_id: Uuid,
) -> Result<Vec<proposals::Model>, AppError> {
    let job = job_db::get_job_by_id(db, job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

    if job.client_id != acting.id {
        return Err(AppError::Authorization(
            "Only the job owner can view its proposals".to_string(),
        ));
    }

    Ok(proposal_db::get_proposals_by_job(db, job_id).await?)
}

pub async fn get_my_proposals(
    db: &DatabaseConnection,
    acting: &users::Model,
) -> Result<Vec<proposals::Model>, AppError> {
    require_role(acting, Roles::Freelancer)?;
    Ok(proposal_db::get_proposals_by_freelancer(db, acting.id).await?)
}

/// Withdraw a proposal that has not been answered yet.
pub async fn delete_proposal(
    db: &DatabaseConnection,
    acting: &users::Model,
    proposal_id: Uuid,
) -> Result<(), AppError> {
    let proposal = proposal_db::get_proposal_by_id(db, proposal_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Proposal {proposal_id} not found")))?;

    if proposal.freelancer_id != acting.id {
        return Err(AppError::Authorization(
            "You can only withdraw your own proposals".to_string(),
        ));
    }
    if proposal.status != ProposalStatus::Pending {
        return Err(AppError::InvalidState(
            "Only pending proposals can be withdrawn".to_string(),
        ));
    }

    proposal_db::delete_proposal(db, proposal_id).await?;
    tracing::info!(proposal_id = %proposal_id, "proposal withdrawn");
    Ok(())
}
