use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use crate::auth::authorization::{is_admin, verify_contract_party};
use crate::db::contracts as contract_db;
use crate::db::jobs as job_db;
use crate::db::milestones as milestone_db;
use crate::db::proposals as proposal_db;
use crate::db::users as user_db;
use crate::error::AppError;
use crate::models::contracts::{
    self, ContractDetail, ContractStatus, ContractSummary, Counterpart, CreateContract,
    UpdateContractStatus,
};
use crate::models::milestones::{self, CreateMilestone, UpdateMilestone};
use crate::models::users;

async fn load_contract(db: &DatabaseConnection, id: Uuid) -> Result<contracts::Model, AppError> {
    contract_db::get_contract_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Contract {id} not found")))
}

/// Load a contract and require the acting user to be its freelancer.
async fn load_as_freelancer(
    db: &DatabaseConnection,
    acting: &users::Model,
    id: Uuid,
) -> Result<contracts::Model, AppError> {
    let contract = load_contract(db, id).await?;
    if contract.freelancer_id != acting.id {
        return Err(AppError::Authorization(
            "Only the contracted freelancer can do this".to_string(),
        ));
    }
    Ok(contract)
}

async fn load_as_client(
    db: &DatabaseConnection,
    acting: &users::Model,
    id: Uuid,
) -> Result<contracts::Model, AppError> {
    let contract = load_contract(db, id).await?;
    if contract.client_id != acting.id {
        return Err(AppError::Authorization(
            "Only the contract's client can do this".to_string(),
        ));
    }
    Ok(contract)
}

/// Create a contract from an accepted proposal. Contracts start active.
pub async fn create_contract(
    db: &DatabaseConnection,
    acting: &users::Model,
    input: CreateContract,
) -> Result<contracts::Model, AppError> {
    input.validate()?;

    let job = job_db::get_job_by_id(db, input.job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found", input.job_id)))?;

    if job.client_id != acting.id {
        return Err(AppError::Authorization(
            "Only the job's client can create a contract for it".to_string(),
        ));
    }

    if !proposal_db::has_accepted_proposal(db, input.job_id, input.freelancer_id).await? {
        return Err(AppError::Validation(
            "The freelancer has no accepted proposal for this job".to_string(),
        ));
    }

    if contract_db::contract_exists_for_job_and_freelancer(db, input.job_id, input.freelancer_id)
        .await?
    {
        return Err(AppError::Conflict(
            "A contract already exists for this job and freelancer".to_string(),
        ));
    }

    if input.end_date < input.start_date {
        return Err(AppError::Validation(
            "End date cannot be before start date".to_string(),
        ));
    }

    // The unique index on (job_id, freelancer_id) settles concurrent creates.
    let contract = contract_db::insert_contract(db, input, acting.id).await?;
    tracing::info!(contract_id = %contract.id, job_id = %contract.job_id, "contract created");
    Ok(contract)
}

/// The freelancer confirms an active contract. The first approval time is kept.
pub async fn approve_contract(
    db: &DatabaseConnection,
    acting: &users::Model,
    id: Uuid,
) -> Result<contracts::Model, AppError> {
    let contract = load_as_freelancer(db, acting, id).await?;
    if contract.status != ContractStatus::Active {
        return Err(AppError::InvalidState(format!(
            "Only active contracts can be approved (current status: {:?})",
            contract.status
        )));
    }

    let approved = contract_db::mark_approved(db, contract).await?;
    tracing::info!(contract_id = %id, "contract approved by freelancer");
    Ok(approved)
}

/// The freelancer declines an active contract, cancelling it.
pub async fn reject_contract(
    db: &DatabaseConnection,
    acting: &users::Model,
    id: Uuid,
) -> Result<contracts::Model, AppError> {
    let contract = load_as_freelancer(db, acting, id).await?;
    if contract.status != ContractStatus::Active {
        return Err(AppError::InvalidState(format!(
            "Only active contracts can be rejected (current status: {:?})",
            contract.status
        )));
    }

    let cancelled = contract_db::update_contract_status(db, contract, ContractStatus::Cancelled).await?;
    tracing::info!(contract_id = %id, "contract rejected by freelancer");
    Ok(cancelled)
}

/// Either party moves the contract to paused, completed or cancelled.
///
/// The current status is not checked: a completed or cancelled contract can
/// still be overwritten with another of these three statuses. `active` is
/// never accepted here.
pub async fn update_status(
    db: &DatabaseConnection,
    acting: &users::Model,
    id: Uuid,
    input: UpdateContractStatus,
) -> Result<contracts::Model, AppError> {
    let contract = verify_contract_party(db, id, acting.id).await?;

    if input.status == ContractStatus::Active {
        return Err(AppError::Validation(
            "Status must be one of paused, completed, cancelled".to_string(),
        ));
    }

    if contract.status.is_terminal() {
        tracing::warn!(
            contract_id = %id,
            from = ?contract.status,
            to = ?input.status,
            "overwriting terminal contract status"
        );
    }

    let updated = contract_db::update_contract_status(db, contract, input.status).await?;
    tracing::info!(contract_id = %id, status = ?input.status, "contract status updated");
    Ok(updated)
}

/// Contracts the user is a party to, newest first, with job title and the
/// other party's name and email.
pub async fn get_contracts_for_user(
    db: &DatabaseConnection,
    acting: &users::Model,
) -> Result<Vec<ContractSummary>, AppError> {
    let contracts = contract_db::get_contracts_for_user(db, acting.id).await?;

    let job_ids: Vec<Uuid> = contracts.iter().map(|c| c.job_id).collect();
    let counterpart_ids: Vec<Uuid> = contracts
        .iter()
        .filter_map(|c| c.counterpart_of(acting.id))
        .collect();

    let job_titles: HashMap<Uuid, String> = job_db::get_jobs_by_ids(db, job_ids)
        .await?
        .into_iter()
        .map(|j| (j.id, j.title))
        .collect();
    let counterparts: HashMap<Uuid, Counterpart> = user_db::get_users_by_ids(db, counterpart_ids)
        .await?
        .into_iter()
        .map(|u| {
            (
                u.id,
                Counterpart {
                    id: u.id,
                    name: u.name,
                    email: u.email,
                },
            )
        })
        .collect();

    Ok(contracts
        .into_iter()
        .map(|contract| ContractSummary {
            job_title: job_titles.get(&contract.job_id).cloned(),
            counterpart: contract
                .counterpart_of(acting.id)
                .and_then(|id| counterparts.get(&id).cloned()),
            contract,
        })
        .collect())
}

pub async fn get_contract(
    db: &DatabaseConnection,
    acting: &users::Model,
    id: Uuid,
) -> Result<ContractDetail, AppError> {
    let contract = verify_contract_party(db, id, acting.id).await?;
    let milestones = milestone_db::get_milestones_by_contract(db, id).await?;
    Ok(ContractDetail {
        contract,
        milestones,
    })
}

/// Delete a contract and its milestones. Client or admin only.
pub async fn delete_contract(
    db: &DatabaseConnection,
    acting: &users::Model,
    id: Uuid,
) -> Result<(), AppError> {
    let contract = load_contract(db, id).await?;
    if contract.client_id != acting.id && !is_admin(acting) {
        return Err(AppError::Authorization(
            "Only the contract's client or an admin can delete it".to_string(),
        ));
    }

    contract_db::delete_contract_with_milestones(db, id).await?;
    tracing::info!(contract_id = %id, deleted_by = %acting.id, "contract deleted");
    Ok(())
}

// ── Milestones ──

pub async fn add_milestone(
    db: &DatabaseConnection,
    acting: &users::Model,
    contract_id: Uuid,
    input: CreateMilestone,
) -> Result<milestones::Model, AppError> {
    input.validate()?;
    load_as_client(db, acting, contract_id).await?;

    let milestone = milestone_db::insert_milestone(db, contract_id, input).await?;
    tracing::info!(contract_id = %contract_id, milestone_id = %milestone.id, "milestone added");
    Ok(milestone)
}

pub async fn list_milestones(
    db: &DatabaseConnection,
    acting: &users::Model,
    contract_id: Uuid,
) -> Result<Vec<milestones::Model>, AppError> {
    verify_contract_party(db, contract_id, acting.id).await?;
    Ok(milestone_db::get_milestones_by_contract(db, contract_id).await?)
}

async fn load_milestone(
    db: &DatabaseConnection,
    contract_id: Uuid,
    milestone_id: Uuid,
) -> Result<milestones::Model, AppError> {
    milestone_db::get_milestone_in_contract(db, contract_id, milestone_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Milestone {milestone_id} not found")))
}

pub async fn update_milestone(
    db: &DatabaseConnection,
    acting: &users::Model,
    contract_id: Uuid,
    milestone_id: Uuid,
    input: UpdateMilestone,
) -> Result<milestones::Model, AppError> {
    input.validate()?;
    load_as_client(db, acting, contract_id).await?;
    let milestone = load_milestone(db, contract_id, milestone_id).await?;

    let updated = milestone_db::update_milestone(db, milestone, input).await?;
    tracing::info!(milestone_id = %milestone_id, "milestone updated");
    Ok(updated)
}

pub async fn delete_milestone(
    db: &DatabaseConnection,
    acting: &users::Model,
    contract_id: Uuid,
    milestone_id: Uuid,
) -> Result<(), AppError> {
    load_as_client(db, acting, contract_id).await?;
    load_milestone(db, contract_id, milestone_id).await?;

    milestone_db::delete_milestone(db, milestone_id).await?;
    tracing::info!(milestone_id = %milestone_id, "milestone deleted");
    Ok(())
}
