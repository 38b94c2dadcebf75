use sea_orm::DatabaseConnection;
use uuid::Uuid;
use validator::Validate;

use crate::auth::authorization::{is_admin, require_role, verify_contract_party};
use crate::db::contracts as contract_db;
use crate::db::disputes as dispute_db;
use crate::db::milestones as milestone_db;
use crate::error::AppError;
use crate::models::PaginationQuery;
use crate::models::disputes::{self, CreateDispute, UpdateDispute};
use crate::models::users::{self, Roles};

pub async fn create_dispute(
    db: &DatabaseConnection,
    acting: &users::Model,
    input: CreateDispute,
) -> Result<disputes::Model, AppError> {
    input.validate()?;
    verify_contract_party(db, input.contract_id, acting.id).await?;

    if let Some(milestone_id) = input.milestone_id {
        if milestone_db::get_milestone_in_contract(db, input.contract_id, milestone_id)
            .await?
            .is_none()
        {
            return Err(AppError::Validation(
                "Milestone does not belong to this contract".to_string(),
            ));
        }
    }

    let dispute = dispute_db::insert_dispute(db, input, acting.id).await?;
    tracing::info!(dispute_id = %dispute.id, contract_id = %dispute.contract_id, "dispute raised");
    Ok(dispute)
}

pub async fn my_disputes(
    db: &DatabaseConnection,
    acting: &users::Model,
) -> Result<Vec<disputes::Model>, AppError> {
    Ok(dispute_db::get_disputes_raised_by(db, acting.id).await?)
}

pub async fn list_all(
    db: &DatabaseConnection,
    acting: &users::Model,
    pagination: &PaginationQuery,
) -> Result<Vec<disputes::Model>, AppError> {
    require_role(acting, Roles::Admin)?;
    Ok(dispute_db::get_all_disputes(db, pagination.page(), pagination.limit()).await?)
}

pub async fn get_dispute(
    db: &DatabaseConnection,
    acting: &users::Model,
    id: Uuid,
) -> Result<disputes::Model, AppError> {
    let dispute = dispute_db::get_dispute_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Dispute {id} not found")))?;

    if is_admin(acting) {
        return Ok(dispute);
    }

    let is_party = contract_db::get_contract_by_id(db, dispute.contract_id)
        .await?
        .is_some_and(|c| c.is_party(acting.id));
    if !is_party {
        return Err(AppError::Authorization(
            "You do not have access to this dispute".to_string(),
        ));
    }
    Ok(dispute)
}

/// Admin-only partial update of status and resolution.
pub async fn update_dispute(
    db: &DatabaseConnection,
    acting: &users::Model,
    id: Uuid,
    input: UpdateDispute,
) -> Result<disputes::Model, AppError> {
    require_role(acting, Roles::Admin)?;

    let dispute = dispute_db::get_dispute_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Dispute {id} not found")))?;

    let updated = dispute_db::update_dispute(db, dispute, input).await?;
    tracing::info!(dispute_id = %id, status = ?updated.status, "dispute updated");
    Ok(updated)
}
