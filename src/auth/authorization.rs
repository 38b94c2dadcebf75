use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::db::contracts as contract_db;
use crate::error::AppError;
use crate::models::contracts::{ContractStatus, Model};
use crate::models::users::{self, Roles};

pub fn require_role(user: &users::Model, role: Roles) -> Result<(), AppError> {
    if user.role == role {
        Ok(())
    } else {
        Err(AppError::Authorization(format!(
            "This action requires the {} role",
            role_name(role)
        )))
    }
}

pub fn is_admin(user: &users::Model) -> bool {
    user.role == Roles::Admin
}

fn role_name(role: Roles) -> &'static str {
    match role {
        Roles::Client => "client",
        Roles::Freelancer => "freelancer",
        Roles::Admin => "admin",
    }
}

/// Load a contract the user is a party to.
pub async fn verify_contract_party(
    db: &DatabaseConnection,
    contract_id: Uuid,
    user_id: Uuid,
) -> Result<Model, AppError> {
    let contract = contract_db::get_contract_by_id(db, contract_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Contract {contract_id} not found")))?;

    if !contract.is_party(user_id) {
        return Err(AppError::Authorization(
            "You are not a party to this contract".to_string(),
        ));
    }

    Ok(contract)
}

/// Like [`verify_contract_party`], but chat is only open while the contract is active.
pub async fn verify_chat_access(
    db: &DatabaseConnection,
    contract_id: Uuid,
    user_id: Uuid,
) -> Result<Model, AppError> {
    let contract = verify_contract_party(db, contract_id, user_id).await?;

    if contract.status != ContractStatus::Active {
        return Err(AppError::Authorization(
            "Chat is only available for active contracts".to_string(),
        ));
    }

    Ok(contract)
}
