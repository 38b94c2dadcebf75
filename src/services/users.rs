use sea_orm::DatabaseConnection;
use uuid::Uuid;
use validator::Validate;

use crate::auth::authorization::require_role;
use crate::db::users as user_db;
use crate::error::AppError;
use crate::models::PaginationQuery;
use crate::models::users::{self, Roles, UpdateUser, UserResponse};

pub async fn get_user(db: &DatabaseConnection, id: Uuid) -> Result<UserResponse, AppError> {
    user_db::get_user_by_id(db, id)
        .await?
        .map(UserResponse::from)
        .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))
}

/// Users may only edit their own profile.
pub async fn update_user(
    db: &DatabaseConnection,
    acting: &users::Model,
    id: Uuid,
    input: UpdateUser,
) -> Result<UserResponse, AppError> {
    if acting.id != id {
        return Err(AppError::Authorization(
            "You can only update your own account".to_string(),
        ));
    }
    input.validate()?;

    let updated = user_db::update_user(db, id, input).await?;
    tracing::info!(user_id = %id, "user profile updated");
    Ok(UserResponse::from(updated))
}

pub async fn list_users(
    db: &DatabaseConnection,
    acting: &users::Model,
    pagination: &PaginationQuery,
) -> Result<Vec<UserResponse>, AppError> {
    require_role(acting, Roles::Admin)?;

    let users = user_db::get_users_paginated(db, pagination.page(), pagination.limit()).await?;
    Ok(users.into_iter().map(UserResponse::from).collect())
}
