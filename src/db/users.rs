use sea_orm::prelude::Expr;
use sea_orm::*;
use uuid::Uuid;

use crate::models::users::{self, Roles, UpdateUser};

/// Insert a new user with an already-hashed password.
pub async fn insert_user(
    db: &DatabaseConnection,
    name: String,
    email: String,
    password_hash: String,
    role: Roles,
) -> Result<users::Model, DbErr> {
    let new_user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        email: Set(email),
        password_hash: Set(password_hash),
        role: Set(role),
        created_at: Set(chrono::Utc::now()),
        updated_at: Set(None),
        email_verified_at: Set(None),
        password_reset_hash: Set(None),
        password_reset_expires_at: Set(None),
    };

    new_user.insert(db).await
}

/// Fetch a single user by ID.
pub async fn get_user_by_id<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find_by_id(id).one(db).await
}

pub async fn get_user_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find()
        .filter(users::Column::Email.eq(email))
        .one(db)
        .await
}

/// Fetch many users at once, for joining names onto listings.
pub async fn get_users_by_ids(
    db: &DatabaseConnection,
    ids: Vec<Uuid>,
) -> Result<Vec<users::Model>, DbErr> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    users::Entity::find()
        .filter(users::Column::Id.is_in(ids))
        .all(db)
        .await
}

/// Fetch users page by page, newest first.
pub async fn get_users_paginated(
    db: &DatabaseConnection,
    page: u64,
    limit: u64,
) -> Result<Vec<users::Model>, DbErr> {
    users::Entity::find()
        .order_by_desc(users::Column::CreatedAt)
        .paginate(db, limit)
        .fetch_page(page - 1)
        .await
}

/// Apply the allow-listed profile fields.
pub async fn update_user(
    db: &DatabaseConnection,
    id: Uuid,
    input: UpdateUser,
) -> Result<users::Model, DbErr> {
    let user = users::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

    let mut active: users::ActiveModel = user.into();

    if let Some(name) = input.name {
        active.name = Set(name);
    }
    if let Some(email) = input.email {
        active.email = Set(email.to_lowercase());
    }
    active.updated_at = Set(Some(chrono::Utc::now()));

    active.update(db).await
}

/// Stamp the account's email as verified. Returns `0` when it already was.
pub async fn mark_email_verified(db: &DatabaseConnection, id: Uuid) -> Result<u64, DbErr> {
    let now = chrono::Utc::now();
    let result = users::Entity::update_many()
        .col_expr(users::Column::EmailVerifiedAt, Expr::value(now))
        .col_expr(users::Column::UpdatedAt, Expr::value(now))
        .filter(users::Column::Id.eq(id))
        .filter(users::Column::EmailVerifiedAt.is_null())
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

pub async fn set_password_reset(
    db: &DatabaseConnection,
    id: Uuid,
    token_hash: String,
    expires_at: chrono::DateTime<chrono::Utc>,
) -> Result<(), DbErr> {
    users::Entity::update_many()
        .col_expr(users::Column::PasswordResetHash, Expr::value(token_hash))
        .col_expr(users::Column::PasswordResetExpiresAt, Expr::value(expires_at))
        .filter(users::Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

/// The user holding an unexpired reset token with this hash.
pub async fn get_user_by_reset_hash(
    db: &DatabaseConnection,
    token_hash: &str,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find()
        .filter(users::Column::PasswordResetHash.eq(token_hash))
        .filter(users::Column::PasswordResetExpiresAt.gt(now))
        .one(db)
        .await
}

/// Replace the password and burn the reset token in one write. Returns `0`
/// when the token was already used.
pub async fn reset_password(
    db: &DatabaseConnection,
    id: Uuid,
    token_hash: &str,
    password_hash: String,
) -> Result<u64, DbErr> {
    let result = users::Entity::update_many()
        .col_expr(users::Column::PasswordHash, Expr::value(password_hash))
        .col_expr(users::Column::PasswordResetHash, Expr::value(Option::<String>::None))
        .col_expr(
            users::Column::PasswordResetExpiresAt,
            Expr::value(Option::<chrono::DateTime<chrono::Utc>>::None),
        )
        .col_expr(users::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(users::Column::Id.eq(id))
        .filter(users::Column::PasswordResetHash.eq(token_hash))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}
