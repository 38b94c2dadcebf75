use argon2::password_hash::rand_core::{OsRng, RngCore};
use sea_orm::DatabaseConnection;
use sha2::{Digest, Sha256};
use validator::Validate;

use crate::auth::{jwt, password};
use crate::config::JwtConfig;
use crate::db::organizations as org_db;
use crate::db::users as user_db;
use crate::error::AppError;
use crate::mail::{Mailer, NoticeEmail};
use crate::models::users::{
    self, AuthResponse, EmailRequest, LoginUser, RegisterUser, ResetPassword, Roles, UserResponse,
};

const VERIFY_LINK_MINUTES: i64 = 24 * 60;
const RESET_LINK_MINUTES: i64 = 10;

/// What the account flows need besides the request itself.
pub struct AccountContext<'a> {
    pub db: &'a DatabaseConnection,
    pub mailer: &'a dyn Mailer,
    pub jwt: &'a JwtConfig,
    /// Base URL the emailed links point at.
    pub link_base: &'a str,
}

impl AccountContext<'_> {
    fn link(&self, path: &str, token: &str) -> String {
        format!("{}/{path}/{token}", self.link_base.trim_end_matches('/'))
    }
}

fn issue_token(
    jwt_config: &JwtConfig,
    user_id: uuid::Uuid,
    role: Roles,
) -> Result<String, AppError> {
    jwt::create_token(user_id, role, &jwt_config.secret, jwt_config.maxage_minutes)
        .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
}

/// Create an account and sign the caller in. Pending organization invites
/// for the email are accepted, and a verification link is emailed.
pub async fn register(
    ctx: &AccountContext<'_>,
    input: RegisterUser,
) -> Result<AuthResponse, AppError> {
    input.validate()?;

    let role = input.role.unwrap_or(Roles::Freelancer);
    if role == Roles::Admin {
        return Err(AppError::Validation(
            "The admin role cannot be self-assigned".to_string(),
        ));
    }

    let email = input.email.trim().to_lowercase();
    if user_db::get_user_by_email(ctx.db, &email).await?.is_some() {
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }

    let password_hash = password::hash(&input.password)?;
    // The unique index still catches a concurrent registration.
    let user = user_db::insert_user(
        ctx.db,
        input.name.trim().to_string(),
        email,
        password_hash,
        role,
    )
    .await?;

    tracing::info!(user_id = %user.id, role = ?user.role, "user registered");

    match org_db::claim_invites(ctx.db, &user.email, user.id).await {
        Ok(joined) => {
            for organization_id in joined {
                tracing::info!(
                    organization_id = %organization_id,
                    user_id = %user.id,
                    "pending invite accepted"
                );
            }
        }
        Err(e) => {
            tracing::error!(user_id = %user.id, error = %e, "could not accept pending invites")
        }
    }

    if let Err(e) = send_verification(ctx, &user).await {
        tracing::warn!(user_id = %user.id, error = %e, "verification email failed");
    }

    let token = issue_token(ctx.jwt, user.id, user.role)?;
    Ok(AuthResponse {
        token,
        user: UserResponse::from(user),
    })
}

pub async fn login(
    db: &DatabaseConnection,
    jwt_config: &JwtConfig,
    input: LoginUser,
) -> Result<AuthResponse, AppError> {
    input.validate()?;

    let invalid = || AppError::Authentication("Invalid email or password".to_string());

    let email = input.email.trim().to_lowercase();
    let user = user_db::get_user_by_email(db, &email)
        .await?
        .ok_or_else(invalid)?;

    if !password::compare(&input.password, &user.password_hash)? {
        tracing::warn!(user_id = %user.id, "login rejected: wrong password");
        return Err(invalid());
    }

    let token = issue_token(jwt_config, user.id, user.role)?;
    Ok(AuthResponse {
        token,
        user: UserResponse::from(user),
    })
}

async fn send_verification(
    ctx: &AccountContext<'_>,
    user: &users::Model,
) -> Result<(), AppError> {
    let token = jwt::create_email_token(user.id, &ctx.jwt.secret, VERIFY_LINK_MINUTES)
        .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))?;
    let link = ctx.link("api/auth/verify-email", &token);

    ctx.mailer
        .send_notice(NoticeEmail {
            to: user.email.clone(),
            subject: "Verify your email".to_string(),
            body: format!("Welcome, {}.\n\nPlease verify your email:\n{link}", user.name),
        })
        .await
        .map_err(|e| AppError::Internal(format!("Failed to send email: {e}")))
}

/// Consume a verification link.
pub async fn verify_email(
    ctx: &AccountContext<'_>,
    token: &str,
) -> Result<UserResponse, AppError> {
    let user_id = jwt::validate_email_token(token, &ctx.jwt.secret)
        .map_err(|_| AppError::Validation("Invalid or expired verification link".to_string()))?;

    let user = user_db::get_user_by_id(ctx.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if user_db::mark_email_verified(ctx.db, user.id).await? == 0 {
        return Err(AppError::InvalidState("Email is already verified".to_string()));
    }
    tracing::info!(user_id = %user.id, "email verified");

    let user = user_db::get_user_by_id(ctx.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(UserResponse::from(user))
}

pub async fn resend_verification(
    ctx: &AccountContext<'_>,
    input: EmailRequest,
) -> Result<(), AppError> {
    input.validate()?;
    let email = input.email.trim().to_lowercase();

    let user = user_db::get_user_by_email(ctx.db, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    if user.email_verified_at.is_some() {
        return Err(AppError::InvalidState("Email is already verified".to_string()));
    }

    send_verification(ctx, &user).await?;
    tracing::info!(user_id = %user.id, "verification email resent");
    Ok(())
}

fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Email a short-lived reset link. Only the token's hash is stored.
pub async fn forgot_password(
    ctx: &AccountContext<'_>,
    input: EmailRequest,
) -> Result<(), AppError> {
    input.validate()?;
    let email = input.email.trim().to_lowercase();

    let user = user_db::get_user_by_email(ctx.db, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let mut raw = [0u8; 32];
    OsRng.fill_bytes(&mut raw);
    let token = hex::encode(raw);
    let expires_at = chrono::Utc::now() + chrono::Duration::minutes(RESET_LINK_MINUTES);
    user_db::set_password_reset(ctx.db, user.id, hash_reset_token(&token), expires_at).await?;

    let link = ctx.link("reset-password", &token);
    ctx.mailer
        .send_notice(NoticeEmail {
            to: user.email.clone(),
            subject: "Reset your password".to_string(),
            body: format!(
                "Hi {},\n\nUse this link within {RESET_LINK_MINUTES} minutes to reset your password:\n{link}",
                user.name
            ),
        })
        .await
        .map_err(|e| AppError::Internal(format!("Failed to send email: {e}")))?;

    tracing::info!(user_id = %user.id, "password reset email sent");
    Ok(())
}

/// Set a new password with a reset token. Each token works once.
pub async fn reset_password(
    ctx: &AccountContext<'_>,
    token: &str,
    input: ResetPassword,
) -> Result<(), AppError> {
    let invalid = || AppError::Validation("Invalid or expired reset token".to_string());

    let token_hash = hash_reset_token(token);
    let user = user_db::get_user_by_reset_hash(ctx.db, &token_hash, chrono::Utc::now())
        .await?
        .ok_or_else(invalid)?;
    input.validate()?;

    let password_hash = password::hash(&input.password)?;
    if user_db::reset_password(ctx.db, user.id, &token_hash, password_hash).await? == 0 {
        return Err(invalid());
    }

    tracing::info!(user_id = %user.id, "password reset");
    Ok(())
}
