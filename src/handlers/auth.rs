use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::auth::middleware::AuthenticatedUser;
use crate::config::{AppConfig, JwtConfig};
use crate::error::AppError;
use crate::mail::Mailer;
use crate::models::users::{EmailRequest, LoginUser, RegisterUser, ResetPassword, UserResponse};
use crate::services::auth::{self as auth_service, AccountContext};

fn account_context<'a>(
    db: &'a web::Data<DatabaseConnection>,
    mailer: &'a web::Data<Arc<dyn Mailer>>,
    config: &'a web::Data<AppConfig>,
) -> AccountContext<'a> {
    AccountContext {
        db: db.get_ref(),
        mailer: mailer.get_ref().as_ref(),
        jwt: &config.jwt,
        link_base: &config.public_base_url,
    }
}

/// POST /api/auth/register
pub async fn register(
    db: web::Data<DatabaseConnection>,
    mailer: web::Data<Arc<dyn Mailer>>,
    config: web::Data<AppConfig>,
    body: web::Json<RegisterUser>,
) -> Result<HttpResponse, AppError> {
    let ctx = account_context(&db, &mailer, &config);
    let response = auth_service::register(&ctx, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(response))
}

/// POST /api/auth/login
pub async fn login(
    db: web::Data<DatabaseConnection>,
    jwt_config: web::Data<JwtConfig>,
    body: web::Json<LoginUser>,
) -> Result<HttpResponse, AppError> {
    let response = auth_service::login(db.get_ref(), jwt_config.get_ref(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/auth/me: return the currently authenticated user's profile.
pub async fn me(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(UserResponse::from(user.0))
}

/// GET /api/auth/verify-email/{token}
pub async fn verify_email(
    db: web::Data<DatabaseConnection>,
    mailer: web::Data<Arc<dyn Mailer>>,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let ctx = account_context(&db, &mailer, &config);
    let user = auth_service::verify_email(&ctx, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "msg": "Email verified", "user": user })))
}

/// POST /api/auth/resend-verification
pub async fn resend_verification(
    db: web::Data<DatabaseConnection>,
    mailer: web::Data<Arc<dyn Mailer>>,
    config: web::Data<AppConfig>,
    body: web::Json<EmailRequest>,
) -> Result<HttpResponse, AppError> {
    let ctx = account_context(&db, &mailer, &config);
    auth_service::resend_verification(&ctx, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "msg": "Verification email resent" })))
}

/// POST /api/auth/forgot-password
pub async fn forgot_password(
    db: web::Data<DatabaseConnection>,
    mailer: web::Data<Arc<dyn Mailer>>,
    config: web::Data<AppConfig>,
    body: web::Json<EmailRequest>,
) -> Result<HttpResponse, AppError> {
    let ctx = account_context(&db, &mailer, &config);
    auth_service::forgot_password(&ctx, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "msg": "Password reset email sent" })))
}

/// POST /api/auth/reset-password/{token}
pub async fn reset_password(
    db: web::Data<DatabaseConnection>,
    mailer: web::Data<Arc<dyn Mailer>>,
    config: web::Data<AppConfig>,
    path: web::Path<String>,
    body: web::Json<ResetPassword>,
) -> Result<HttpResponse, AppError> {
    let ctx = account_context(&db, &mailer, &config);
    auth_service::reset_password(&ctx, &path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "msg": "Password reset successfully" })))
}
