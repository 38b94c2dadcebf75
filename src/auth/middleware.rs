use actix_web::FromRequest;
use actix_web::{HttpRequest, dev::Payload, web};
use sea_orm::DatabaseConnection;
use std::future::Future;
use std::pin::Pin;

use crate::auth::jwt;
use crate::config::JwtConfig;
use crate::db::users as user_db;
use crate::error::AppError;
use crate::models::users;

pub struct AuthenticatedUser(pub users::Model);

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            // 1. Extract the Bearer token from the Authorization header.
            let auth_header = req
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    AppError::Authentication("Missing Authorization header".to_string())
                })?;

            let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
                AppError::Authentication("Authorization header must be: Bearer <token>".to_string())
            })?;

            // 2. Shared state.
            let jwt_config = req
                .app_data::<web::Data<JwtConfig>>()
                .ok_or_else(|| AppError::Internal("JWT settings not configured".to_string()))?;

            let db = req
                .app_data::<web::Data<DatabaseConnection>>()
                .ok_or_else(|| AppError::Internal("Database not configured".to_string()))?;

            // 3. Validate and load the user.
            let user = authenticate_token(db.get_ref(), jwt_config.get_ref(), token).await?;

            Ok(AuthenticatedUser(user))
        })
    }
}

/// Verify a token and load the user it names. Also used by the WebSocket
/// handshake, which receives the token as a query parameter.
pub async fn authenticate_token(
    db: &DatabaseConnection,
    jwt_config: &JwtConfig,
    token: &str,
) -> Result<users::Model, AppError> {
    let claims = jwt::validate_token(token, &jwt_config.secret)
        .map_err(|e| AppError::Authentication(format!("Invalid token: {e}")))?;

    let user_id = claims.user_id().map_err(AppError::Authentication)?;

    user_db::get_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| AppError::Authentication("User no longer exists".to_string()))
}
