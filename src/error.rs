use actix_web::body::EitherBody;
use actix_web::dev::ServiceResponse;
use actix_web::middleware::ErrorHandlerResponse;
use actix_web::{HttpResponse, ResponseError, http::StatusCode, web};
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    Authorization(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("Webhook signature verification failed: {0}")]
    Signature(String),
    #[error("Database error: {0}")]
    Database(DbErr),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    fn is_internal(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Internal(_))
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict("A record with these values already exists".to_string())
            }
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                AppError::Conflict("The record is referenced by other records".to_string())
            }
            _ => match err {
                DbErr::RecordNotFound(msg) => AppError::NotFound(msg),
                other => AppError::Database(other),
            },
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidState(_) | AppError::Signature(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if !self.is_internal() {
            return HttpResponse::build(self.status_code())
                .json(serde_json::json!({ "msg": self.to_string() }));
        }

        tracing::error!(error = %self, "request failed");
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "msg": "Internal server error" }))
    }
}

/// `ErrorHandlers` hook for 500s: outside production, re-renders an internal
/// [`AppError`] with its detail in a `stack` field.
pub fn attach_internal_detail<B>(
    res: ServiceResponse<B>,
) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let expose = res
        .request()
        .app_data::<web::Data<AppConfig>>()
        .is_some_and(|config| !config.is_production());
    let detail = res
        .response()
        .error()
        .and_then(|err| err.as_error::<AppError>())
        .filter(|err| err.is_internal())
        .map(ToString::to_string);

    let Some(detail) = detail.filter(|_| expose) else {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    };

    let (req, _) = res.into_parts();
    let body = HttpResponse::InternalServerError()
        .json(serde_json::json!({ "msg": "Internal server error", "stack": detail }));
    let res: ServiceResponse<EitherBody<B>> = ServiceResponse::new(req, body).map_into_right_body();
    Ok(ErrorHandlerResponse::Response(res))
}
