use actix_web::{HttpRequest, HttpResponse, web};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::mail::Mailer;
use crate::realtime::EventHub;
use crate::services::reconciliation::{self, WebhookContext};

/// POST /api/webhooks/stripe: no bearer token; trust comes from the
/// `Stripe-Signature` header over the raw body.
///
/// Answers 400 when the signature is bad, 200 `{"received": true}` for
/// everything else, including signed events that failed to parse or apply.
pub async fn stripe_webhook(
    req: HttpRequest,
    body: web::Bytes,
    db: web::Data<DatabaseConnection>,
    hub: web::Data<Arc<EventHub>>,
    mailer: web::Data<Arc<dyn Mailer>>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    let signature = req
        .headers()
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok());

    let ctx = WebhookContext {
        db: db.get_ref(),
        hub: hub.get_ref(),
        mailer: mailer.get_ref().as_ref(),
        public_base_url: &config.public_base_url,
    };

    reconciliation::handle_webhook(
        &ctx,
        &config.stripe,
        &body,
        signature,
        chrono::Utc::now().timestamp(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "received": true })))
}
