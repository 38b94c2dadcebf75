use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::invoices::{CreateInvoice, CreatePaymentIntent, UpdateInvoice};
use crate::payments::PaymentGateway;
use crate::realtime::EventHub;
use crate::services::invoices as invoice_service;

/// POST /api/invoices: the contract's freelancer bills the client.
pub async fn create_invoice(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    hub: web::Data<Arc<EventHub>>,
    body: web::Json<CreateInvoice>,
) -> Result<HttpResponse, AppError> {
    let invoice =
        invoice_service::create_invoice(db.get_ref(), hub.get_ref(), &user.0, body.into_inner())
            .await?;
    Ok(HttpResponse::Created().json(invoice))
}

/// GET /api/invoices
pub async fn get_invoices(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let invoices = invoice_service::list_for_user(db.get_ref(), &user.0).await?;
    Ok(HttpResponse::Ok().json(invoices))
}

/// GET /api/invoices/{id}
pub async fn get_invoice(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let invoice = invoice_service::get_invoice(db.get_ref(), &user.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(invoice))
}

/// PUT /api/invoices/{id}: issuer only, while unpaid.
pub async fn update_invoice(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateInvoice>,
) -> Result<HttpResponse, AppError> {
    let invoice = invoice_service::update_invoice(
        db.get_ref(),
        &user.0,
        path.into_inner(),
        body.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(invoice))
}

/// GET /api/invoices/{id}/pdf: download the rendered invoice.
pub async fn get_invoice_pdf(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let (invoice, pdf) = invoice_service::invoice_pdf(db.get_ref(), &user.0, path.into_inner()).await?;

    let disposition = ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(format!(
            "invoice-{}.pdf",
            invoice.id
        ))],
    };
    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header(disposition)
        .body(pdf))
}

/// PATCH /api/invoices/{id}/pay: manual paid-mark.
pub async fn mark_paid(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let invoice = invoice_service::mark_paid(db.get_ref(), &user.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(invoice))
}

/// DELETE /api/invoices/{id}: issuer or admin; never once paid.
pub async fn delete_invoice(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    invoice_service::delete_invoice(db.get_ref(), &user.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "msg": "Invoice deleted" })))
}

/// POST /api/invoices/create-payment-intent: `{"invoice_id": "..."}`
pub async fn create_payment_intent(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    gateway: web::Data<Arc<dyn PaymentGateway>>,
    config: web::Data<AppConfig>,
    body: web::Json<CreatePaymentIntent>,
) -> Result<HttpResponse, AppError> {
    let response = invoice_service::create_payment_intent(
        db.get_ref(),
        gateway.get_ref(),
        &config.stripe.currency,
        &user.0,
        body.invoice_id,
    )
    .await?;
    Ok(HttpResponse::Ok().json(response))
}
