use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::error::AppError;
use crate::models::PaginationQuery;
use crate::models::messages::{MarkSeen, SendMessage};
use crate::realtime::EventHub;
use crate::services::messages as message_service;

/// GET /api/chat/{contract_id}/messages?page=&limit=
pub async fn get_messages(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    query: web::Query<PaginationQuery>,
) -> Result<HttpResponse, AppError> {
    let messages =
        message_service::history(db.get_ref(), user.0.id, path.into_inner(), &query).await?;
    Ok(HttpResponse::Ok().json(messages))
}

/// POST /api/chat/{contract_id}/messages: same as sending over the socket,
/// for clients that are not connected.
pub async fn send_message(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    hub: web::Data<Arc<EventHub>>,
    path: web::Path<Uuid>,
    body: web::Json<SendMessage>,
) -> Result<HttpResponse, AppError> {
    let message = message_service::send_message(
        db.get_ref(),
        hub.get_ref(),
        user.0.id,
        path.into_inner(),
        body.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Created().json(message))
}

/// POST /api/chat/{contract_id}/seen
pub async fn mark_seen(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    hub: web::Data<Arc<EventHub>>,
    path: web::Path<Uuid>,
    body: web::Json<MarkSeen>,
) -> Result<HttpResponse, AppError> {
    let seen = message_service::mark_seen(
        db.get_ref(),
        hub.get_ref(),
        user.0.id,
        path.into_inner(),
        body.into_inner().message_ids,
    )
    .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "seen": seen })))
}

/// DELETE /api/chat/messages/{id}
pub async fn delete_message(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    hub: web::Data<Arc<EventHub>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    message_service::delete_message(db.get_ref(), hub.get_ref(), user.0.id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "msg": "Message deleted" })))
}
