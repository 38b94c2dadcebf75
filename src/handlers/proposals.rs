use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::error::AppError;
use crate::models::proposals::RespondToProposal;
use crate::realtime::EventHub;
use crate::services::proposals as proposal_service;

/// GET /api/proposals/mine
pub async fn my_proposals(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let proposals = proposal_service::get_my_proposals(db.get_ref(), &user.0).await?;
    Ok(HttpResponse::Ok().json(proposals))
}

/// PATCH /api/proposals/{id}/respond: `{"status": "accepted" | "rejected"}`
pub async fn respond(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    hub: web::Data<Arc<EventHub>>,
    path: web::Path<Uuid>,
    body: web::Json<RespondToProposal>,
) -> Result<HttpResponse, AppError> {
    let proposal = proposal_service::respond_to_proposal(
        db.get_ref(),
        hub.get_ref(),
        &user.0,
        path.into_inner(),
        body.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(proposal))
}

/// DELETE /api/proposals/{id}: withdraw a pending proposal.
pub async fn delete_proposal(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    proposal_service::delete_proposal(db.get_ref(), &user.0, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
