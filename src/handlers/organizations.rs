use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::error::AppError;
use crate::mail::Mailer;
use crate::models::organizations::{CreateOrganization, InviteMember, UpdateOrganization};
use crate::services::organizations as org_service;

/// POST /api/orgs
pub async fn create_organization(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    body: web::Json<CreateOrganization>,
) -> Result<HttpResponse, AppError> {
    let organization =
        org_service::create_organization(db.get_ref(), &user.0, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(organization))
}

/// GET /api/orgs: organizations the caller belongs to.
pub async fn my_organizations(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let organizations = org_service::my_organizations(db.get_ref(), &user.0).await?;
    Ok(HttpResponse::Ok().json(organizations))
}

/// GET /api/orgs/{id}
pub async fn get_organization(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let detail = org_service::get_organization(db.get_ref(), &user.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// PUT /api/orgs/{id}: owner only.
pub async fn update_organization(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateOrganization>,
) -> Result<HttpResponse, AppError> {
    let organization = org_service::update_organization(
        db.get_ref(),
        &user.0,
        path.into_inner(),
        body.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(organization))
}

/// POST /api/orgs/invite
pub async fn invite_member(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    mailer: web::Data<Arc<dyn Mailer>>,
    body: web::Json<InviteMember>,
) -> Result<HttpResponse, AppError> {
    let outcome = org_service::invite_member(
        db.get_ref(),
        mailer.get_ref().as_ref(),
        &user.0,
        body.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// GET /api/orgs/{id}/members
pub async fn get_members(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let members = org_service::get_members(db.get_ref(), &user.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(members))
}

/// DELETE /api/orgs/{id}/members/{member_id}
pub async fn remove_member(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (organization_id, member_id) = path.into_inner();
    org_service::remove_member(db.get_ref(), &user.0, organization_id, member_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "msg": "Member removed" })))
}

/// POST /api/orgs/{id}/leave
pub async fn leave_organization(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    org_service::leave_organization(db.get_ref(), &user.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "msg": "Left organization" })))
}
