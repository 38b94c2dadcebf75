use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::error::AppError;
use crate::models::contracts::{CreateContract, UpdateContractStatus};
use crate::models::milestones::{CreateMilestone, UpdateMilestone};
use crate::services::contracts as contract_service;

/// POST /api/contracts: the job's client contracts a freelancer whose
/// proposal was accepted.
pub async fn create_contract(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    body: web::Json<CreateContract>,
) -> Result<HttpResponse, AppError> {
    let contract = contract_service::create_contract(db.get_ref(), &user.0, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(contract))
}

/// GET /api/contracts: contracts where the user is client or freelancer.
pub async fn get_contracts(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let contracts = contract_service::get_contracts_for_user(db.get_ref(), &user.0).await?;
    Ok(HttpResponse::Ok().json(contracts))
}

/// GET /api/contracts/{id}: parties only, with milestones.
pub async fn get_contract(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let detail = contract_service::get_contract(db.get_ref(), &user.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// DELETE /api/contracts/{id}: client or admin.
pub async fn delete_contract(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    contract_service::delete_contract(db.get_ref(), &user.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "msg": "Contract deleted" })))
}

/// PATCH /api/contracts/{id}/approve: freelancer confirms.
pub async fn approve_contract(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let contract = contract_service::approve_contract(db.get_ref(), &user.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(contract))
}

/// PATCH /api/contracts/{id}/reject: freelancer declines; the contract is cancelled.
pub async fn reject_contract(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let contract = contract_service::reject_contract(db.get_ref(), &user.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(contract))
}

/// PATCH /api/contracts/{id}/status: `{"status": "paused" | "completed" | "cancelled"}`
pub async fn update_status(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateContractStatus>,
) -> Result<HttpResponse, AppError> {
    let contract = contract_service::update_status(
        db.get_ref(),
        &user.0,
        path.into_inner(),
        body.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(contract))
}

// ── Milestones ──

/// POST /api/contracts/{id}/milestones: client only.
pub async fn add_milestone(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    body: web::Json<CreateMilestone>,
) -> Result<HttpResponse, AppError> {
    let milestone = contract_service::add_milestone(
        db.get_ref(),
        &user.0,
        path.into_inner(),
        body.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Created().json(milestone))
}

/// GET /api/contracts/{id}/milestones
pub async fn get_milestones(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let milestones = contract_service::list_milestones(db.get_ref(), &user.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(milestones))
}

/// PUT /api/contracts/{id}/milestones/{milestone_id}: client only.
pub async fn update_milestone(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<UpdateMilestone>,
) -> Result<HttpResponse, AppError> {
    let (contract_id, milestone_id) = path.into_inner();
    let milestone = contract_service::update_milestone(
        db.get_ref(),
        &user.0,
        contract_id,
        milestone_id,
        body.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(milestone))
}

/// DELETE /api/contracts/{id}/milestones/{milestone_id}: client only.
pub async fn delete_milestone(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (contract_id, milestone_id) = path.into_inner();
    contract_service::delete_milestone(db.get_ref(), &user.0, contract_id, milestone_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
