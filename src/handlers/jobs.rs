use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::cache::{CacheConfig, CacheData, keys};
use crate::error::AppError;
use crate::models::jobs::{CreateJob, JobListQuery, JobResponse, UpdateJob, UpdateJobStatus};
use crate::models::proposals::SubmitProposal;
use crate::realtime::EventHub;
use crate::services::{jobs as job_service, proposals as proposal_service};

/// POST /api/jobs: clients post work.
pub async fn create_job(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    body: web::Json<CreateJob>,
) -> Result<HttpResponse, AppError> {
    let job = job_service::create_job(db.get_ref(), &user.0, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(job))
}

/// GET /api/jobs?status=&keyword=&skill=&sort_by=&order=&page=&limit=
pub async fn get_jobs(
    _user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    query: web::Query<JobListQuery>,
) -> Result<HttpResponse, AppError> {
    let jobs = job_service::list_jobs(db.get_ref(), &query).await?;
    Ok(HttpResponse::Ok().json(jobs))
}

/// GET /api/jobs/{id}
pub async fn get_job(
    _user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    cache: web::Data<CacheData>,
    cache_config: web::Data<CacheConfig>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let job: JobResponse = cache
        .get_or_load(&keys::job(id), cache_config.job_ttl, || {
            job_service::get_job(db.get_ref(), id)
        })
        .await?;
    Ok(HttpResponse::Ok().json(job))
}

/// PUT /api/jobs/{id}: owner only.
pub async fn update_job(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    cache: web::Data<CacheData>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateJob>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let job = job_service::update_job(db.get_ref(), &user.0, id, body.into_inner()).await?;

    cache.invalidate(&keys::job(id)).await;
    Ok(HttpResponse::Ok().json(job))
}

/// PATCH /api/jobs/{id}/status: owner only.
pub async fn update_job_status(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    cache: web::Data<CacheData>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateJobStatus>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let job = job_service::update_job_status(db.get_ref(), &user.0, id, body.into_inner()).await?;

    cache.invalidate(&keys::job(id)).await;
    Ok(HttpResponse::Ok().json(job))
}

/// DELETE /api/jobs/{id}: owner only.
pub async fn delete_job(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    cache: web::Data<CacheData>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    job_service::delete_job(db.get_ref(), &user.0, id).await?;

    cache.invalidate(&keys::job(id)).await;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/jobs/{id}/proposals: freelancers bid on an open job.
pub async fn submit_proposal(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    hub: web::Data<Arc<EventHub>>,
    path: web::Path<Uuid>,
    body: web::Json<SubmitProposal>,
) -> Result<HttpResponse, AppError> {
    let proposal = proposal_service::submit_proposal(
        db.get_ref(),
        hub.get_ref(),
        &user.0,
        path.into_inner(),
        body.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Created().json(proposal))
}

/// GET /api/jobs/{id}/proposals: job owner only.
pub async fn get_job_proposals(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let proposals =
        proposal_service::get_job_proposals(db.get_ref(), &user.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(proposals))
}
