use sea_orm::DatabaseConnection;
use uuid::Uuid;
use validator::Validate;

use crate::auth::authorization::require_role;
use crate::db::jobs as job_db;
use crate::error::AppError;
use crate::models::jobs::{
    self, CreateJob, JobListQuery, JobListResponse, JobResponse, UpdateJob, UpdateJobStatus,
};
use crate::models::page_count;
use crate::models::users::{self, Roles};

async fn load_job(db: &DatabaseConnection, id: Uuid) -> Result<jobs::Model, AppError> {
    job_db::get_job_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))
}

/// Load a job the acting user owns.
async fn load_owned_job(
    db: &DatabaseConnection,
    acting: &users::Model,
    id: Uuid,
) -> Result<jobs::Model, AppError> {
    let job = load_job(db, id).await?;
    if job.client_id != acting.id {
        return Err(AppError::Authorization(
            "Only the client who posted this job can change it".to_string(),
        ));
    }
    Ok(job)
}

pub async fn create_job(
    db: &DatabaseConnection,
    acting: &users::Model,
    input: CreateJob,
) -> Result<JobResponse, AppError> {
    require_role(acting, Roles::Client)?;
    input.validate()?;

    let job = job_db::insert_job(db, input, acting.id).await?;
    tracing::info!(job_id = %job.id, client_id = %acting.id, "job posted");
    Ok(JobResponse::from(job))
}

pub async fn list_jobs(
    db: &DatabaseConnection,
    query: &JobListQuery,
) -> Result<JobListResponse, AppError> {
    let pagination = query.pagination();
    let (rows, total) = job_db::find_jobs(db, query).await?;

    Ok(JobListResponse {
        jobs: rows.into_iter().map(JobResponse::from).collect(),
        total,
        page: pagination.page(),
        pages: page_count(total, pagination.limit()),
    })
}

pub async fn get_job(db: &DatabaseConnection, id: Uuid) -> Result<JobResponse, AppError> {
    load_job(db, id).await.map(JobResponse::from)
}

pub async fn update_job(
    db: &DatabaseConnection,
    acting: &users::Model,
    id: Uuid,
    input: UpdateJob,
) -> Result<JobResponse, AppError> {
    input.validate()?;
    let job = load_owned_job(db, acting, id).await?;

    let updated = job_db::update_job(db, job, input).await?;
    tracing::info!(job_id = %id, "job updated");
    Ok(JobResponse::from(updated))
}

pub async fn update_job_status(
    db: &DatabaseConnection,
    acting: &users::Model,
    id: Uuid,
    input: UpdateJobStatus,
) -> Result<JobResponse, AppError> {
    let job = load_owned_job(db, acting, id).await?;

    let updated = job_db::update_job_status(db, job, input.status).await?;
    tracing::info!(job_id = %id, status = ?input.status, "job status changed");
    Ok(JobResponse::from(updated))
}

pub async fn delete_job(
    db: &DatabaseConnection,
    acting: &users::Model,
    id: Uuid,
) -> Result<(), AppError> {
    load_owned_job(db, acting, id).await?;

    job_db::delete_job(db, id).await?;
    tracing::info!(job_id = %id, "job deleted");
    Ok(())
}
