use sea_orm::prelude::Expr;
use sea_orm::*;
use uuid::Uuid;

use crate::models::jobs::{
    self, CreateJob, JobListQuery, JobSort, JobStatus, SortOrder, UpdateJob, encode_skills,
    skill_needle,
};

/// Insert a new job owned by `client_id`. Jobs always start open.
pub async fn insert_job(
    db: &DatabaseConnection,
    input: CreateJob,
    client_id: Uuid,
) -> Result<jobs::Model, DbErr> {
    let new_job = jobs::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(input.title),
        description: Set(input.description),
        category: Set(input.category),
        skills: Set(encode_skills(&input.skills)),
        budget: Set(input.budget),
        deadline: Set(input.deadline),
        status: Set(JobStatus::Open),
        client_id: Set(client_id),
        created_at: Set(chrono::Utc::now()),
        updated_at: Set(None),
    };

    new_job.insert(db).await
}

/// Filtered, sorted page of jobs plus the total number of matches.
pub async fn find_jobs(
    db: &DatabaseConnection,
    query: &JobListQuery,
) -> Result<(Vec<jobs::Model>, u64), DbErr> {
    let mut select = jobs::Entity::find();

    if let Some(status) = query.status {
        select = select.filter(jobs::Column::Status.eq(status));
    }
    if let Some(keyword) = query.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        select = select.filter(Expr::cust_with_values(
            "LOWER(title) LIKE ?",
            [format!("%{}%", keyword.to_lowercase())],
        ));
    }
    if let Some(skill) = query.skill.as_deref().filter(|s| !s.trim().is_empty()) {
        select = select.filter(jobs::Column::Skills.contains(skill_needle(skill)));
    }

    let column = match query.sort_by.unwrap_or_default() {
        JobSort::CreatedAt => jobs::Column::CreatedAt,
        JobSort::Budget => jobs::Column::Budget,
    };
    select = match query.order.unwrap_or_default() {
        SortOrder::Asc => select.order_by_asc(column),
        SortOrder::Desc => select.order_by_desc(column),
    };

    let pagination = query.pagination();
    let paginator = select.paginate(db, pagination.limit());
    let total = paginator.num_items().await?;
    let rows = paginator.fetch_page(pagination.page() - 1).await?;

    Ok((rows, total))
}

/// Fetch a single job by ID.
pub async fn get_job_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<jobs::Model>, DbErr> {
    jobs::Entity::find_by_id(id).one(db).await
}

pub async fn get_jobs_by_ids(
    db: &DatabaseConnection,
    ids: Vec<Uuid>,
) -> Result<Vec<jobs::Model>, DbErr> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    jobs::Entity::find()
        .filter(jobs::Column::Id.is_in(ids))
        .all(db)
        .await
}

/// Apply an allow-listed partial update.
pub async fn update_job(
    db: &DatabaseConnection,
    job: jobs::Model,
    input: UpdateJob,
) -> Result<jobs::Model, DbErr> {
    let mut active: jobs::ActiveModel = job.into();

    if let Some(title) = input.title {
        active.title = Set(title);
    }
    if let Some(description) = input.description {
        active.description = Set(description);
    }
    if let Some(category) = input.category {
        active.category = Set(Some(category));
    }
    if let Some(skills) = input.skills {
        active.skills = Set(encode_skills(&skills));
    }
    if let Some(budget) = input.budget {
        active.budget = Set(budget);
    }
    if let Some(deadline) = input.deadline {
        active.deadline = Set(Some(deadline));
    }
    active.updated_at = Set(Some(chrono::Utc::now()));

    active.update(db).await
}

pub async fn update_job_status(
    db: &DatabaseConnection,
    job: jobs::Model,
    status: JobStatus,
) -> Result<jobs::Model, DbErr> {
    let mut active: jobs::ActiveModel = job.into();
    active.status = Set(status);
    active.updated_at = Set(Some(chrono::Utc::now()));
    active.update(db).await
}

/// Delete a job by ID.
pub async fn delete_job(db: &DatabaseConnection, id: Uuid) -> Result<DeleteResult, DbErr> {
    jobs::Entity::delete_by_id(id).exec(db).await
}

pub async fn count_jobs(db: &DatabaseConnection) -> Result<u64, DbErr> {
    jobs::Entity::find().count(db).await
}
