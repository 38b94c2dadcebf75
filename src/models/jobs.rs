use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum JobStatus {
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "closed")]
    Closed,
}

/// SeaORM entity for the `jobs` table.
///
/// `skills` is stored delimited (`,rust,actix,`) so a single skill can be
/// matched with a plain `LIKE`. Use [`encode_skills`] / [`decode_skills`].
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub category: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub skills: String,
    #[sea_orm(column_type = "Double")]
    pub budget: f64,
    pub deadline: Option<Date>,
    pub status: JobStatus,
    pub client_id: Uuid,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ClientId",
        to = "super::users::Column::Id"
    )]
    Client,
    #[sea_orm(has_many = "super::proposals::Entity")]
    Proposals,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::proposals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Proposals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Normalise a skill list into the stored delimited form.
pub fn encode_skills(skills: &[String]) -> String {
    let mut normalised: Vec<String> = skills
        .iter()
        .map(|s| s.trim().to_lowercase().replace(',', " "))
        .filter(|s| !s.is_empty())
        .collect();
    normalised.sort();
    normalised.dedup();

    if normalised.is_empty() {
        String::new()
    } else {
        format!(",{},", normalised.join(","))
    }
}

pub fn decode_skills(stored: &str) -> Vec<String> {
    stored
        .split(',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// The `LIKE` needle matching one skill in the stored form.
pub fn skill_needle(skill: &str) -> String {
    format!(",{},", skill.trim().to_lowercase())
}

// ── DTOs ──

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateJob {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    pub category: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[validate(range(min = 0.0, message = "Budget cannot be negative"))]
    pub budget: f64,
    pub deadline: Option<Date>,
}

/// Allow-listed partial update; status changes go through `UpdateJobStatus`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateJob {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Description cannot be empty"))]
    pub description: Option<String>,
    pub category: Option<String>,
    pub skills: Option<Vec<String>>,
    #[validate(range(min = 0.0, message = "Budget cannot be negative"))]
    pub budget: Option<f64>,
    pub deadline: Option<Date>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateJobStatus {
    pub status: JobStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobSort {
    #[default]
    CreatedAt,
    Budget,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Query parameters for `GET /api/jobs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<JobStatus>,
    pub keyword: Option<String>,
    pub skill: Option<String>,
    pub sort_by: Option<JobSort>,
    pub order: Option<SortOrder>,
}

impl JobListQuery {
    pub fn pagination(&self) -> super::PaginationQuery {
        super::PaginationQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub skills: Vec<String>,
    pub budget: f64,
    pub deadline: Option<Date>,
    pub status: JobStatus,
    pub client_id: Uuid,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

impl From<Model> for JobResponse {
    fn from(m: Model) -> Self {
        Self {
            id: m.id,
            skills: decode_skills(&m.skills),
            title: m.title,
            description: m.description,
            category: m.category,
            budget: m.budget,
            deadline: m.deadline,
            status: m.status,
            client_id: m.client_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobResponse>,
    pub total: u64,
    pub page: u64,
    pub pages: u64,
}
