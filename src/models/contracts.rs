use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Contract status stored as a lowercase string in the database.
///
/// Contracts start `Active`; every other state is terminal in practice.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum ContractStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "paused")]
    Paused,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl ContractStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ContractStatus::Completed | ContractStatus::Cancelled)
    }
}

/// SeaORM entity for the `contracts` table. Unique on `(job_id, freelancer_id)`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contracts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub job_id: Uuid,
    pub client_id: Uuid,
    pub freelancer_id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub terms: String,
    pub start_date: Date,
    pub end_date: Date,
    pub status: ContractStatus,
    pub approved_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

impl Model {
    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.client_id == user_id || self.freelancer_id == user_id
    }

    /// The other side of the engagement, if `user_id` is a party.
    pub fn counterpart_of(&self, user_id: Uuid) -> Option<Uuid> {
        if self.client_id == user_id {
            Some(self.freelancer_id)
        } else if self.freelancer_id == user_id {
            Some(self.client_id)
        } else {
            None
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::jobs::Entity",
        from = "Column::JobId",
        to = "super::jobs::Column::Id"
    )]
    Job,
    #[sea_orm(has_many = "super::milestones::Entity")]
    Milestones,
}

impl Related<super::jobs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Job.def()
    }
}

impl Related<super::milestones::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Milestones.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// ── DTOs ──

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateContract {
    pub job_id: Uuid,
    pub freelancer_id: Uuid,
    #[validate(length(min = 1, message = "Terms are required"))]
    pub terms: String,
    pub start_date: Date,
    pub end_date: Date,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateContractStatus {
    pub status: ContractStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct Counterpart {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Listing row: the contract plus its job title and the other party.
#[derive(Debug, Clone, Serialize)]
pub struct ContractSummary {
    #[serde(flatten)]
    pub contract: Model,
    pub job_title: Option<String>,
    pub counterpart: Option<Counterpart>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContractDetail {
    #[serde(flatten)]
    pub contract: Model,
    pub milestones: Vec<super::milestones::Model>,
}
