use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum InvoiceStatus {
    #[sea_orm(string_value = "unpaid")]
    Unpaid,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "overdue")]
    Overdue,
}

/// SeaORM entity for the `invoices` table.
///
/// `total` is fixed when the invoice is created; editing items afterwards
/// does not change it. Only a confirmed payment may rewrite it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub contract_id: Uuid,
    pub milestone_id: Option<Uuid>,
    pub issued_by: Uuid,
    pub paid_by: Option<Uuid>,
    #[sea_orm(column_type = "Double")]
    pub total: f64,
    pub due_date: Option<Date>,
    pub status: InvoiceStatus,
    pub paid_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::contracts::Entity",
        from = "Column::ContractId",
        to = "super::contracts::Column::Id"
    )]
    Contract,
    #[sea_orm(has_many = "super::invoice_items::Entity")]
    Items,
}

impl Related<super::contracts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contract.def()
    }
}

impl Related<super::invoice_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// ── DTOs ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItemInput {
    pub description: String,
    pub quantity: i32,
    pub unit_price: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvoice {
    pub contract_id: Uuid,
    pub milestone_id: Option<Uuid>,
    pub items: Vec<InvoiceItemInput>,
    pub due_date: Option<Date>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateInvoice {
    pub items: Option<Vec<InvoiceItemInput>>,
    pub due_date: Option<Date>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceResponse {
    #[serde(flatten)]
    pub invoice: Model,
    pub items: Vec<super::invoice_items::Model>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentIntent {
    pub invoice_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntentResponse {
    pub client_secret: String,
    pub payment_intent_id: String,
    pub invoice_id: Uuid,
}
