use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only record of one confirmed processor payment.
///
/// `stripe_payment_intent_id` carries a unique index: at most one row per intent.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub stripe_payment_intent_id: String,
    pub user_id: Option<Uuid>,
    pub invoice_id: Option<Uuid>,
    #[sea_orm(column_type = "Double")]
    pub amount: f64,
    pub currency: String,
    /// Status string as reported by the processor.
    pub status: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::invoices::Entity",
        from = "Column::InvoiceId",
        to = "super::invoices::Column::Id"
    )]
    Invoice,
}

impl Related<super::invoices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Fields for a new transaction row.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub stripe_payment_intent_id: String,
    pub user_id: Option<Uuid>,
    pub invoice_id: Option<Uuid>,
    pub amount: f64,
    pub currency: String,
    pub status: String,
}
