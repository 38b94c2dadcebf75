use sea_orm::*;
use uuid::Uuid;

use crate::models::transactions::{self, NewTransaction};

/// Look up the transaction recorded for a payment intent, if any.
pub async fn find_by_payment_intent<C: ConnectionTrait>(
    db: &C,
    payment_intent_id: &str,
) -> Result<Option<transactions::Model>, DbErr> {
    transactions::Entity::find()
        .filter(transactions::Column::StripePaymentIntentId.eq(payment_intent_id))
        .one(db)
        .await
}

/// Insert a transaction row. A second row for the same intent fails on the
/// unique index.
pub async fn insert_transaction<C: ConnectionTrait>(
    db: &C,
    input: NewTransaction,
) -> Result<transactions::Model, DbErr> {
    let new_transaction = transactions::ActiveModel {
        id: Set(Uuid::new_v4()),
        stripe_payment_intent_id: Set(input.stripe_payment_intent_id),
        user_id: Set(input.user_id),
        invoice_id: Set(input.invoice_id),
        amount: Set(input.amount),
        currency: Set(input.currency),
        status: Set(input.status),
        created_at: Set(chrono::Utc::now()),
    };

    new_transaction.insert(db).await
}

pub async fn get_transactions_for_user(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Vec<transactions::Model>, DbErr> {
    transactions::Entity::find()
        .filter(transactions::Column::UserId.eq(user_id))
        .order_by_desc(transactions::Column::CreatedAt)
        .all(db)
        .await
}

pub async fn get_transaction_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<transactions::Model>, DbErr> {
    transactions::Entity::find_by_id(id).one(db).await
}

pub async fn count_for_invoice(db: &DatabaseConnection, invoice_id: Uuid) -> Result<u64, DbErr> {
    transactions::Entity::find()
        .filter(transactions::Column::InvoiceId.eq(invoice_id))
        .count(db)
        .await
}

/// Sum of every recorded payment amount.
pub async fn total_revenue(db: &DatabaseConnection) -> Result<f64, DbErr> {
    let amounts: Vec<f64> = transactions::Entity::find()
        .select_only()
        .column(transactions::Column::Amount)
        .into_tuple()
        .all(db)
        .await?;

    Ok(amounts.into_iter().sum())
}
