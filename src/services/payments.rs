use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::auth::authorization::is_admin;
use crate::db::transactions as transaction_db;
use crate::error::AppError;
use crate::models::{transactions, users};

pub async fn my_payments(
    db: &DatabaseConnection,
    acting: &users::Model,
) -> Result<Vec<transactions::Model>, AppError> {
    Ok(transaction_db::get_transactions_for_user(db, acting.id).await?)
}

pub async fn get_payment(
    db: &DatabaseConnection,
    acting: &users::Model,
    id: Uuid,
) -> Result<transactions::Model, AppError> {
    let transaction = transaction_db::get_transaction_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payment {id} not found")))?;

    if transaction.user_id != Some(acting.id) && !is_admin(acting) {
        return Err(AppError::Authorization(
            "You do not have access to this payment".to_string(),
        ));
    }
    Ok(transaction)
}
