use sea_orm::prelude::Expr;
use sea_orm::*;
use uuid::Uuid;

use crate::models::messages;

pub async fn insert_message(
    db: &DatabaseConnection,
    contract_id: Uuid,
    sender_id: Uuid,
    content: String,
) -> Result<messages::Model, DbErr> {
    messages::ActiveModel {
        id: Set(Uuid::new_v4()),
        contract_id: Set(contract_id),
        sender_id: Set(sender_id),
        content: Set(content),
        seen_at: Set(None),
        created_at: Set(chrono::Utc::now()),
    }
    .insert(db)
    .await
}

/// One page of a contract's conversation in the order it was written.
pub async fn get_history(
    db: &DatabaseConnection,
    contract_id: Uuid,
    page: u64,
    limit: u64,
) -> Result<Vec<messages::Model>, DbErr> {
    messages::Entity::find()
        .filter(messages::Column::ContractId.eq(contract_id))
        .order_by_asc(messages::Column::CreatedAt)
        .order_by_asc(messages::Column::Id)
        .paginate(db, limit)
        .fetch_page(page.saturating_sub(1))
        .await
}

pub async fn get_message_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<messages::Model>, DbErr> {
    messages::Entity::find_by_id(id).one(db).await
}

/// Stamp `seen_at` on the listed messages that `reader` received and has not
/// seen yet. Ids from other contracts or sent by the reader are skipped.
pub async fn mark_seen(
    db: &DatabaseConnection,
    contract_id: Uuid,
    reader_id: Uuid,
    ids: Vec<Uuid>,
) -> Result<Vec<Uuid>, DbErr> {
    let pending: Vec<Uuid> = messages::Entity::find()
        .select_only()
        .column(messages::Column::Id)
        .filter(messages::Column::ContractId.eq(contract_id))
        .filter(messages::Column::SenderId.ne(reader_id))
        .filter(messages::Column::SeenAt.is_null())
        .filter(messages::Column::Id.is_in(ids))
        .into_tuple()
        .all(db)
        .await?;

    if pending.is_empty() {
        return Ok(pending);
    }

    messages::Entity::update_many()
        .col_expr(messages::Column::SeenAt, Expr::value(chrono::Utc::now()))
        .filter(messages::Column::Id.is_in(pending.clone()))
        .exec(db)
        .await?;

    Ok(pending)
}

pub async fn delete_message(db: &DatabaseConnection, id: Uuid) -> Result<DeleteResult, DbErr> {
    messages::Entity::delete_by_id(id).exec(db).await
}
