//! Contract chat shared by the REST routes and the WebSocket session.

use sea_orm::DatabaseConnection;
use uuid::Uuid;
use validator::Validate;

use crate::auth::authorization::{verify_chat_access, verify_contract_party};
use crate::chat::protocol::ServerMessage;
use crate::db::messages as message_db;
use crate::error::AppError;
use crate::models::PaginationQuery;
use crate::models::messages::{self, SendMessage};
use crate::realtime::{Channel, EventHub};

async fn publish(hub: &EventHub, contract_id: Uuid, message: ServerMessage) {
    if let Err(e) = hub.broadcast(Channel::Contract(contract_id), message, None).await {
        tracing::warn!(contract_id = %contract_id, error = %e, "chat broadcast failed");
    }
}

/// Store a message on an active contract and push it to the room.
pub async fn send_message(
    db: &DatabaseConnection,
    hub: &EventHub,
    sender_id: Uuid,
    contract_id: Uuid,
    input: SendMessage,
) -> Result<messages::Model, AppError> {
    input.validate()?;
    if input.content.trim().is_empty() {
        return Err(AppError::Validation("Message cannot be blank".to_string()));
    }
    verify_chat_access(db, contract_id, sender_id).await?;

    let saved = message_db::insert_message(db, contract_id, sender_id, input.content).await?;
    tracing::debug!(contract_id = %contract_id, message_id = %saved.id, "chat message stored");

    publish(hub, contract_id, ServerMessage::from(&saved)).await;
    Ok(saved)
}

/// Conversation for a contract, oldest first. Either party may read it,
/// whatever the contract status.
pub async fn history(
    db: &DatabaseConnection,
    user_id: Uuid,
    contract_id: Uuid,
    pagination: &PaginationQuery,
) -> Result<Vec<messages::Model>, AppError> {
    verify_contract_party(db, contract_id, user_id).await?;
    Ok(message_db::get_history(db, contract_id, pagination.page(), pagination.limit()).await?)
}

/// Mark received messages seen. Returns the ids that changed.
pub async fn mark_seen(
    db: &DatabaseConnection,
    hub: &EventHub,
    user_id: Uuid,
    contract_id: Uuid,
    message_ids: Vec<Uuid>,
) -> Result<Vec<Uuid>, AppError> {
    verify_contract_party(db, contract_id, user_id).await?;
    if message_ids.is_empty() {
        return Ok(Vec::new());
    }

    let seen = message_db::mark_seen(db, contract_id, user_id, message_ids).await?;
    if !seen.is_empty() {
        publish(
            hub,
            contract_id,
            ServerMessage::MessagesSeen {
                message_ids: seen.clone(),
                seen_by: user_id,
            },
        )
        .await;
    }
    Ok(seen)
}

/// Senders may take back their own messages.
pub async fn delete_message(
    db: &DatabaseConnection,
    hub: &EventHub,
    user_id: Uuid,
    message_id: Uuid,
) -> Result<(), AppError> {
    let message = message_db::get_message_by_id(db, message_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Message {message_id} not found")))?;

    if message.sender_id != user_id {
        return Err(AppError::Authorization(
            "You can only delete your own messages".to_string(),
        ));
    }

    message_db::delete_message(db, message_id).await?;
    tracing::info!(message_id = %message_id, contract_id = %message.contract_id, "chat message deleted");

    publish(hub, message.contract_id, ServerMessage::MessageDeleted { message_id }).await;
    Ok(())
}
