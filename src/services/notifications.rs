use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::chat::protocol::ServerMessage;
use crate::db::notifications as notification_db;
use crate::error::AppError;
use crate::models::PaginationQuery;
use crate::models::notifications::{self, NewNotification};
use crate::realtime::{Channel, EventHub};

/// Persist a notification and push it to the recipient's live connections.
///
/// Best-effort: failures are logged and never fail the caller's operation.
pub async fn notify(
    db: &DatabaseConnection,
    hub: &EventHub,
    input: NewNotification,
) -> Option<notifications::Model> {
    let user_id = input.user_id;

    let saved = match notification_db::insert_notification(db, input).await {
        Ok(saved) => saved,
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "failed to store notification");
            return None;
        }
    };

    if !hub.is_user_online(Channel::User(user_id), user_id).await {
        tracing::debug!(user_id = %user_id, "recipient offline, notification stored only");
        return Some(saved);
    }

    if let Err(e) = hub.notify_user(user_id, ServerMessage::from(&saved)).await {
        tracing::warn!(user_id = %user_id, error = %e, "failed to push notification");
    }

    Some(saved)
}

pub async fn list(
    db: &DatabaseConnection,
    user_id: Uuid,
    pagination: &PaginationQuery,
) -> Result<Vec<notifications::Model>, AppError> {
    Ok(notification_db::get_notifications_for_user(
        db,
        user_id,
        pagination.page(),
        pagination.limit(),
    )
    .await?)
}

pub async fn mark_read(db: &DatabaseConnection, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
    let updated = notification_db::mark_read(db, id, user_id).await?;
    if updated == 0 {
        return Err(AppError::NotFound(format!("Notification {id} not found")));
    }
    Ok(())
}

pub async fn mark_all_read(db: &DatabaseConnection, user_id: Uuid) -> Result<u64, AppError> {
    Ok(notification_db::mark_all_read(db, user_id).await?)
}
