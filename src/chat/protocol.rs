use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::messages;
use crate::models::notifications::{self, NotificationKind};

// ── Client -> Server messages ──

/// Frames accepted on a contract chat socket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    SendMessage { content: String },
    MarkSeen { message_ids: Vec<Uuid> },
    Typing,
    StopTyping,
}

// ── Server -> Client messages ──

/// Messages the server pushes over either socket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A stored chat message, echoed to its sender as well.
    NewMessage {
        id: Uuid,
        contract_id: Uuid,
        sender_id: Uuid,
        content: String,
        created_at: String,
    },
    MessagesSeen { message_ids: Vec<Uuid>, seen_by: Uuid },
    MessageDeleted { message_id: Uuid },
    UserTyping { user_id: Uuid },
    UserStopTyping { user_id: Uuid },
    /// A party joined or left the contract chat.
    Presence { user_id: Uuid, online: bool },
    /// A persisted notification for the connected user.
    Notification {
        id: Uuid,
        kind: NotificationKind,
        message: String,
        link: Option<String>,
        created_at: String,
    },
    /// An error occurred.
    Error { message: String },
}

impl From<&messages::Model> for ServerMessage {
    fn from(m: &messages::Model) -> Self {
        ServerMessage::NewMessage {
            id: m.id,
            contract_id: m.contract_id,
            sender_id: m.sender_id,
            content: m.content.clone(),
            created_at: m.created_at.to_rfc3339(),
        }
    }
}

impl From<&notifications::Model> for ServerMessage {
    fn from(n: &notifications::Model) -> Self {
        ServerMessage::Notification {
            id: n.id,
            kind: n.kind,
            message: n.message.clone(),
            link: n.link.clone(),
            created_at: n.created_at.to_rfc3339(),
        }
    }
}
