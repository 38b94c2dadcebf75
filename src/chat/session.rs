use actix_web::{HttpRequest, HttpResponse, web};
use actix_ws::Message;
use futures_util::StreamExt;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::auth::authorization::verify_chat_access;
use crate::auth::middleware::authenticate_token;
use crate::chat::protocol::{ClientMessage, ServerMessage};
use crate::config::JwtConfig;
use crate::error::AppError;
use crate::models::messages::SendMessage;
use crate::realtime::{Channel, EventHub};
use crate::services::messages as message_service;

/// Query params for the WebSocket handshake endpoints.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    pub token: String,
}

/// GET /api/chat/ws/{contract_id}?token=<jwt>
///
/// Upgrades the HTTP connection to a WebSocket chat session. The token comes
/// in the query string because browsers can't set headers on the handshake.
/// The caller must be a party to an active contract.
pub async fn ws_connect(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<Uuid>,
    query: web::Query<WsQuery>,
    db: web::Data<DatabaseConnection>,
    jwt_config: web::Data<JwtConfig>,
    hub: web::Data<Arc<EventHub>>,
) -> Result<HttpResponse, actix_web::Error> {
    let contract_id = path.into_inner();

    let user = authenticate_token(db.get_ref(), jwt_config.get_ref(), &query.token).await?;
    verify_chat_access(db.get_ref(), contract_id, user.id).await?;

    let channel = Channel::Contract(contract_id);
    let rx = hub
        .join(channel, user.id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let (response, session, msg_stream) = match actix_ws::handle(&req, stream) {
        Ok(parts) => parts,
        Err(e) => {
            hub.leave(channel, user.id).await;
            return Err(e);
        }
    };

    tracing::info!(contract_id = %contract_id, user_id = %user.id, "chat session opened");

    actix_web::rt::spawn(handle_ws_session(
        session,
        msg_stream,
        rx,
        channel,
        user.id,
        Some(db.get_ref().clone()),
        hub.get_ref().clone(),
    ));

    Ok(response)
}

/// GET /api/notifications/ws?token=<jwt>
///
/// Streams the caller's notifications as they are created.
pub async fn notifications_ws(
    req: HttpRequest,
    stream: web::Payload,
    query: web::Query<WsQuery>,
    db: web::Data<DatabaseConnection>,
    jwt_config: web::Data<JwtConfig>,
    hub: web::Data<Arc<EventHub>>,
) -> Result<HttpResponse, actix_web::Error> {
    let user = authenticate_token(db.get_ref(), jwt_config.get_ref(), &query.token).await?;

    let channel = Channel::User(user.id);
    let rx = hub
        .join(channel, user.id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let (response, session, msg_stream) = match actix_ws::handle(&req, stream) {
        Ok(parts) => parts,
        Err(e) => {
            hub.leave(channel, user.id).await;
            return Err(e);
        }
    };

    actix_web::rt::spawn(handle_ws_session(
        session,
        msg_stream,
        rx,
        channel,
        user.id,
        None,
        hub.get_ref().clone(),
    ));

    Ok(response)
}

/// Drives one socket: forwards hub events out, and on chat channels handles
/// client messages. `db` is only present for chat sessions.
async fn handle_ws_session(
    mut session: actix_ws::Session,
    mut msg_stream: actix_ws::MessageStream,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
    channel: Channel,
    user_id: Uuid,
    db: Option<DatabaseConnection>,
    hub: Arc<EventHub>,
) {
    loop {
        tokio::select! {
            Some(msg) = msg_stream.next() => {
                match msg {
                    Ok(Message::Text(text)) => {
                        match (&db, channel) {
                            (Some(db), Channel::Contract(contract_id)) => {
                                handle_client_message(&text, &mut session, contract_id, user_id, db, &hub).await;
                            }
                            _ => {
                                // Notification streams are push-only.
                                send(&mut session, &ServerMessage::Error {
                                    message: "This channel does not accept messages".to_string(),
                                }).await;
                            }
                        }
                    }
                    Ok(Message::Ping(bytes)) => {
                        if session.pong(&bytes).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) | Err(_) => break,
                    _ => {}
                }
            }
            Some(server_msg) = rx.recv() => {
                let json = match serde_json::to_string(&server_msg) {
                    Ok(j) => j,
                    Err(_) => continue,
                };
                if session.text(json).await.is_err() {
                    break;
                }
            }
            else => break,
        }
    }

    hub.leave(channel, user_id).await;
    let _ = session.close(None).await;
    tracing::debug!(user_id = %user_id, ?channel, "websocket session closed");
}

async fn send(session: &mut actix_ws::Session, msg: &ServerMessage) {
    if let Ok(json) = serde_json::to_string(msg) {
        let _ = session.text(json).await;
    }
}

async fn handle_client_message(
    text: &str,
    session: &mut actix_ws::Session,
    contract_id: Uuid,
    user_id: Uuid,
    db: &DatabaseConnection,
    hub: &EventHub,
) {
    let client_msg: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            send(session, &ServerMessage::Error {
                message: format!("Invalid message format: {e}"),
            })
            .await;
            return;
        }
    };

    let result = match client_msg {
        ClientMessage::SendMessage { content } => {
            message_service::send_message(db, hub, user_id, contract_id, SendMessage { content })
                .await
                .map(|_| ())
        }
        ClientMessage::MarkSeen { message_ids } => {
            message_service::mark_seen(db, hub, user_id, contract_id, message_ids)
                .await
                .map(|_| ())
        }
        ClientMessage::Typing => {
            let _ = hub
                .broadcast(Channel::Contract(contract_id), ServerMessage::UserTyping { user_id }, Some(user_id))
                .await;
            Ok(())
        }
        ClientMessage::StopTyping => {
            let _ = hub
                .broadcast(
                    Channel::Contract(contract_id),
                    ServerMessage::UserStopTyping { user_id },
                    Some(user_id),
                )
                .await;
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::warn!(contract_id = %contract_id, user_id = %user_id, error = %e, "chat frame rejected");
        send(session, &ServerMessage::Error {
            message: e.to_string(),
        })
        .await;
    }
}
