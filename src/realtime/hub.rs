use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::chat::protocol::ServerMessage;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HubError {
    #[error("event hub has not been started")]
    NotStarted,
}

/// Where an event is delivered: a contract chat room or one user's
/// notification stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Contract(Uuid),
    User(Uuid),
}

/// A handle to send messages to a connected WebSocket client.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    pub user_id: Uuid,
    pub sender: mpsc::UnboundedSender<ServerMessage>,
}

/// Fan-out of realtime events to connected WebSocket clients.
///
/// Constructed in `main`, started explicitly, and handed to handlers as
/// `web::Data<Arc<EventHub>>`. Until [`EventHub::start`] is called every
/// publish or join fails with [`HubError::NotStarted`]. Delivery is
/// fire-and-forget: no acknowledgement, no retry.
pub struct EventHub {
    started: AtomicBool,
    /// channel -> list of connected client handles
    rooms: RwLock<HashMap<Channel, Vec<ClientHandle>>>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            started: AtomicBool::new(false),
            rooms: RwLock::new(HashMap::new()),
        }
    }

    pub fn start(&self) {
        self.started.store(true, Ordering::Release);
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    fn ensure_started(&self) -> Result<(), HubError> {
        if self.is_started() {
            Ok(())
        } else {
            Err(HubError::NotStarted)
        }
    }

    /// Register a connection on a channel. Returns the receiver the session
    /// should forward to its socket.
    pub async fn join(
        &self,
        channel: Channel,
        user_id: Uuid,
    ) -> Result<mpsc::UnboundedReceiver<ServerMessage>, HubError> {
        self.ensure_started()?;
        let (tx, rx) = mpsc::unbounded_channel();

        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(channel).or_default();

        // Chat rooms announce presence to the members already connected.
        if let Channel::Contract(_) = channel {
            let presence_msg = ServerMessage::Presence {
                user_id,
                online: true,
            };
            for client in room.iter().filter(|c| c.user_id != user_id) {
                let _ = client.sender.send(presence_msg.clone());
            }
        }

        room.push(ClientHandle {
            user_id,
            sender: tx,
        });

        Ok(rx)
    }

    /// Remove one connection of `user_id` from a channel.
    pub async fn leave(&self, channel: Channel, user_id: Uuid) {
        let mut rooms = self.rooms.write().await;

        if let Some(room) = rooms.get_mut(&channel) {
            // A user may hold several connections; only drop one.
            if let Some(pos) = room.iter().position(|c| c.user_id == user_id) {
                room.remove(pos);
            }

            let still_connected = room.iter().any(|c| c.user_id == user_id);
            if !still_connected && matches!(channel, Channel::Contract(_)) {
                let presence_msg = ServerMessage::Presence {
                    user_id,
                    online: false,
                };
                for client in room.iter() {
                    let _ = client.sender.send(presence_msg.clone());
                }
            }

            if room.is_empty() {
                rooms.remove(&channel);
            }
        }
    }

    /// Send to everyone on a channel, optionally skipping one user.
    /// Returns how many connections accepted the message.
    pub async fn broadcast(
        &self,
        channel: Channel,
        message: ServerMessage,
        exclude_user: Option<Uuid>,
    ) -> Result<usize, HubError> {
        self.ensure_started()?;

        let rooms = self.rooms.read().await;
        let mut delivered = 0;
        if let Some(room) = rooms.get(&channel) {
            for client in room {
                if Some(client.user_id) == exclude_user {
                    continue;
                }
                // A failed send means the session is gone; leave() cleans it up.
                if client.sender.send(message.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }
        Ok(delivered)
    }

    /// Push to every notification connection of one user.
    pub async fn notify_user(
        &self,
        user_id: Uuid,
        message: ServerMessage,
    ) -> Result<usize, HubError> {
        self.broadcast(Channel::User(user_id), message, None).await
    }

    /// Check if a specific user is currently connected on a channel.
    pub async fn is_user_online(&self, channel: Channel, user_id: Uuid) -> bool {
        let rooms = self.rooms.read().await;
        rooms
            .get(&channel)
            .map(|room| room.iter().any(|c| c.user_id == user_id))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_msg(text: &str) -> ServerMessage {
        ServerMessage::Error {
            message: text.to_string(),
        }
    }

    #[tokio::test]
    async fn publishing_before_start_fails() {
        let hub = EventHub::new();
        let user = Uuid::new_v4();

        assert_eq!(
            hub.notify_user(user, error_msg("x")).await,
            Err(HubError::NotStarted)
        );
        assert!(matches!(
            hub.join(Channel::User(user), user).await,
            Err(HubError::NotStarted)
        ));
    }

    #[tokio::test]
    async fn user_channel_delivers_only_to_that_user() {
        let hub = EventHub::new();
        hub.start();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let mut alice_rx = hub.join(Channel::User(alice), alice).await.unwrap();
        let mut bob_rx = hub.join(Channel::User(bob), bob).await.unwrap();

        let delivered = hub.notify_user(alice, error_msg("hello")).await.unwrap();
        assert_eq!(delivered, 1);
        assert!(matches!(alice_rx.try_recv(), Ok(ServerMessage::Error { .. })));
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn contract_room_announces_presence_and_cleans_up() {
        let hub = EventHub::new();
        hub.start();
        let room = Channel::Contract(Uuid::new_v4());
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let mut alice_rx = hub.join(room, alice).await.unwrap();
        let _bob_rx = hub.join(room, bob).await.unwrap();

        match alice_rx.try_recv() {
            Ok(ServerMessage::Presence { user_id, online }) => {
                assert_eq!(user_id, bob);
                assert!(online);
            }
            other => panic!("expected presence, got {other:?}"),
        }

        hub.leave(room, bob).await;
        assert!(matches!(
            alice_rx.try_recv(),
            Ok(ServerMessage::Presence { online: false, .. })
        ));

        hub.leave(room, alice).await;
        assert!(!hub.is_user_online(room, alice).await);
    }

    #[tokio::test]
    async fn broadcast_can_exclude_the_sender() {
        let hub = EventHub::new();
        hub.start();
        let room = Channel::Contract(Uuid::new_v4());
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let mut alice_rx = hub.join(room, alice).await.unwrap();
        let mut bob_rx = hub.join(room, bob).await.unwrap();
        // Drain alice's presence notice for bob.
        let _ = alice_rx.try_recv();

        let delivered = hub
            .broadcast(room, ServerMessage::UserTyping { user_id: alice }, Some(alice))
            .await
            .unwrap();
        assert_eq!(delivered, 1);
        assert!(alice_rx.try_recv().is_err());
        assert!(matches!(bob_rx.try_recv(), Ok(ServerMessage::UserTyping { .. })));
    }
}
