//! Realtime push
//!
//! Each user has a broadcast channel ("room"). WebSocket connections
//! subscribe after the client joins; services push notification messages.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use va_core::Id;

const ROOM_CAPACITY: usize = 64;

/// Frame sent to connected clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum PushMessage {
    NewNotification { message: String },
}

impl PushMessage {
    pub fn notification(message: impl Into<String>) -> Self {
        PushMessage::NewNotification {
            message: message.into(),
        }
    }
}

/// Per-user broadcast rooms
#[derive(Debug, Default)]
pub struct NotificationHub {
    rooms: DashMap<Id, broadcast::Sender<PushMessage>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the room of `user_id`
    pub fn subscribe(&self, user_id: Id) -> broadcast::Receiver<PushMessage> {
        self.rooms
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    /// Deliver to every connection of `user_id`, returning how many received it
    pub fn push(&self, user_id: Id, message: PushMessage) -> usize {
        let delivered = match self.rooms.get(&user_id) {
            Some(room) => room.send(message).unwrap_or(0),
            None => 0,
        };
        if delivered == 0 {
            self.rooms.remove_if(&user_id, |_, room| room.receiver_count() == 0);
        }
        tracing::debug!(user_id = %user_id, delivered, "Realtime push");
        delivered
    }

    /// Number of rooms with at least one listener
    pub fn active_rooms(&self) -> usize {
        self.rooms.iter().filter(|r| r.receiver_count() > 0).count()
    }
}
