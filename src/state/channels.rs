//! Channel-per-room fan-out of realtime events.
//!
//! Delivery is best effort: events are pushed onto each member's unbounded
//! socket queue and forgotten. Nothing is persisted or replayed.

use std::collections::HashMap;

use axum::extract::ws::Message;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// A user joined the room.
pub const USER_JOINED: &str = "user-joined";
/// A user left the room.
pub const USER_LEFT: &str = "user-left";
/// A user picked a topic and difficulty.
pub const USER_CONFIGURED: &str = "user-configured";
/// The host started a match.
pub const GAME_STARTED: &str = "game-started";
/// Every player reported; carries the final ranking.
pub const GAME_RESULTS: &str = "game-results";
/// Sent only to the socket whose request failed.
pub const ERROR: &str = "error";

/// Outbound frame: `{"event": ..., "data": ...}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RoomEvent {
    /// Event name, e.g. `user-joined`.
    pub event: String,
    /// Event payload.
    pub data: Value,
}

impl RoomEvent {
    /// Build an event from any serializable payload.
    pub fn json<T: Serialize>(event: &str, data: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event: event.to_owned(),
            data: serde_json::to_value(data)?,
        })
    }

    /// Queue the event on a single socket; `false` once its writer is gone.
    pub fn send_to(&self, tx: &mpsc::UnboundedSender<Message>) -> bool {
        match self.to_message() {
            Some(message) => tx.send(message).is_ok(),
            None => true,
        }
    }

    fn to_message(&self) -> Option<Message> {
        match serde_json::to_string(self) {
            Ok(text) => Some(Message::Text(text.into())),
            Err(err) => {
                warn!(event = %self.event, error = %err, "failed to serialize room event");
                None
            }
        }
    }
}

/// Socket subscribed to a room channel.
#[derive(Clone)]
pub struct RoomMember {
    /// Subscribed user.
    pub user_id: String,
    /// Distinguishes reconnections of the same user.
    pub connection_id: Uuid,
    /// Writer half of the socket.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Registry of room channels keyed by room code, then user id.
#[derive(Default)]
pub struct RoomChannels {
    rooms: DashMap<String, HashMap<String, RoomMember>>,
}

impl RoomChannels {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a member, replacing any older connection of the same user.
    pub fn join(&self, room_code: &str, member: RoomMember) {
        debug!(room = %room_code, user = %member.user_id, "socket joined room channel");
        self.rooms
            .entry(room_code.to_owned())
            .or_default()
            .insert(member.user_id.clone(), member);
    }

    /// Unsubscribe `user_id` if it is still bound to `connection_id`.
    pub fn leave(&self, room_code: &str, user_id: &str, connection_id: Uuid) -> bool {
        let removed = self
            .rooms
            .get_mut(room_code)
            .map(|mut members| {
                let owned = members
                    .get(user_id)
                    .is_some_and(|member| member.connection_id == connection_id);
                if owned {
                    members.remove(user_id);
                }
                owned
            })
            .unwrap_or(false);
        self.rooms.remove_if(room_code, |_, members| members.is_empty());
        removed
    }

    /// Push `event` to every member except `except`; returns how many queues accepted it.
    pub fn publish(&self, room_code: &str, event: &RoomEvent, except: Option<&str>) -> usize {
        let Some(message) = event.to_message() else {
            return 0;
        };

        let delivered = match self.rooms.get_mut(room_code) {
            Some(mut members) => {
                let mut delivered = 0;
                members.retain(|user_id, member| {
                    if except == Some(user_id.as_str()) {
                        return true;
                    }
                    if member.tx.send(message.clone()).is_ok() {
                        delivered += 1;
                        true
                    } else {
                        debug!(room = %room_code, user = %user_id, "pruning closed socket");
                        false
                    }
                });
                delivered
            }
            None => 0,
        };
        self.rooms.remove_if(room_code, |_, members| members.is_empty());

        debug!(room = %room_code, event = %event.event, delivered, "room event published");
        delivered
    }
}
