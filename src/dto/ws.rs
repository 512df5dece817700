use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::{
    dto::{
        room::RoomView,
        validation::{validate_room_code, validate_topic, validate_user_id},
    },
    state::room::Difficulty,
};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
/// Messages accepted from room WebSocket clients.
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RoomInboundMessage {
    /// Subscribe the socket to a room it is a member of.
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_code: String, user_id: String },
    /// Leave the room and unsubscribe.
    #[serde(rename_all = "camelCase")]
    LeaveRoom { room_code: String, user_id: String },
    /// Store topic and difficulty, then notify the room.
    #[serde(rename_all = "camelCase")]
    UserConfigured {
        room_code: String,
        user_id: String,
        #[serde(default)]
        topic: Option<String>,
        #[serde(default)]
        difficulty: Option<Difficulty>,
    },
    /// Host starts the match.
    #[serde(rename_all = "camelCase")]
    StartGame { room_code: String, user_id: String },
    #[serde(other)]
    Unknown,
}

/// Reasons an inbound frame is refused.
#[derive(Debug, Error)]
pub enum InboundMessageError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid `{field}`: {message}")]
    Invalid { field: &'static str, message: String },
}

impl RoomInboundMessage {
    /// Parse and validate a text frame.
    pub fn from_json_str(text: &str) -> Result<Self, InboundMessageError> {
        let message: Self = serde_json::from_str(text)?;
        message.validate()?;
        Ok(message)
    }

    /// Room code and user id carried by the message, if any.
    pub fn target(&self) -> Option<(&str, &str)> {
        match self {
            Self::JoinRoom { room_code, user_id }
            | Self::LeaveRoom { room_code, user_id }
            | Self::UserConfigured {
                room_code, user_id, ..
            }
            | Self::StartGame { room_code, user_id } => Some((room_code.as_str(), user_id.as_str())),
            Self::Unknown => None,
        }
    }

    fn validate(&self) -> Result<(), InboundMessageError> {
        let invalid = |field: &'static str| {
            move |err: validator::ValidationError| InboundMessageError::Invalid {
                field,
                message: err
                    .message
                    .map(|message| message.into_owned())
                    .unwrap_or_else(|| err.code.into_owned()),
            }
        };

        if let Some((room_code, user_id)) = self.target() {
            validate_room_code(room_code).map_err(invalid("roomCode"))?;
            validate_user_id(user_id).map_err(invalid("userId"))?;
        }
        if let Self::UserConfigured {
            topic: Some(topic), ..
        } = self
        {
            validate_topic(topic).map_err(invalid("topic"))?;
        }
        Ok(())
    }
}

/// Payload of `user-joined`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserJoinedEvent {
    pub room_code: String,
    pub user_id: String,
    pub username: String,
    pub room: RoomView,
}

/// Payload of `user-left`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserLeftEvent {
    pub room_code: String,
    pub user_id: String,
    /// Set when the departing player was the host.
    pub new_host_id: Option<String>,
    /// Null once the room was deleted.
    pub room: Option<RoomView>,
}

/// Payload of `user-configured`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserConfiguredEvent {
    pub room_code: String,
    pub user_id: String,
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub configured: bool,
}

/// Payload of `game-started`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameStartedEvent {
    pub room_code: String,
    pub round: u32,
    pub topics: Vec<String>,
    pub difficulty: Difficulty,
}

/// Payload of `error`, sent to the offending socket only.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorEvent {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kebab_case_types_with_camel_case_fields() {
        let message = RoomInboundMessage::from_json_str(
            r#"{"type":"user-configured","roomCode":"ABC123","userId":"u1","topic":"space","difficulty":"baby"}"#,
        )
        .unwrap();
        assert_eq!(
            message,
            RoomInboundMessage::UserConfigured {
                room_code: "ABC123".into(),
                user_id: "u1".into(),
                topic: Some("space".into()),
                difficulty: Some(Difficulty::Easy),
            }
        );
    }

    #[test]
    fn unknown_types_are_tolerated() {
        let message = RoomInboundMessage::from_json_str(r#"{"type":"dance"}"#).unwrap();
        assert_eq!(message, RoomInboundMessage::Unknown);
        assert!(message.target().is_none());
    }

    #[test]
    fn invalid_fields_are_rejected() {
        let err = RoomInboundMessage::from_json_str(
            r#"{"type":"join-room","roomCode":"abc","userId":"u1"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, InboundMessageError::Invalid { field: "roomCode", .. }));

        assert!(matches!(
            RoomInboundMessage::from_json_str("{not json"),
            Err(InboundMessageError::Malformed(_))
        ));
    }
}
