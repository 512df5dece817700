use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dto::{
        format_system_time,
        validation::{validate_topic, validate_user_id},
    },
    state::room::{Difficulty, Player, Room, RoomStatus},
};

/// Player identity and optional preferences, used by room creation and join.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInput {
    /// Stable id issued by the authentication provider.
    #[validate(custom(function = "validate_user_id"))]
    pub id: String,
    #[validate(length(min = 1, max = 40))]
    pub name: String,
    #[serde(default)]
    #[validate(custom(function = "validate_topic"))]
    pub topic: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

impl From<PlayerInput> for Player {
    fn from(input: PlayerInput) -> Self {
        Player::new(input.id, input.name.trim(), input.topic, input.difficulty)
    }
}

/// Payload used to open a new room.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    #[validate(length(min = 1, max = 60))]
    pub name: String,
    #[validate(range(min = 2, max = 12))]
    pub max_players: u32,
    #[validate(nested)]
    pub host: PlayerInput,
}

/// Payload identifying the caller of a room operation.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RoomMemberRequest {
    #[validate(custom(function = "validate_user_id"))]
    pub user_id: String,
}

/// Topic and difficulty chosen by a member.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurePlayerRequest {
    #[validate(custom(function = "validate_user_id"))]
    pub user_id: String,
    #[serde(default)]
    #[validate(custom(function = "validate_topic"))]
    pub topic: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

/// Public projection of a room member.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: String,
    pub name: String,
    pub is_host: bool,
    /// True once both topic and difficulty are set.
    pub configured: bool,
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
}

/// Public projection of a room.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub code: String,
    pub name: String,
    pub max_players: u32,
    pub status: RoomStatus,
    pub created_at: String,
    pub round: u32,
    pub players: Vec<PlayerView>,
}

/// Response to room creation.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub success: bool,
    pub room_code: String,
    pub room: RoomView,
}

/// Response carrying the room after a join or configure.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomResponse {
    pub success: bool,
    pub room: RoomView,
}

/// Response to a departure; `room` is null once the room was deleted.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaveRoomResponse {
    pub success: bool,
    pub room: Option<RoomView>,
}

/// Response to a match start with what the question generation should use.
#[derive(Debug, Serialize, ToSchema)]
pub struct StartMatchResponse {
    pub success: bool,
    pub room: RoomView,
    /// Configured topics, deduplicated, in join order.
    pub topics: Vec<String>,
    pub difficulty: Difficulty,
    pub round: u32,
}

impl From<&Player> for PlayerView {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            name: player.name.clone(),
            is_host: player.is_host,
            configured: player.configured(),
            topic: player.topic.clone(),
            difficulty: player.difficulty,
        }
    }
}

impl From<&Room> for RoomView {
    fn from(room: &Room) -> Self {
        Self {
            code: room.code.clone(),
            name: room.name.clone(),
            max_players: room.max_players,
            status: room.status,
            created_at: format_system_time(room.created_at),
            round: room.round,
            players: room.players.iter().map(Into::into).collect(),
        }
    }
}
