use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::state::{
    ranking::MatchResult,
    room::{Difficulty, Player, Room, RoomStatus},
};

/// Room aggregate as persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomEntity {
    /// Primary key: the 6-character room code.
    pub code: String,
    /// Display name of the room.
    pub name: String,
    /// Capacity fixed at creation.
    pub max_players: u32,
    /// Lifecycle status.
    pub status: RoomStatus,
    /// Creation timestamp, immutable.
    pub created_at: SystemTime,
    /// Members in join order.
    pub players: Vec<PlayerEntity>,
    /// Compare-and-swap token bumped on every write.
    pub version: u64,
    /// Match counter.
    #[serde(default)]
    pub round: u32,
    /// Whether the ranking of `round` has been published.
    #[serde(default)]
    pub ranking_published: bool,
}

/// Player embedded in a [`RoomEntity`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Identity from the authentication provider.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Whether the player currently hosts the room.
    pub is_host: bool,
    /// Chosen topic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Chosen difficulty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
}

/// One submitted match result, keyed by `(room_code, round, user_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchResultEntity {
    /// Partition key.
    pub room_code: String,
    /// Round of the room the result belongs to.
    pub round: u32,
    /// Reporting player.
    pub user_id: String,
    /// Display name at submission time.
    pub username: String,
    /// Correct-answer count.
    pub score: u32,
    /// Time spent answering, in seconds.
    pub elapsed_seconds: u32,
    /// Topic the player configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Difficulty the player configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    /// Arrival timestamp.
    pub submitted_at: SystemTime,
}

impl MatchResultEntity {
    /// Composite key identifying the result inside its store.
    pub fn key(&self) -> String {
        result_key(&self.room_code, self.round, &self.user_id)
    }
}

/// Composite key of a match result.
pub fn result_key(room_code: &str, round: u32, user_id: &str) -> String {
    format!("{room_code}::{round}::{user_id}")
}

impl From<Room> for RoomEntity {
    fn from(room: Room) -> Self {
        Self {
            code: room.code,
            name: room.name,
            max_players: room.max_players,
            status: room.status,
            created_at: room.created_at,
            players: room.players.into_iter().map(Into::into).collect(),
            version: room.version,
            round: room.round,
            ranking_published: room.ranking_published,
        }
    }
}

impl From<RoomEntity> for Room {
    fn from(entity: RoomEntity) -> Self {
        Self {
            code: entity.code,
            name: entity.name,
            max_players: entity.max_players,
            status: entity.status,
            created_at: entity.created_at,
            players: entity.players.into_iter().map(Into::into).collect(),
            version: entity.version,
            round: entity.round,
            ranking_published: entity.ranking_published,
        }
    }
}

impl From<Player> for PlayerEntity {
    fn from(player: Player) -> Self {
        Self {
            id: player.id,
            name: player.name,
            is_host: player.is_host,
            topic: player.topic,
            difficulty: player.difficulty,
        }
    }
}

impl From<PlayerEntity> for Player {
    fn from(entity: PlayerEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            is_host: entity.is_host,
            topic: entity.topic,
            difficulty: entity.difficulty,
        }
    }
}

impl From<MatchResult> for MatchResultEntity {
    fn from(result: MatchResult) -> Self {
        Self {
            room_code: result.room_code,
            round: result.round,
            user_id: result.user_id,
            username: result.username,
            score: result.score,
            elapsed_seconds: result.elapsed_seconds,
            topic: result.topic,
            difficulty: result.difficulty,
            submitted_at: result.submitted_at,
        }
    }
}

impl From<MatchResultEntity> for MatchResult {
    fn from(entity: MatchResultEntity) -> Self {
        Self {
            room_code: entity.room_code,
            round: entity.round,
            user_id: entity.user_id,
            username: entity.username,
            score: entity.score,
            elapsed_seconds: entity.elapsed_seconds,
            topic: entity.topic,
            difficulty: entity.difficulty,
            submitted_at: entity.submitted_at,
        }
    }
}
