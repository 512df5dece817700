use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};

use crate::{
    dao::models::{MatchResultEntity, PlayerEntity, RoomEntity},
    state::room::{Difficulty, RoomStatus},
};

use super::error::MongoDaoError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRoomDocument {
    #[serde(rename = "_id")]
    code: String,
    name: String,
    max_players: i64,
    status: RoomStatus,
    created_at: DateTime,
    players: Vec<PlayerEntity>,
    version: i64,
    #[serde(default)]
    round: i64,
    #[serde(default)]
    ranking_published: bool,
}

impl From<RoomEntity> for MongoRoomDocument {
    fn from(value: RoomEntity) -> Self {
        Self {
            code: value.code,
            name: value.name,
            max_players: i64::from(value.max_players),
            status: value.status,
            created_at: DateTime::from_system_time(value.created_at),
            players: value.players,
            version: value.version as i64,
            round: i64::from(value.round),
            ranking_published: value.ranking_published,
        }
    }
}

impl TryFrom<MongoRoomDocument> for RoomEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoRoomDocument) -> Result<Self, Self::Error> {
        let invalid = |field: &str| MongoDaoError::Decode {
            key: value.code.clone(),
            message: format!("field `{field}` is out of range"),
        };
        let max_players = u32::try_from(value.max_players).map_err(|_| invalid("max_players"))?;
        let version = u64::try_from(value.version).map_err(|_| invalid("version"))?;
        let round = u32::try_from(value.round).map_err(|_| invalid("round"))?;

        Ok(Self {
            code: value.code,
            name: value.name,
            max_players,
            status: value.status,
            created_at: value.created_at.to_system_time(),
            players: value.players,
            version,
            round,
            ranking_published: value.ranking_published,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoResultDocument {
    #[serde(rename = "_id")]
    key: String,
    room_code: String,
    round: i64,
    user_id: String,
    username: String,
    score: i64,
    elapsed_seconds: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    difficulty: Option<Difficulty>,
    submitted_at: DateTime,
}

impl MongoResultDocument {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl From<MatchResultEntity> for MongoResultDocument {
    fn from(value: MatchResultEntity) -> Self {
        Self {
            key: value.key(),
            room_code: value.room_code,
            round: i64::from(value.round),
            user_id: value.user_id,
            username: value.username,
            score: i64::from(value.score),
            elapsed_seconds: i64::from(value.elapsed_seconds),
            topic: value.topic,
            difficulty: value.difficulty,
            submitted_at: DateTime::from_system_time(value.submitted_at),
        }
    }
}

impl TryFrom<MongoResultDocument> for MatchResultEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoResultDocument) -> Result<Self, Self::Error> {
        let invalid = |field: &str| MongoDaoError::Decode {
            key: value.key.clone(),
            message: format!("field `{field}` is out of range"),
        };
        let round = u32::try_from(value.round).map_err(|_| invalid("round"))?;
        let score = u32::try_from(value.score).map_err(|_| invalid("score"))?;
        let elapsed_seconds =
            u32::try_from(value.elapsed_seconds).map_err(|_| invalid("elapsed_seconds"))?;

        Ok(Self {
            room_code: value.room_code,
            round,
            user_id: value.user_id,
            username: value.username,
            score,
            elapsed_seconds,
            topic: value.topic,
            difficulty: value.difficulty,
            submitted_at: value.submitted_at.to_system_time(),
        })
    }
}

pub fn doc_id(id: &str) -> Document {
    doc! {"_id": id}
}

pub fn versioned_doc_id(id: &str, version: u64) -> Document {
    doc! {"_id": id, "version": version as i64}
}
