use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dao::models::{MatchResultEntity, RoomEntity, result_key};

pub const ROOM_PREFIX: &str = "room::";
pub const RESULT_PREFIX: &str = "result::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    #[serde(default)]
    pub doc: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchRoomDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub room: RoomEntity,
}

impl CouchRoomDocument {
    pub fn from_entity(room: RoomEntity, rev: Option<String>) -> Self {
        Self {
            id: room_doc_id(&room.code),
            rev,
            room,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchResultDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub result: MatchResultEntity,
}

impl From<MatchResultEntity> for CouchResultDocument {
    fn from(result: MatchResultEntity) -> Self {
        Self {
            id: format!("{RESULT_PREFIX}{}", result.key()),
            rev: None,
            result,
        }
    }
}

pub fn room_doc_id(code: &str) -> String {
    format!("{ROOM_PREFIX}{code}")
}

/// Prefix shared by every result of one round of a room.
pub fn round_results_prefix(code: &str, round: u32) -> String {
    format!("{RESULT_PREFIX}{}", result_key(code, round, ""))
}
