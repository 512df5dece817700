use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dto::validation::{validate_room_code, validate_topic, validate_user_id},
    state::{ranking::RankingEntry, room::Difficulty},
};

/// One player's outcome, reported once the player finished answering.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResultRequest {
    #[validate(custom(function = "validate_room_code"))]
    pub room_code: String,
    #[validate(custom(function = "validate_user_id"))]
    pub user_id: String,
    #[validate(length(min = 1, max = 40))]
    pub username: String,
    /// Correct answers.
    pub score: u32,
    pub elapsed_seconds: u32,
    #[serde(default)]
    #[validate(custom(function = "validate_topic"))]
    pub topic: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

/// Position in the final ranking of a match.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntryView {
    pub user_id: String,
    pub username: String,
    pub score: u32,
    pub elapsed_seconds: u32,
    pub percentage: u32,
    pub rank: u32,
}

/// Some players have not reported yet.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WaitingForPlayers {
    pub success: bool,
    /// Always `false`.
    pub all_players_finished: bool,
    pub players_finished: usize,
    pub total_players: usize,
    pub message: String,
}

/// Every player reported; also the payload of the `game-results` event.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchFinished {
    pub success: bool,
    /// Always `true`.
    pub all_players_finished: bool,
    pub ranking: Vec<RankingEntryView>,
    pub winner: RankingEntryView,
    /// Number of ranked players, including members who left after reporting.
    pub total_players: usize,
    pub room_code: String,
    pub round: u32,
    /// Topics of the room, as used for question generation.
    pub topics: Vec<String>,
    /// Difficulty of the room.
    pub difficulty: Difficulty,
}

/// Outcome of a result submission, discriminated by `allPlayersFinished`.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(untagged)]
pub enum SubmitResultResponse {
    Waiting(WaitingForPlayers),
    Finished(MatchFinished),
}

impl WaitingForPlayers {
    /// Progress report for `reported` out of `expected` players.
    pub fn new(reported: usize, expected: usize) -> Self {
        let missing = expected.saturating_sub(reported);
        Self {
            success: true,
            all_players_finished: false,
            players_finished: reported,
            total_players: expected,
            message: format!("waiting for {missing} more player(s)"),
        }
    }
}

impl From<RankingEntry> for RankingEntryView {
    fn from(entry: RankingEntry) -> Self {
        Self {
            user_id: entry.user_id,
            username: entry.username,
            score: entry.score,
            elapsed_seconds: entry.elapsed_seconds,
            percentage: entry.percentage,
            rank: entry.rank,
        }
    }
}
