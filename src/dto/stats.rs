use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::format_system_time,
    state::{
        ranking::{LeaderboardEntry, MatchResult},
        room::Difficulty,
    },
};

/// Standing of a user across every recorded match.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntryView {
    pub user_id: String,
    pub username: String,
    pub total_score: u64,
    pub matches_played: u32,
    pub average: f64,
    pub rank: u32,
}

/// Global leaderboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    pub success: bool,
    pub ranking: Vec<LeaderboardEntryView>,
}

/// One past match of a user.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchHistoryEntry {
    pub room_code: String,
    pub round: u32,
    pub score: u32,
    pub elapsed_seconds: u32,
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub submitted_at: String,
}

/// Personal statistics, newest match first.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserStatsResponse {
    pub success: bool,
    pub user_id: String,
    /// Most recent display name; absent when the user never played.
    pub username: Option<String>,
    pub matches_played: u32,
    pub total_score: u64,
    pub average: f64,
    pub best_score: u32,
    /// Position in the global leaderboard.
    pub rank: Option<u32>,
    pub history: Vec<MatchHistoryEntry>,
}

impl From<LeaderboardEntry> for LeaderboardEntryView {
    fn from(entry: LeaderboardEntry) -> Self {
        Self {
            user_id: entry.user_id,
            username: entry.username,
            total_score: entry.total_score,
            matches_played: entry.matches_played,
            average: entry.average,
            rank: entry.rank,
        }
    }
}

impl From<&MatchResult> for MatchHistoryEntry {
    fn from(result: &MatchResult) -> Self {
        Self {
            room_code: result.room_code.clone(),
            round: result.round,
            score: result.score,
            elapsed_seconds: result.elapsed_seconds,
            topic: result.topic.clone(),
            difficulty: result.difficulty,
            submitted_at: format_system_time(result.submitted_at),
        }
    }
}
