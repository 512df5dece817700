//! Persists match results and decides when a round is complete.

use std::{collections::HashSet, sync::Arc, time::SystemTime};

use tracing::{debug, info};

use crate::{
    dao::{room_repository::RoomRepository, room_store::RoomStore},
    state::{
        ranking::{MatchResult, RankingEntry, compute_ranking},
        room::{Difficulty, RoomError, millis_precision},
    },
};

/// One player's reported outcome, before it is bound to a round.
#[derive(Debug, Clone)]
pub struct ResultSubmission {
    /// Room the match was played in.
    pub room_code: String,
    /// Reporting player.
    pub user_id: String,
    /// Display name shown in the ranking.
    pub username: String,
    /// Correct answers.
    pub score: u32,
    /// Seconds spent answering.
    pub elapsed_seconds: u32,
    /// Topic the player configured.
    pub topic: Option<String>,
    /// Difficulty the player configured.
    pub difficulty: Option<Difficulty>,
}

/// State of the round after a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// Some members have not reported yet.
    Waiting {
        /// Members that already reported.
        reported: usize,
        /// Current member count.
        expected: usize,
    },
    /// Every member reported.
    Complete {
        /// Round the ranking belongs to.
        round: u32,
        /// Every result of the round, best first.
        ranking: Vec<RankingEntry>,
        /// First ranking entry.
        winner: RankingEntry,
        /// Topics of the room's members.
        topics: Vec<String>,
        /// Difficulty the room plays at.
        difficulty: Difficulty,
        /// `true` for exactly one submission per round: the one that must fan out the results.
        publish: bool,
    },
}

/// Quorum check over the results persisted for the current round of a room.
pub struct MatchCoordinator {
    store: Arc<dyn RoomStore>,
    rooms: RoomRepository,
    questions_per_match: u32,
}

impl MatchCoordinator {
    pub fn new(store: Arc<dyn RoomStore>, rooms: RoomRepository, questions_per_match: u32) -> Self {
        Self {
            store,
            rooms,
            questions_per_match,
        }
    }

    /// Record `submission` and report whether the round is complete.
    ///
    /// Resubmitting for the same round keeps the first stored row and still runs the quorum check.
    pub async fn submit(&self, submission: ResultSubmission) -> Result<SubmissionOutcome, RoomError> {
        let room = self
            .rooms
            .get_room(&submission.room_code)
            .await?
            .ok_or_else(|| RoomError::RoomNotFound(submission.room_code.clone()))?;
        if room.player(&submission.user_id).is_none() {
            return Err(RoomError::PlayerNotInRoom(submission.user_id));
        }

        let round = room.round;
        let result = MatchResult {
            room_code: room.code.clone(),
            round,
            user_id: submission.user_id,
            username: submission.username,
            score: submission.score,
            elapsed_seconds: submission.elapsed_seconds,
            topic: submission.topic,
            difficulty: submission.difficulty,
            submitted_at: millis_precision(SystemTime::now()),
        };
        let user_id = result.user_id.clone();
        if !self.store.insert_result(result.into()).await? {
            debug!(room = %room.code, round, user = %user_id, "duplicate result ignored");
        }

        let results: Vec<MatchResult> = self
            .store
            .list_room_results(room.code.clone(), round)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        let members: HashSet<&str> = room.players.iter().map(|player| player.id.as_str()).collect();
        let reported = results
            .iter()
            .filter(|result| members.contains(result.user_id.as_str()))
            .count();
        let expected = room.expected_players();

        if reported < expected {
            debug!(room = %room.code, round, reported, expected, "waiting for results");
            return Ok(SubmissionOutcome::Waiting { reported, expected });
        }

        let ranking = compute_ranking(&results, self.questions_per_match);
        let Some(winner) = ranking.first().cloned() else {
            return Ok(SubmissionOutcome::Waiting { reported, expected });
        };
        let publish = self
            .rooms
            .claim_ranking_publication(&room.code, round)
            .await?;
        if publish {
            info!(room = %room.code, round, winner = %winner.user_id, "match complete");
        }

        Ok(SubmissionOutcome::Complete {
            round,
            ranking,
            winner,
            topics: room.match_topics(),
            difficulty: room.match_difficulty(),
            publish,
        })
    }
}
