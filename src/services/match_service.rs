use tracing::info;

use crate::{
    dto::match_result::{
        MatchFinished, RankingEntryView, SubmitResultRequest, SubmitResultResponse,
        WaitingForPlayers,
    },
    error::ServiceError,
    services::{
        match_coordinator::{MatchCoordinator, ResultSubmission, SubmissionOutcome},
        room_events,
        room_service::normalize_room_code,
    },
    state::SharedState,
};

/// Record a player's result and return either progress or the final ranking.
///
/// The submission that completes the round also pushes `game-results` to the room.
pub async fn submit_result(
    state: &SharedState,
    request: SubmitResultRequest,
) -> Result<SubmitResultResponse, ServiceError> {
    let questions_per_match = state.config().questions_per_match;
    if request.score > questions_per_match {
        return Err(ServiceError::InvalidInput(format!(
            "score {} exceeds the {questions_per_match} questions of a match",
            request.score
        )));
    }

    let room_code = normalize_room_code(&request.room_code)?;
    let store = state.require_room_store().await?;
    let coordinator = MatchCoordinator::new(store, state.rooms().await?, questions_per_match);

    let outcome = coordinator
        .submit(ResultSubmission {
            room_code: room_code.clone(),
            user_id: request.user_id,
            username: request.username.trim().to_owned(),
            score: request.score,
            elapsed_seconds: request.elapsed_seconds,
            topic: request.topic,
            difficulty: request.difficulty,
        })
        .await?;

    match outcome {
        SubmissionOutcome::Waiting { reported, expected } => Ok(SubmitResultResponse::Waiting(
            WaitingForPlayers::new(reported, expected),
        )),
        SubmissionOutcome::Complete {
            round,
            ranking,
            winner,
            topics,
            difficulty,
            publish,
        } => {
            let total_players = ranking.len();
            let finished = MatchFinished {
                success: true,
                all_players_finished: true,
                ranking: ranking.into_iter().map(RankingEntryView::from).collect(),
                winner: winner.into(),
                total_players,
                room_code,
                round,
                topics,
                difficulty,
            };
            if publish {
                room_events::broadcast_game_results(state, &finished);
                info!(room = %finished.room_code, round, "published match results");
            }
            Ok(SubmitResultResponse::Finished(finished))
        }
    }
}
