use crate::{
    dto::stats::{LeaderboardEntryView, LeaderboardResponse, MatchHistoryEntry, UserStatsResponse},
    dto::validation::validate_user_id,
    error::ServiceError,
    state::{
        SharedState,
        ranking::{MatchResult, compute_leaderboard},
    },
};

/// Global leaderboard aggregated from every stored result.
pub async fn leaderboard(state: &SharedState) -> Result<LeaderboardResponse, ServiceError> {
    let results = all_results(state).await?;
    let ranking = compute_leaderboard(&results)
        .into_iter()
        .map(LeaderboardEntryView::from)
        .collect();
    Ok(LeaderboardResponse {
        success: true,
        ranking,
    })
}

/// Totals and history of a single user. Unknown users get empty statistics.
pub async fn user_stats(
    state: &SharedState,
    user_id: &str,
) -> Result<UserStatsResponse, ServiceError> {
    validate_user_id(user_id)
        .map_err(|_| ServiceError::InvalidInput(format!("invalid user id `{user_id}`")))?;

    let results = all_results(state).await?;
    Ok(summarize_user(user_id, &results))
}

async fn all_results(state: &SharedState) -> Result<Vec<MatchResult>, ServiceError> {
    let store = state.require_room_store().await?;
    let results = store.list_results().await?;
    Ok(results.into_iter().map(Into::into).collect())
}

fn summarize_user(user_id: &str, results: &[MatchResult]) -> UserStatsResponse {
    let rank = compute_leaderboard(results)
        .into_iter()
        .find(|entry| entry.user_id == user_id)
        .map(|entry| entry.rank);

    let mut own: Vec<&MatchResult> = results
        .iter()
        .filter(|result| result.user_id == user_id)
        .collect();
    own.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));

    let matches_played = own.len() as u32;
    let total_score: u64 = own.iter().map(|result| u64::from(result.score)).sum();
    let average = if matches_played == 0 {
        0.0
    } else {
        (total_score as f64 / f64::from(matches_played) * 100.0).round() / 100.0
    };

    UserStatsResponse {
        success: true,
        user_id: user_id.to_owned(),
        username: own.first().map(|result| result.username.clone()),
        matches_played,
        total_score,
        average,
        best_score: own.iter().map(|result| result.score).max().unwrap_or(0),
        rank,
        history: own.into_iter().map(MatchHistoryEntry::from).collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    fn result(user: &str, name: &str, score: u32, at: u64) -> MatchResult {
        MatchResult {
            room_code: "ABC123".into(),
            round: at as u32,
            user_id: user.into(),
            username: name.into(),
            score,
            elapsed_seconds: 30,
            topic: None,
            difficulty: None,
            submitted_at: SystemTime::UNIX_EPOCH + Duration::from_secs(at),
        }
    }

    #[test]
    fn user_summary_lists_newest_first_with_totals() {
        let results = vec![
            result("u1", "Ada", 2, 1),
            result("u2", "Bob", 5, 2),
            result("u1", "Ada L.", 4, 3),
        ];
        let stats = summarize_user("u1", &results);

        assert_eq!(stats.matches_played, 2);
        assert_eq!(stats.total_score, 6);
        assert_eq!(stats.average, 3.0);
        assert_eq!(stats.best_score, 4);
        assert_eq!(stats.username.as_deref(), Some("Ada L."));
        assert_eq!(stats.rank, Some(1));
        assert_eq!(stats.history[0].round, 3);
    }

    #[test]
    fn unknown_user_has_empty_statistics() {
        let stats = summarize_user("ghost", &[result("u1", "Ada", 2, 1)]);
        assert_eq!(stats.matches_played, 0);
        assert_eq!(stats.average, 0.0);
        assert_eq!(stats.rank, None);
        assert!(stats.history.is_empty());
    }
}
