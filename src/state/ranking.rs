//! Final ranking of a match and the global leaderboard.

use std::{cmp::Ordering, collections::HashMap, time::SystemTime};

use crate::state::room::Difficulty;

/// One player's reported outcome for a round of a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// Room the match was played in.
    pub room_code: String,
    /// Round of that room.
    pub round: u32,
    /// Reporting player.
    pub user_id: String,
    /// Display name at submission time.
    pub username: String,
    /// Correct-answer count.
    pub score: u32,
    /// Seconds spent answering.
    pub elapsed_seconds: u32,
    /// Topic the player configured.
    pub topic: Option<String>,
    /// Difficulty the player configured.
    pub difficulty: Option<Difficulty>,
    /// Arrival time; last tiebreaker.
    pub submitted_at: SystemTime,
}

/// Position of a player in the final ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingEntry {
    /// Ranked player.
    pub user_id: String,
    /// Display name.
    pub username: String,
    /// Correct answers.
    pub score: u32,
    /// Seconds spent answering.
    pub elapsed_seconds: u32,
    /// Share of correct answers, rounded to the nearest integer.
    pub percentage: u32,
    /// 1-based, never shared.
    pub rank: u32,
}

/// Order results by score (desc), elapsed time (asc) and arrival, then assign ranks.
///
/// `questions_per_match` only feeds the percentage; a zero value yields 0%.
pub fn compute_ranking(results: &[MatchResult], questions_per_match: u32) -> Vec<RankingEntry> {
    let mut ordered: Vec<&MatchResult> = results.iter().collect();
    ordered.sort_by(|a, b| compare_results(a, b));

    ordered
        .into_iter()
        .enumerate()
        .map(|(index, result)| RankingEntry {
            user_id: result.user_id.clone(),
            username: result.username.clone(),
            score: result.score,
            elapsed_seconds: result.elapsed_seconds,
            percentage: percentage(result.score, questions_per_match),
            rank: index as u32 + 1,
        })
        .collect()
}

fn compare_results(a: &MatchResult, b: &MatchResult) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.elapsed_seconds.cmp(&b.elapsed_seconds))
        .then_with(|| a.submitted_at.cmp(&b.submitted_at))
        .then_with(|| a.user_id.cmp(&b.user_id))
}

fn percentage(score: u32, questions_per_match: u32) -> u32 {
    if questions_per_match == 0 {
        return 0;
    }
    ((f64::from(score) / f64::from(questions_per_match)) * 100.0).round() as u32
}

/// Aggregated standing of a user across every recorded match.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    /// Ranked user.
    pub user_id: String,
    /// Name from the user's latest result.
    pub username: String,
    /// Sum of all scores.
    pub total_score: u64,
    /// Number of stored results.
    pub matches_played: u32,
    /// Average score per match, two decimals.
    pub average: f64,
    /// 1-based position.
    pub rank: u32,
}

/// Group results by user and rank by total score, then average, then name.
///
/// The most recent username reported by a user is the one displayed.
pub fn compute_leaderboard(results: &[MatchResult]) -> Vec<LeaderboardEntry> {
    struct Totals<'a> {
        username: &'a str,
        last_seen: SystemTime,
        total_score: u64,
        matches_played: u32,
    }

    let mut per_user: HashMap<&str, Totals<'_>> = HashMap::new();
    for result in results {
        let totals = per_user
            .entry(result.user_id.as_str())
            .or_insert_with(|| Totals {
                username: result.username.as_str(),
                last_seen: result.submitted_at,
                total_score: 0,
                matches_played: 0,
            });
        if result.submitted_at >= totals.last_seen {
            totals.username = result.username.as_str();
            totals.last_seen = result.submitted_at;
        }
        totals.total_score += u64::from(result.score);
        totals.matches_played += 1;
    }

    let mut entries: Vec<LeaderboardEntry> = per_user
        .into_iter()
        .map(|(user_id, totals)| {
            let average = totals.total_score as f64 / f64::from(totals.matches_played);
            LeaderboardEntry {
                user_id: user_id.to_owned(),
                username: totals.username.to_owned(),
                total_score: totals.total_score,
                matches_played: totals.matches_played,
                average: (average * 100.0).round() / 100.0,
                rank: 0,
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        b.total_score
            .cmp(&a.total_score)
            .then_with(|| b.average.total_cmp(&a.average))
            .then_with(|| a.username.cmp(&b.username))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.rank = index as u32 + 1;
    }
    entries
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn result(user: &str, score: u32, elapsed: u32, arrival: u64) -> MatchResult {
        MatchResult {
            room_code: "ABC123".into(),
            round: 1,
            user_id: user.into(),
            username: user.to_uppercase(),
            score,
            elapsed_seconds: elapsed,
            topic: None,
            difficulty: None,
            submitted_at: SystemTime::UNIX_EPOCH + Duration::from_secs(arrival),
        }
    }

    fn order(entries: &[RankingEntry]) -> Vec<(&str, u32)> {
        entries
            .iter()
            .map(|entry| (entry.user_id.as_str(), entry.rank))
            .collect()
    }

    #[test]
    fn score_dominates_and_time_breaks_ties() {
        let results = vec![result("a", 3, 40, 1), result("b", 3, 20, 2), result("c", 5, 100, 3)];
        let ranking = compute_ranking(&results, 5);
        assert_eq!(order(&ranking), vec![("c", 1), ("b", 2), ("a", 3)]);
        assert_eq!(ranking[0].percentage, 100);
        assert_eq!(ranking[1].percentage, 60);
    }

    #[test]
    fn exact_ties_fall_back_to_arrival_without_shared_ranks() {
        let results = vec![result("late", 2, 30, 9), result("early", 2, 30, 4)];
        let ranking = compute_ranking(&results, 5);
        assert_eq!(order(&ranking), vec![("early", 1), ("late", 2)]);
    }

    #[test]
    fn ranking_is_independent_of_input_order_and_repeatable() {
        let forward = vec![result("a", 1, 10, 1), result("b", 4, 50, 2), result("c", 4, 45, 3)];
        let mut backward = forward.clone();
        backward.reverse();

        let first = compute_ranking(&forward, 5);
        assert_eq!(first, compute_ranking(&forward, 5));
        assert_eq!(first, compute_ranking(&backward, 5));
    }

    #[test]
    fn empty_results_rank_nobody() {
        assert!(compute_ranking(&[], 5).is_empty());
    }

    #[test]
    fn percentage_handles_zero_question_count() {
        let ranking = compute_ranking(&[result("a", 3, 1, 1)], 0);
        assert_eq!(ranking[0].percentage, 0);
    }

    #[test]
    fn leaderboard_groups_by_user() {
        let results = vec![
            result("a", 3, 10, 1),
            result("b", 5, 10, 2),
            result("a", 4, 10, 3),
            result("c", 1, 10, 4),
        ];
        let board = compute_leaderboard(&results);

        assert_eq!(board.len(), 3);
        assert_eq!(board[0].user_id, "a");
        assert_eq!(board[0].total_score, 7);
        assert_eq!(board[0].matches_played, 2);
        assert_eq!(board[0].average, 3.5);
        assert_eq!(board[1].user_id, "b");
        assert_eq!(board[2].rank, 3);
    }

    #[test]
    fn leaderboard_breaks_total_ties_by_average() {
        let results = vec![
            result("steady", 2, 10, 1),
            result("steady", 2, 10, 2),
            result("burst", 4, 10, 3),
        ];
        let board = compute_leaderboard(&results);
        assert_eq!(board[0].user_id, "burst");
        assert_eq!(board[1].user_id, "steady");
    }
}
