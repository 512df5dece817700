use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::stats::{LeaderboardResponse, UserStatsResponse},
    error::AppError,
    services::stats_service,
    state::SharedState,
};

/// Aggregated statistics built from stored match results.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/stats/ranking", get(leaderboard))
        .route("/stats/{user_id}", get(user_stats))
}

#[utoipa::path(
    get,
    path = "/stats/ranking",
    tag = "stats",
    responses((status = 200, description = "Global leaderboard", body = LeaderboardResponse))
)]
/// Return the global leaderboard.
pub async fn leaderboard(
    State(state): State<SharedState>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    Ok(Json(stats_service::leaderboard(&state).await?))
}

#[utoipa::path(
    get,
    path = "/stats/{user_id}",
    tag = "stats",
    params(("user_id" = String, Path, description = "User identifier")),
    responses((status = 200, description = "Personal statistics", body = UserStatsResponse))
)]
/// Return totals and match history of one user.
pub async fn user_stats(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserStatsResponse>, AppError> {
    Ok(Json(stats_service::user_stats(&state, &user_id).await?))
}
