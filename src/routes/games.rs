use axum::{Json, Router, extract::State, routing::post};
use validator::Validate;

use crate::{
    dto::{
        match_result::{SubmitResultRequest, SubmitResultResponse},
        questions::{GenerateQuestionsRequest, GenerateQuestionsResponse},
    },
    error::AppError,
    services::{match_service, question_service},
    state::SharedState,
};

/// Match endpoints: shared question set and result reporting.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games/generate-questions", post(generate_questions))
        .route("/games/submit-result", post(submit_result))
}

/// Generate the shuffled question set for the topics of a room.
#[utoipa::path(
    post,
    path = "/games/generate-questions",
    tag = "games",
    request_body = GenerateQuestionsRequest,
    responses(
        (status = 200, description = "Questions generated", body = GenerateQuestionsResponse),
        (status = 400, description = "No usable topic"),
        (status = 404, description = "Unknown room"),
        (status = 502, description = "Question supply failed; retry later")
    )
)]
pub async fn generate_questions(
    State(state): State<SharedState>,
    Json(payload): Json<GenerateQuestionsRequest>,
) -> Result<Json<GenerateQuestionsResponse>, AppError> {
    payload.validate()?;
    Ok(Json(
        question_service::generate_questions(&state, payload).await?,
    ))
}

/// Report a finished player; the last report of a round returns the ranking.
#[utoipa::path(
    post,
    path = "/games/submit-result",
    tag = "games",
    request_body = SubmitResultRequest,
    responses(
        (status = 200, description = "Progress or final ranking", body = SubmitResultResponse),
        (status = 404, description = "Unknown room or player"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn submit_result(
    State(state): State<SharedState>,
    Json(payload): Json<SubmitResultRequest>,
) -> Result<Json<SubmitResultResponse>, AppError> {
    payload.validate()?;
    Ok(Json(match_service::submit_result(&state, payload).await?))
}
