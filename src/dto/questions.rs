use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{dto::validation::validate_room_code, state::room::Difficulty};

/// Request for the shared question set of a match.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuestionsRequest {
    #[validate(custom(function = "validate_room_code"))]
    pub room_code: String,
    /// Comma separated topics, e.g. `"space, rock music"`.
    #[validate(length(min = 1, max = 500))]
    pub topics: String,
    pub difficulty: Difficulty,
}

/// Multiple-choice question served to every player of a match.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    /// `{topic_with_underscores}_{index}`.
    pub id: String,
    pub text: String,
    pub options: Vec<String>,
    pub correct_index: u8,
    pub topic: String,
    pub difficulty: Difficulty,
    /// Name of the member who proposed the topic.
    pub contributed_by: String,
}

/// Shuffled question set of a match.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuestionsResponse {
    pub success: bool,
    pub questions: Vec<QuestionView>,
    pub session_id: String,
    pub topics: Vec<String>,
    pub questions_per_topic: usize,
}
