use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{Question, QuestionSupply, QuestionSupplyError, parse_questions};
use crate::state::room::Difficulty;

/// Connection settings for the Gemini `generateContent` API.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API root, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub base_url: String,
    /// Model name, e.g. `gemini-2.0-flash`.
    pub model: String,
    /// Secret read from `GEMINI_API_KEY`; calls fail fast without it.
    pub api_key: Option<String>,
}

/// [`QuestionSupply`] prompting a Gemini model for a JSON array of questions.
#[derive(Clone)]
pub struct GeminiQuestionSupply {
    client: Client,
    endpoint: Arc<str>,
    api_key: Option<Arc<str>>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GeminiQuestionSupply {
    /// Build the HTTP client for `config`.
    pub fn new(config: GeminiConfig) -> Result<Self, QuestionSupplyError> {
        let client = Client::builder()
            .build()
            .map_err(|source| QuestionSupplyError::Transport { source })?;
        let endpoint = format!(
            "{}/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: config
                .api_key
                .filter(|key| !key.trim().is_empty())
                .map(Into::into),
        })
    }

    async fn request(
        &self,
        topic: &str,
        difficulty: Difficulty,
        count: usize,
    ) -> Result<Vec<Question>, QuestionSupplyError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(QuestionSupplyError::MissingApiKey)?;

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt(topic, difficulty, count) }] }]
        });

        let response = self
            .client
            .post(self.endpoint.as_ref())
            .query(&[("key", api_key.as_ref())])
            .json(&body)
            .send()
            .await
            .map_err(|source| QuestionSupplyError::Transport { source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QuestionSupplyError::Status { status, body });
        }

        let payload = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|source| QuestionSupplyError::Transport { source })?;

        let text = payload
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| QuestionSupplyError::Malformed("response has no candidates".into()))?;

        debug!(%topic, %difficulty, count, "question batch received");
        parse_questions(&text, count)
    }
}

impl QuestionSupply for GeminiQuestionSupply {
    fn generate(
        &self,
        topic: String,
        difficulty: Difficulty,
        count: usize,
    ) -> BoxFuture<'static, Result<Vec<Question>, QuestionSupplyError>> {
        let supply = self.clone();
        Box::pin(async move { supply.request(&topic, difficulty, count).await })
    }
}

fn level(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "very easy, beginner level",
        Difficulty::Medium => "of intermediate difficulty",
        Difficulty::Hard => "very hard, expert level",
    }
}

fn prompt(topic: &str, difficulty: Difficulty, count: usize) -> String {
    format!(
        "Generate {count} trivia questions about \"{topic}\" that are {level}.\n\
         \n\
         Each question must have exactly 4 answer options and only one correct answer.\n\
         \n\
         Required JSON format:\n\
         [\n  {{\n    \"question\": \"question text\",\n    \"options\": [\"option 1\", \"option 2\", \"option 3\", \"option 4\"],\n    \"correctIndex\": correct_index (0-3)\n  }}\n]\n\
         \n\
         Answer ONLY with valid JSON, without any additional text.",
        level = level(difficulty),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>) -> GeminiConfig {
        GeminiConfig {
            base_url: "http://127.0.0.1:9/v1beta/".into(),
            model: "gemini-2.0-flash".into(),
            api_key: api_key.map(Into::into),
        }
    }

    #[test]
    fn endpoint_joins_base_and_model() {
        let supply = GeminiQuestionSupply::new(config(Some("k"))).unwrap();
        assert_eq!(
            supply.endpoint.as_ref(),
            "http://127.0.0.1:9/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn prompt_mentions_topic_count_and_level() {
        let text = prompt("rock music", Difficulty::Hard, 3);
        assert!(text.contains("Generate 3 trivia questions about \"rock music\""));
        assert!(text.contains("expert level"));
        assert!(text.contains("\"correctIndex\""));
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let supply = GeminiQuestionSupply::new(config(Some("  "))).unwrap();
        let err = supply
            .generate("space".into(), Difficulty::Easy, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, QuestionSupplyError::MissingApiKey));
    }
}
