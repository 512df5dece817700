//! Question generation delegated to an external language model.

mod gemini;
mod retry;

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::state::room::Difficulty;

pub use gemini::{GeminiConfig, GeminiQuestionSupply};
pub use retry::{RetryPolicy, RetryingQuestionSupply};

/// Number of answer options every question must carry.
pub const OPTIONS_PER_QUESTION: usize = 4;

/// A validated multiple-choice question as returned by a supply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Question wording.
    pub text: String,
    /// Exactly four answers.
    pub options: Vec<String>,
    /// Index into `options`, always below [`OPTIONS_PER_QUESTION`].
    pub correct_index: u8,
}

/// Source of trivia questions for a topic.
pub trait QuestionSupply: Send + Sync {
    /// Produce at least `count` questions about `topic`.
    fn generate(
        &self,
        topic: String,
        difficulty: Difficulty,
        count: usize,
    ) -> BoxFuture<'static, Result<Vec<Question>, QuestionSupplyError>>;
}

/// Failures of the question supply. None of them is ever papered over with fallback questions.
#[derive(Debug, Error)]
pub enum QuestionSupplyError {
    /// No API key configured for the upstream model.
    #[error("question supply is not configured (missing API key)")]
    MissingApiKey,
    /// A single attempt exceeded its time budget.
    #[error("question supply timed out after {0:?}")]
    Timeout(Duration),
    /// The request could not be sent or its body not read.
    #[error("question supply request failed")]
    Transport {
        #[source]
        source: reqwest::Error,
    },
    /// The upstream answered with a non-success status.
    #[error("question supply answered {status}: {body}")]
    Status { status: StatusCode, body: String },
    /// The model output did not contain usable questions.
    #[error("question supply returned malformed output: {0}")]
    Malformed(String),
    /// Every allowed attempt failed.
    #[error("question supply failed after {attempts} attempt(s)")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<QuestionSupplyError>,
    },
}

impl QuestionSupplyError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            QuestionSupplyError::Timeout(_)
            | QuestionSupplyError::Transport { .. }
            | QuestionSupplyError::Malformed(_) => true,
            QuestionSupplyError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            QuestionSupplyError::MissingApiKey | QuestionSupplyError::Exhausted { .. } => false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    #[serde(alias = "pregunta")]
    question: String,
    #[serde(alias = "opciones")]
    options: Vec<String>,
    #[serde(alias = "respuestaCorrecta")]
    correct_index: i64,
}

/// Parse a model answer into exactly `count` questions.
///
/// Markdown code fences around the JSON array are tolerated.
pub fn parse_questions(output: &str, count: usize) -> Result<Vec<Question>, QuestionSupplyError> {
    let json = strip_code_fences(output);
    let raw: Vec<RawQuestion> = serde_json::from_str(json)
        .map_err(|err| QuestionSupplyError::Malformed(format!("invalid JSON: {err}")))?;

    let mut questions = raw
        .into_iter()
        .enumerate()
        .map(|(index, raw)| validate(index, raw))
        .collect::<Result<Vec<_>, _>>()?;

    if questions.len() < count {
        return Err(QuestionSupplyError::Malformed(format!(
            "expected {count} question(s), got {}",
            questions.len()
        )));
    }
    questions.truncate(count);
    Ok(questions)
}

fn validate(index: usize, raw: RawQuestion) -> Result<Question, QuestionSupplyError> {
    let malformed = |reason: &str| QuestionSupplyError::Malformed(format!("question {index}: {reason}"));

    let text = raw.question.trim().to_owned();
    if text.is_empty() {
        return Err(malformed("empty text"));
    }
    if raw.options.len() != OPTIONS_PER_QUESTION {
        return Err(malformed("must have exactly 4 options"));
    }
    let options: Vec<String> = raw.options.iter().map(|o| o.trim().to_owned()).collect();
    if options.iter().any(String::is_empty) {
        return Err(malformed("empty option"));
    }
    let correct_index = u8::try_from(raw.correct_index)
        .ok()
        .filter(|i| usize::from(*i) < OPTIONS_PER_QUESTION)
        .ok_or_else(|| malformed("correct index out of range"))?;

    Ok(Question {
        text,
        options,
        correct_index,
    })
}

fn strip_code_fences(output: &str) -> &str {
    let trimmed = output.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening fence line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}
