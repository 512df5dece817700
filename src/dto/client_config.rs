use serde::Serialize;
use utoipa::ToSchema;

use crate::config::AppConfig;

/// Runtime knobs clients need to reconcile room state.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfigResponse {
    /// Delay between two polls of `GET /rooms/{code}`.
    pub poll_interval_ms: u64,
    /// Upper bound of the poll delay after consecutive failures.
    pub poll_max_backoff_ms: u64,
    pub questions_per_match: u32,
}

impl From<&AppConfig> for ClientConfigResponse {
    fn from(config: &AppConfig) -> Self {
        Self {
            poll_interval_ms: config.client_poll.interval_ms,
            poll_max_backoff_ms: config.client_poll.max_backoff_ms,
            questions_per_match: config.questions_per_match,
        }
    }
}
