//! Application-level configuration loading: match sizing, room codes, question supply and client polling.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::question_supply::RetryPolicy;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TRIVIA_BACK_CONFIG_PATH";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone, PartialEq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Questions played per match; also the denominator of ranking percentages.
    pub questions_per_match: u32,
    /// Codes drawn before room creation gives up.
    pub room_code_attempts: u32,
    /// Question generator endpoint and retry bounds.
    pub question_supply: QuestionSupplyConfig,
    /// Polling cadence served by `/client-config`.
    pub client_poll: ClientPollConfig,
}

#[derive(Debug, Clone, PartialEq)]
/// Upstream model endpoint and the bounds applied to every call.
pub struct QuestionSupplyConfig {
    /// API root.
    pub base_url: String,
    /// Model name inserted in the request path.
    pub model: String,
    /// Per-call timeout and retry budget.
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Polling cadence advertised to clients reconciling room state.
pub struct ClientPollConfig {
    /// Delay between two polls.
    pub interval_ms: u64,
    /// Ceiling of the backoff after failed polls.
    pub max_backoff_ms: u64,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        questions_per_match = app_config.questions_per_match,
                        model = %app_config.question_supply.model,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON document; absent fields take their defaults.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    questions_per_match: u32,
    room_code_attempts: u32,
    question_supply: RawQuestionSupply,
    client_poll: RawClientPoll,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            questions_per_match: 5,
            room_code_attempts: 5,
            question_supply: RawQuestionSupply::default(),
            client_poll: RawClientPoll::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawQuestionSupply {
    base_url: String,
    model: String,
    timeout_secs: u64,
    max_attempts: u32,
    initial_backoff_ms: u64,
}

impl Default for RawQuestionSupply {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GEMINI_BASE_URL.into(),
            model: DEFAULT_GEMINI_MODEL.into(),
            timeout_secs: 20,
            max_attempts: 3,
            initial_backoff_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawClientPoll {
    interval_ms: u64,
    max_backoff_ms: u64,
}

impl Default for RawClientPoll {
    fn default() -> Self {
        Self {
            interval_ms: 2_000,
            max_backoff_ms: 15_000,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let RawQuestionSupply {
            base_url,
            model,
            timeout_secs,
            max_attempts,
            initial_backoff_ms,
        } = value.question_supply;

        Self {
            questions_per_match: value.questions_per_match.max(1),
            room_code_attempts: value.room_code_attempts.max(1),
            question_supply: QuestionSupplyConfig {
                base_url,
                model,
                retry: RetryPolicy {
                    attempt_timeout: Duration::from_secs(timeout_secs.max(1)),
                    max_attempts: max_attempts.max(1),
                    initial_backoff: Duration::from_millis(initial_backoff_ms),
                },
            },
            client_poll: ClientPollConfig {
                interval_ms: value.client_poll.interval_ms,
                max_backoff_ms: value.client_poll.max_backoff_ms.max(value.client_poll.interval_ms),
            },
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
