use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, question_supply::QuestionSupplyError, state::room::RoomError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend failed; the effect of a write is unknown.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Room rule violation.
    #[error(transparent)]
    Room(RoomError),
    /// Question generation failed upstream.
    #[error("question generation failed: {0}")]
    Upstream(#[source] QuestionSupplyError),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<RoomError> for ServiceError {
    fn from(err: RoomError) -> Self {
        match err {
            RoomError::Storage(source) => ServiceError::Unavailable(source),
            other => ServiceError::Room(other),
        }
    }
}

impl From<QuestionSupplyError> for ServiceError {
    fn from(err: QuestionSupplyError) -> Self {
        ServiceError::Upstream(err)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest {
            code: "INVALID_INPUT",
            message: format!("validation failed: {err}"),
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
///
/// `code` is a stable identifier clients can branch on.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("{message}")]
    BadRequest { code: &'static str, message: String },
    /// Caller is not allowed to perform the operation.
    #[error("{message}")]
    Forbidden { code: &'static str, message: String },
    /// Requested resource not found.
    #[error("{message}")]
    NotFound { code: &'static str, message: String },
    /// Conflict with current state.
    #[error("{message}")]
    Conflict { code: &'static str, message: String },
    /// Upstream dependency failed.
    #[error("{message}")]
    BadGateway { code: &'static str, message: String },
    /// Service unavailable or degraded.
    #[error("{message}")]
    ServiceUnavailable { code: &'static str, message: String },
    /// Internal server error.
    #[error("{message}")]
    Internal { code: &'static str, message: String },
}

impl AppError {
    /// HTTP status the error is rendered with.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error identifier.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest { code, .. }
            | AppError::Forbidden { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::BadGateway { code, .. }
            | AppError::ServiceUnavailable { code, .. }
            | AppError::Internal { code, .. } => *code,
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => {
                error!(error = %source, "storage failure");
                AppError::Internal {
                    code: "STORAGE_ERROR",
                    message: "storage failure; the operation may not have been applied".into(),
                }
            }
            ServiceError::Degraded => AppError::ServiceUnavailable {
                code: "SERVICE_DEGRADED",
                message: "storage unavailable (degraded mode); retry later".into(),
            },
            ServiceError::InvalidInput(message) => AppError::BadRequest {
                code: "INVALID_INPUT",
                message,
            },
            ServiceError::Room(err) => room_error(err),
            ServiceError::Upstream(source) => {
                warn!(error = %source, "question supply failure");
                AppError::BadGateway {
                    code: "QUESTION_SUPPLY_FAILED",
                    message: format!("{source}; retry later"),
                }
            }
        }
    }
}

fn room_error(err: RoomError) -> AppError {
    let code = err.code();
    let message = err.to_string();
    match err {
        RoomError::RoomNotFound(_) | RoomError::PlayerNotInRoom(_) => {
            AppError::NotFound { code, message }
        }
        RoomError::RoomFull { .. }
        | RoomError::PlayerAlreadyInRoom(_)
        | RoomError::ConcurrentModification(_) => AppError::Conflict { code, message },
        RoomError::NotHost(_) => AppError::Forbidden { code, message },
        RoomError::CodeSpaceExhausted(_) | RoomError::Storage(_) => {
            AppError::Internal { code, message }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let payload = Json(ErrorBody {
            success: false,
            code: self.code(),
            message: self.to_string(),
        });

        (self.status(), payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn app(err: impl Into<ServiceError>) -> AppError {
        AppError::from(err.into())
    }

    #[test]
    fn room_errors_map_to_documented_statuses() {
        let cases = [
            (RoomError::RoomNotFound("X".into()), StatusCode::NOT_FOUND, "ROOM_NOT_FOUND"),
            (
                RoomError::RoomFull {
                    code: "X".into(),
                    max_players: 2,
                },
                StatusCode::CONFLICT,
                "ROOM_FULL",
            ),
            (
                RoomError::PlayerAlreadyInRoom("u".into()),
                StatusCode::CONFLICT,
                "ALREADY_IN_ROOM",
            ),
            (
                RoomError::ConcurrentModification("X".into()),
                StatusCode::CONFLICT,
                "CONCURRENT_MODIFICATION",
            ),
            (RoomError::NotHost("u".into()), StatusCode::FORBIDDEN, "NOT_HOST"),
            (
                RoomError::CodeSpaceExhausted(5),
                StatusCode::INTERNAL_SERVER_ERROR,
                "ROOM_CODE_EXHAUSTED",
            ),
        ];
        for (err, status, code) in cases {
            let app = app(err);
            assert_eq!(app.status(), status);
            assert_eq!(app.code(), code);
        }
    }

    #[test]
    fn storage_failures_are_internal_errors() {
        let err = RoomError::Storage(StorageError::corrupted("room::X", "bad"));
        assert!(matches!(ServiceError::from(err), ServiceError::Unavailable(_)));

        let app = app(StorageError::corrupted("room::X", "bad"));
        assert_eq!(app.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(app.code(), "STORAGE_ERROR");
    }

    #[test]
    fn upstream_and_degraded_statuses() {
        let upstream = app(QuestionSupplyError::Timeout(Duration::from_secs(20)));
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
        assert!(upstream.to_string().contains("retry later"));

        assert_eq!(
            AppError::from(ServiceError::Degraded).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::from(ServiceError::InvalidInput("topics".into())).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
