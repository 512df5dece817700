use reqwest::StatusCode;
use thiserror::Error;

/// Result alias of the CouchDB backend.
pub type CouchResult<T> = Result<T, CouchDaoError>;

/// CouchDB failures, each tagged with the database or document path involved.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    #[error("environment variable `{var}` is required for the CouchDB room store")]
    MissingEnvVar { var: &'static str },
    #[error("could not build the CouchDB HTTP client")]
    HttpClient {
        #[source]
        source: reqwest::Error,
    },
    #[error("CouchDB unreachable at `{path}`")]
    Unreachable {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// Any status the room store does not map to a domain outcome.
    #[error("CouchDB answered {status} for `{path}`")]
    UnexpectedStatus { path: String, status: StatusCode },
    #[error("unreadable CouchDB response body for `{path}`")]
    UndecodableBody {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// A stored room or result document no longer matches the entity layout.
    #[error("CouchDB document under `{path}` does not match the room store layout")]
    InvalidDocument {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
