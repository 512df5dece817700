use super::error::{CouchDaoError, CouchResult};

const DEFAULT_DATABASE: &str = "trivia_rooms";

/// Where the room database lives and how to authenticate against it.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    /// Server root without trailing slash.
    pub base_url: String,
    /// Database name.
    pub database: String,
    /// Basic-auth user.
    pub username: Option<String>,
    /// Basic-auth password.
    pub password: Option<String>,
}

impl CouchConfig {
    /// Read `COUCH_BASE_URL`, `COUCH_DB` and the optional `COUCH_USERNAME`/`COUCH_PASSWORD` pair.
    pub fn from_env() -> CouchResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CouchResult<Self> {
        let base_url = lookup("COUCH_BASE_URL").ok_or(CouchDaoError::MissingEnvVar {
            var: "COUCH_BASE_URL",
        })?;

        // Credentials are only used when both halves are present.
        let (username, password) = match (lookup("COUCH_USERNAME"), lookup("COUCH_PASSWORD")) {
            (Some(user), Some(pass)) => (Some(user), Some(pass)),
            _ => (None, None),
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            database: lookup("COUCH_DB").unwrap_or_else(|| DEFAULT_DATABASE.to_owned()),
            username,
            password,
        })
    }
}
