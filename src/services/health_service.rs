use tracing::{debug, warn};

use crate::{
    dto::health::{HealthResponse, HealthStatus},
    state::SharedState,
};

/// Probe the installed store; a failing probe reports degraded without waiting for the supervisor.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let store = match state.require_room_store().await {
        Ok(store) => store,
        Err(_) => {
            debug!("health probe while degraded");
            return HealthStatus::Degraded.into();
        }
    };

    match store.health_check().await {
        Ok(()) => HealthStatus::Ok.into(),
        Err(err) => {
            warn!(error = %err, "storage health check failed");
            HealthStatus::Degraded.into()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::room_store::memory::MemoryRoomStore,
        question_supply::{GeminiConfig, GeminiQuestionSupply},
        state::AppState,
    };

    fn supply() -> Arc<GeminiQuestionSupply> {
        let config = GeminiConfig {
            base_url: "http://127.0.0.1:9".into(),
            model: "test".into(),
            api_key: None,
        };
        Arc::new(GeminiQuestionSupply::new(config).unwrap())
    }

    #[tokio::test]
    async fn reports_degraded_without_store() {
        let state = AppState::new(AppConfig::default(), supply());
        assert_eq!(health_status(&state).await.status, HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn reports_ok_with_reachable_store() {
        let state = AppState::with_store(
            AppConfig::default(),
            supply(),
            Arc::new(MemoryRoomStore::new()),
        );
        assert_eq!(health_status(&state).await.status, HealthStatus::Ok);
    }
}
