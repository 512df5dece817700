//! Trivia rooms backend entrypoint wiring REST, WebSocket and the room store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::{Context, bail};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trivia_rooms_back::{
    config::AppConfig,
    dao::room_store::{RoomStore, memory::MemoryRoomStore},
    question_supply::{GeminiConfig, GeminiQuestionSupply, QuestionSupply, RetryingQuestionSupply},
    routes,
    services::storage_supervisor,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let question_supply = build_question_supply(&config)?;

    let backend = env::var("STORAGE_BACKEND").unwrap_or_else(|_| default_backend().into());
    let app_state = match backend.as_str() {
        "memory" => {
            warn!("using the in-memory room store; data is lost on restart");
            AppState::with_store(config, question_supply, Arc::new(MemoryRoomStore::new()))
        }
        other => {
            let state = AppState::new(config, question_supply);
            spawn_supervisor(state.clone(), other)?;
            state
        }
    };
    info!(%backend, "storage backend selected");

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

fn build_question_supply(config: &AppConfig) -> anyhow::Result<Arc<dyn QuestionSupply>> {
    let api_key = env::var("GEMINI_API_KEY").ok();
    if api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; question generation will fail");
    }
    let gemini = GeminiQuestionSupply::new(GeminiConfig {
        base_url: config.question_supply.base_url.clone(),
        model: config.question_supply.model.clone(),
        api_key,
    })
    .context("building question supply client")?;

    Ok(Arc::new(RetryingQuestionSupply::new(
        Arc::new(gemini),
        config.question_supply.retry,
    )))
}

fn default_backend() -> &'static str {
    if cfg!(feature = "mongo-store") {
        "mongo"
    } else if cfg!(feature = "couch-store") {
        "couch"
    } else {
        "memory"
    }
}

/// Hand the selected database to the storage supervisor; the state stays degraded until it connects.
fn spawn_supervisor(state: SharedState, backend: &str) -> anyhow::Result<()> {
    match backend {
        #[cfg(feature = "mongo-store")]
        "mongo" => {
            use trivia_rooms_back::dao::{
                room_store::mongodb::{MongoConfig, MongoRoomStore},
                storage::StorageError,
            };

            tokio::spawn(storage_supervisor::run(state, || async {
                let config = MongoConfig::from_env().await.map_err(StorageError::from)?;
                let store = MongoRoomStore::connect(config)
                    .await
                    .map_err(StorageError::from)?;
                Ok(Arc::new(store) as Arc<dyn RoomStore>)
            }));
        }
        #[cfg(feature = "couch-store")]
        "couch" => {
            use trivia_rooms_back::dao::{
                room_store::couchdb::{CouchConfig, CouchRoomStore},
                storage::StorageError,
            };

            tokio::spawn(storage_supervisor::run(state, || async {
                let config = CouchConfig::from_env().map_err(StorageError::from)?;
                let store = CouchRoomStore::connect(config)
                    .await
                    .map_err(StorageError::from)?;
                Ok(Arc::new(store) as Arc<dyn RoomStore>)
            }));
        }
        other => bail!("unsupported STORAGE_BACKEND `{other}`"),
    }
    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
