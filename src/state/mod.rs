pub mod channels;
pub mod ranking;
pub mod room;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};
use tracing::info;

use crate::{
    config::AppConfig,
    dao::{room_repository::RoomRepository, room_store::RoomStore},
    error::ServiceError,
    question_supply::QuestionSupply,
};

use self::channels::RoomChannels;

pub type SharedState = Arc<AppState>;

/// Central application state: storage handle, realtime channels and collaborators.
pub struct AppState {
    room_store: RwLock<Option<Arc<dyn RoomStore>>>,
    degraded: watch::Sender<bool>,
    channels: RoomChannels,
    config: AppConfig,
    question_supply: Arc<dyn QuestionSupply>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig, question_supply: Arc<dyn QuestionSupply>) -> SharedState {
        Self::build(config, question_supply, None)
    }

    /// Construct a state with `store` already installed.
    pub fn with_store(
        config: AppConfig,
        question_supply: Arc<dyn QuestionSupply>,
        store: Arc<dyn RoomStore>,
    ) -> SharedState {
        Self::build(config, question_supply, Some(store))
    }

    fn build(
        config: AppConfig,
        question_supply: Arc<dyn QuestionSupply>,
        store: Option<Arc<dyn RoomStore>>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(store.is_none());
        Arc::new(Self {
            room_store: RwLock::new(store),
            degraded: degraded_tx,
            channels: RoomChannels::new(),
            config,
            question_supply,
        })
    }

    /// Obtain a handle to the current room store, if one is installed.
    pub async fn room_store(&self) -> Option<Arc<dyn RoomStore>> {
        let guard = self.room_store.read().await;
        guard.as_ref().cloned()
    }

    /// Room store for request handling; fails while degraded.
    pub async fn require_room_store(&self) -> Result<Arc<dyn RoomStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.room_store().await.ok_or(ServiceError::Degraded)
    }

    /// Repository over the current room store.
    pub async fn rooms(&self) -> Result<RoomRepository, ServiceError> {
        let store = self.require_room_store().await?;
        Ok(RoomRepository::new(store, self.config.room_code_attempts))
    }

    /// Install a new room store implementation and leave degraded mode.
    pub async fn set_room_store(&self, store: Arc<dyn RoomStore>) {
        {
            let mut guard = self.room_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update the degraded flag, logging only actual transitions.
    pub fn update_degraded(&self, value: bool) {
        let changed = self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
        if changed {
            info!(degraded = value, "degraded mode changed");
        }
    }

    /// Realtime fan-out registry.
    pub fn channels(&self) -> &RoomChannels {
        &self.channels
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Question generator, already wrapped with its retry policy.
    pub fn question_supply(&self) -> Arc<dyn QuestionSupply> {
        self.question_supply.clone()
    }
}
