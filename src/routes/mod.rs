use axum::Router;

use crate::state::SharedState;

pub mod client_config;
pub mod docs;
pub mod games;
pub mod health;
pub mod rooms;
pub mod stats;
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(client_config::router())
        .merge(rooms::router())
        .merge(games::router())
        .merge(stats::router())
        .merge(websocket::router())
        .merge(docs::router())
        .with_state(state)
}
