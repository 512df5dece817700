use axum::{Json, Router, extract::State, routing::get};

use crate::{dto::client_config::ClientConfigResponse, state::SharedState};

#[utoipa::path(
    get,
    path = "/client-config",
    tag = "health",
    responses((status = 200, description = "Client tuning values", body = ClientConfigResponse))
)]
/// Polling cadence and match size advertised to clients.
pub async fn client_config(State(state): State<SharedState>) -> Json<ClientConfigResponse> {
    Json(state.config().into())
}

/// Configure the client configuration route.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/client-config", get(client_config))
}
