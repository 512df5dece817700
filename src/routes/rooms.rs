use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post, put},
};
use validator::Validate;

use crate::{
    dto::room::{
        ConfigurePlayerRequest, CreateRoomRequest, CreateRoomResponse, LeaveRoomResponse,
        PlayerInput, RoomMemberRequest, RoomResponse, RoomView, StartMatchResponse,
    },
    error::AppError,
    services::room_service,
    state::SharedState,
};

/// Room lifecycle endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/{code}", get(get_room))
        .route("/rooms/{code}/join", post(join_room))
        .route("/rooms/{code}/leave", delete(leave_room))
        .route("/rooms/{code}/configure", put(configure_player))
        .route("/rooms/{code}/start", post(start_match))
}

/// Open a room hosted by the caller.
#[utoipa::path(
    post,
    path = "/rooms",
    tag = "rooms",
    request_body = CreateRoomRequest,
    responses(
        (status = 200, description = "Room created", body = CreateRoomResponse),
        (status = 400, description = "Invalid payload"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn create_room(
    State(state): State<SharedState>,
    Json(payload): Json<CreateRoomRequest>,
) -> Result<Json<CreateRoomResponse>, AppError> {
    payload.validate()?;
    Ok(Json(room_service::create_room(&state, payload).await?))
}

/// Fetch a room by code.
#[utoipa::path(
    get,
    path = "/rooms/{code}",
    tag = "rooms",
    params(("code" = String, Path, description = "Six character room code")),
    responses(
        (status = 200, description = "Room state", body = RoomView),
        (status = 404, description = "Unknown room")
    )
)]
pub async fn get_room(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<RoomView>, AppError> {
    Ok(Json(room_service::get_room(&state, &code).await?))
}

/// Join a room as a regular player.
#[utoipa::path(
    post,
    path = "/rooms/{code}/join",
    tag = "rooms",
    params(("code" = String, Path, description = "Six character room code")),
    request_body = PlayerInput,
    responses(
        (status = 200, description = "Joined", body = RoomResponse),
        (status = 404, description = "Unknown room"),
        (status = 409, description = "Room full or player already in room")
    )
)]
pub async fn join_room(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Json(payload): Json<PlayerInput>,
) -> Result<Json<RoomResponse>, AppError> {
    payload.validate()?;
    Ok(Json(room_service::join_room(&state, &code, payload).await?))
}

/// Leave a room; the response carries `null` once the room was deleted.
#[utoipa::path(
    delete,
    path = "/rooms/{code}/leave",
    tag = "rooms",
    params(("code" = String, Path, description = "Six character room code")),
    request_body = RoomMemberRequest,
    responses(
        (status = 200, description = "Left", body = LeaveRoomResponse),
        (status = 404, description = "Unknown room or player")
    )
)]
pub async fn leave_room(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Json(payload): Json<RoomMemberRequest>,
) -> Result<Json<LeaveRoomResponse>, AppError> {
    payload.validate()?;
    Ok(Json(
        room_service::leave_room(&state, &code, &payload.user_id).await?,
    ))
}

/// Set the caller's topic and difficulty.
#[utoipa::path(
    put,
    path = "/rooms/{code}/configure",
    tag = "rooms",
    params(("code" = String, Path, description = "Six character room code")),
    request_body = ConfigurePlayerRequest,
    responses(
        (status = 200, description = "Configured", body = RoomResponse),
        (status = 404, description = "Unknown room or player")
    )
)]
pub async fn configure_player(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Json(payload): Json<ConfigurePlayerRequest>,
) -> Result<Json<RoomResponse>, AppError> {
    payload.validate()?;
    Ok(Json(
        room_service::configure_player(&state, &code, payload).await?,
    ))
}

/// Start a new match; host only.
#[utoipa::path(
    post,
    path = "/rooms/{code}/start",
    tag = "rooms",
    params(("code" = String, Path, description = "Six character room code")),
    request_body = RoomMemberRequest,
    responses(
        (status = 200, description = "Match started", body = StartMatchResponse),
        (status = 403, description = "Caller is not the host"),
        (status = 404, description = "Unknown room or player")
    )
)]
pub async fn start_match(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Json(payload): Json<RoomMemberRequest>,
) -> Result<Json<StartMatchResponse>, AppError> {
    payload.validate()?;
    Ok(Json(
        room_service::start_match(&state, &code, &payload.user_id).await?,
    ))
}
