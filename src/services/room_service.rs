use tracing::debug;

use crate::{
    dto::{
        room::{
            ConfigurePlayerRequest, CreateRoomRequest, CreateRoomResponse, LeaveRoomResponse,
            PlayerInput, RoomResponse, RoomView, StartMatchResponse,
        },
        validation::validate_room_code,
    },
    error::ServiceError,
    services::room_events,
    state::{
        SharedState,
        room::{Player, RoomError},
    },
};

/// Open a room hosted by the requesting player.
pub async fn create_room(
    state: &SharedState,
    request: CreateRoomRequest,
) -> Result<CreateRoomResponse, ServiceError> {
    let CreateRoomRequest {
        name,
        max_players,
        host,
    } = request;

    let name = name.trim().to_owned();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput("room name must not be blank".into()));
    }

    let room = state
        .rooms()
        .await?
        .create_room(name, max_players, host.into())
        .await?;

    Ok(CreateRoomResponse {
        success: true,
        room_code: room.code.clone(),
        room: (&room).into(),
    })
}

/// Fetch the current state of a room.
pub async fn get_room(state: &SharedState, code: &str) -> Result<RoomView, ServiceError> {
    let code = normalize_room_code(code)?;
    let room = state
        .rooms()
        .await?
        .get_room(&code)
        .await?
        .ok_or(RoomError::RoomNotFound(code))?;
    Ok((&room).into())
}

/// Add a player to a room and notify the other members.
pub async fn join_room(
    state: &SharedState,
    code: &str,
    player: PlayerInput,
) -> Result<RoomResponse, ServiceError> {
    let code = normalize_room_code(code)?;
    let player: Player = player.into();
    let room = state.rooms().await?.join_room(&code, player.clone()).await?;

    if let Some(joined) = room.player(&player.id) {
        room_events::broadcast_user_joined(state, &room, joined);
    }

    Ok(RoomResponse {
        success: true,
        room: (&room).into(),
    })
}

/// Remove a player; the room disappears with its last member.
pub async fn leave_room(
    state: &SharedState,
    code: &str,
    user_id: &str,
) -> Result<LeaveRoomResponse, ServiceError> {
    let code = normalize_room_code(code)?;
    let repository = state.rooms().await?;
    let previous_host = repository
        .get_room(&code)
        .await?
        .and_then(|room| room.host().map(|host| host.id.clone()));

    let room = repository.leave_room(&code, user_id).await?;

    let new_host_id = room
        .as_ref()
        .and_then(|room| room.host())
        .map(|host| host.id.clone())
        .filter(|host| previous_host.as_deref() != Some(host.as_str()));
    if room.is_none() {
        debug!(room = %code, "room emptied and deleted");
    }
    room_events::broadcast_user_left(state, &code, user_id, new_host_id, room.as_ref());

    Ok(LeaveRoomResponse {
        success: true,
        room: room.as_ref().map(Into::into),
    })
}

/// Store a member's topic and difficulty and notify the room.
pub async fn configure_player(
    state: &SharedState,
    code: &str,
    request: ConfigurePlayerRequest,
) -> Result<RoomResponse, ServiceError> {
    let code = normalize_room_code(code)?;
    let ConfigurePlayerRequest {
        user_id,
        topic,
        difficulty,
    } = request;

    let room = state
        .rooms()
        .await?
        .configure_player(&code, &user_id, topic, difficulty)
        .await?;

    if let Some(player) = room.player(&user_id) {
        room_events::broadcast_user_configured(state, &room, player);
    }

    Ok(RoomResponse {
        success: true,
        room: (&room).into(),
    })
}

/// Open a new round on behalf of the host and announce it.
pub async fn start_match(
    state: &SharedState,
    code: &str,
    user_id: &str,
) -> Result<StartMatchResponse, ServiceError> {
    let code = normalize_room_code(code)?;
    let room = state.rooms().await?.start_match(&code, user_id).await?;

    let topics = room.match_topics();
    let difficulty = room.match_difficulty();
    room_events::broadcast_game_started(state, &room, topics.clone(), difficulty);

    Ok(StartMatchResponse {
        success: true,
        round: room.round,
        room: (&room).into(),
        topics,
        difficulty,
    })
}

/// Uppercase and validate a room code taken from a path or message.
pub fn normalize_room_code(code: &str) -> Result<String, ServiceError> {
    let code = code.trim().to_ascii_uppercase();
    validate_room_code(&code).map_err(|err| {
        ServiceError::InvalidInput(
            err.message
                .map(|message| message.into_owned())
                .unwrap_or_else(|| "invalid room code".into()),
        )
    })?;
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_codes_are_uppercased_before_validation() {
        assert_eq!(normalize_room_code(" ab12cd ").unwrap(), "AB12CD");
        assert!(matches!(
            normalize_room_code("ab1"),
            Err(ServiceError::InvalidInput(_))
        ));
    }
}
