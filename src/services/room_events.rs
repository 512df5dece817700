use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        match_result::MatchFinished,
        room::RoomView,
        ws::{GameStartedEvent, UserConfiguredEvent, UserJoinedEvent, UserLeftEvent},
    },
    state::{
        SharedState,
        channels::{GAME_RESULTS, GAME_STARTED, RoomEvent, USER_CONFIGURED, USER_JOINED, USER_LEFT},
        room::{Difficulty, Player, Room},
    },
};

/// Announce a new member to the rest of the room.
pub fn broadcast_user_joined(state: &SharedState, room: &Room, player: &Player) {
    let payload = UserJoinedEvent {
        room_code: room.code.clone(),
        user_id: player.id.clone(),
        username: player.name.clone(),
        room: room.into(),
    };
    send_room_event(state, &room.code, USER_JOINED, &payload, Some(&player.id));
}

/// Announce a departure; `room` is `None` when the room was deleted.
pub fn broadcast_user_left(
    state: &SharedState,
    room_code: &str,
    user_id: &str,
    new_host_id: Option<String>,
    room: Option<&Room>,
) {
    let payload = UserLeftEvent {
        room_code: room_code.to_owned(),
        user_id: user_id.to_owned(),
        new_host_id,
        room: room.map(RoomView::from),
    };
    send_room_event(state, room_code, USER_LEFT, &payload, Some(user_id));
}

/// Announce a member's topic and difficulty.
pub fn broadcast_user_configured(state: &SharedState, room: &Room, player: &Player) {
    let payload = UserConfiguredEvent {
        room_code: room.code.clone(),
        user_id: player.id.clone(),
        topic: player.topic.clone(),
        difficulty: player.difficulty,
        configured: player.configured(),
    };
    send_room_event(state, &room.code, USER_CONFIGURED, &payload, Some(&player.id));
}

/// Tell every member, the host included, that a match started.
pub fn broadcast_game_started(
    state: &SharedState,
    room: &Room,
    topics: Vec<String>,
    difficulty: Difficulty,
) {
    let payload = GameStartedEvent {
        room_code: room.code.clone(),
        round: room.round,
        topics,
        difficulty,
    };
    send_room_event(state, &room.code, GAME_STARTED, &payload, None);
}

/// Fan out the final ranking to every member.
pub fn broadcast_game_results(state: &SharedState, results: &MatchFinished) {
    send_room_event(state, &results.room_code, GAME_RESULTS, results, None);
}

fn send_room_event<T>(
    state: &SharedState,
    room_code: &str,
    event: &str,
    payload: &T,
    except: Option<&str>,
) where
    T: Serialize,
{
    match RoomEvent::json(event, payload) {
        Ok(event) => {
            state.channels().publish(room_code, &event, except);
        }
        Err(err) => warn!(room = %room_code, %event, error = %err, "failed to encode room event"),
    }
}
