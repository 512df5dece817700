use std::collections::HashSet;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        room::ConfigurePlayerRequest,
        ws::{ErrorEvent, RoomInboundMessage},
    },
    error::{AppError, ServiceError},
    services::room_service,
    state::{
        SharedState,
        channels::{ERROR, RoomEvent, RoomMember},
        room::RoomError,
    },
};

/// Channel subscriptions held by one socket, as `(room code, user id)`.
type Subscriptions = HashSet<(String, String)>;

/// Handle the full lifecycle of a room WebSocket connection.
///
/// Membership itself lives in the room store; the socket only subscribes to
/// channels of rooms its user already belongs to.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let connection_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    debug!(connection = %connection_id, "room socket connected");
    let mut subscriptions = Subscriptions::new();

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let inbound = match RoomInboundMessage::from_json_str(&text) {
                    Ok(inbound) => inbound,
                    Err(err) => {
                        debug!(connection = %connection_id, error = %err, "rejected room message");
                        let app_error = AppError::from(ServiceError::InvalidInput(err.to_string()));
                        if !send_error(&outbound_tx, &app_error) {
                            break;
                        }
                        continue;
                    }
                };

                let result = handle_message(
                    &state,
                    inbound,
                    connection_id,
                    &outbound_tx,
                    &mut subscriptions,
                )
                .await;
                if let Err(err) = result {
                    if !send_error(&outbound_tx, &AppError::from(err)) {
                        break;
                    }
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(connection = %connection_id, error = %err, "websocket error");
                break;
            }
        }
    }

    for (room_code, user_id) in &subscriptions {
        state.channels().leave(room_code, user_id, connection_id);
    }
    debug!(
        connection = %connection_id,
        rooms = subscriptions.len(),
        "room socket disconnected"
    );

    finalize(writer_task, outbound_tx).await;
}

async fn handle_message(
    state: &SharedState,
    message: RoomInboundMessage,
    connection_id: Uuid,
    outbound_tx: &mpsc::UnboundedSender<Message>,
    subscriptions: &mut Subscriptions,
) -> Result<(), ServiceError> {
    match message {
        RoomInboundMessage::JoinRoom { room_code, user_id } => {
            let room_code = room_service::normalize_room_code(&room_code)?;
            let room = state
                .rooms()
                .await?
                .get_room(&room_code)
                .await?
                .ok_or_else(|| RoomError::RoomNotFound(room_code.clone()))?;
            if room.player(&user_id).is_none() {
                return Err(RoomError::PlayerNotInRoom(user_id).into());
            }

            state.channels().join(
                &room_code,
                RoomMember {
                    user_id: user_id.clone(),
                    connection_id,
                    tx: outbound_tx.clone(),
                },
            );
            info!(room = %room_code, user = %user_id, "socket subscribed to room");
            subscriptions.insert((room_code, user_id));
        }
        RoomInboundMessage::LeaveRoom { room_code, user_id } => {
            let room_code = room_service::normalize_room_code(&room_code)?;
            state.channels().leave(&room_code, &user_id, connection_id);
            subscriptions.remove(&(room_code.clone(), user_id.clone()));
            room_service::leave_room(state, &room_code, &user_id).await?;
        }
        RoomInboundMessage::UserConfigured {
            room_code,
            user_id,
            topic,
            difficulty,
        } => {
            room_service::configure_player(
                state,
                &room_code,
                ConfigurePlayerRequest {
                    user_id,
                    topic,
                    difficulty,
                },
            )
            .await?;
        }
        RoomInboundMessage::StartGame { room_code, user_id } => {
            room_service::start_match(state, &room_code, &user_id).await?;
        }
        RoomInboundMessage::Unknown => {
            debug!(connection = %connection_id, "ignoring unknown room message type");
        }
    }
    Ok(())
}

/// Report a failed request to this socket only; `false` once the writer is gone.
fn send_error(tx: &mpsc::UnboundedSender<Message>, err: &AppError) -> bool {
    let payload = ErrorEvent {
        code: err.code().to_owned(),
        message: err.to_string(),
    };
    match RoomEvent::json(ERROR, &payload) {
        Ok(event) => event.send_to(tx),
        Err(err) => {
            warn!(error = %err, "failed to encode error event");
            true
        }
    }
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
