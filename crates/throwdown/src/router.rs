//! Routes decoded client messages to the lobby.

use throwdown_protocol::ClientMessage;
use throwdown_room::{Lobby, Participant, RoomError};

/// Hands one inbound message from `player` to the matching lobby operation.
///
/// Nothing here fails the connection: rejected requests are answered by the
/// lobby itself (e.g. `ROOM_INVALID`) or logged and dropped.
pub async fn dispatch(lobby: &Lobby, player: &Participant, msg: ClientMessage) {
    let conn_id = player.id();
    tracing::debug!(%conn_id, kind = msg.kind(), "inbound message");

    match msg {
        ClientMessage::FindStranger => lobby.find_stranger(player.clone()).await,
        ClientMessage::CreateRoom => {
            if let Err(e) = lobby.create_room(player.clone()).await {
                log_rejection(player, &e);
            }
        }
        ClientMessage::JoinRoom { room_id } => {
            // The empty code never names a live room, so an id-less join
            // is answered with ROOM_INVALID like any unknown code.
            let code = room_id.unwrap_or_default();
            if let Err(e) = lobby.join_room(player.clone(), &code).await {
                log_rejection(player, &e);
            }
        }
        ClientMessage::Move { hand } => {
            lobby.submit_move(conn_id, hand).await;
        }
        ClientMessage::Unknown => {
            tracing::debug!(%conn_id, "unknown message type ignored");
        }
    }
}

fn log_rejection(player: &Participant, error: &RoomError) {
    let conn_id = player.id();
    match error {
        RoomError::CodesExhausted { .. } => {
            tracing::warn!(%conn_id, %error, "could not open a room");
        }
        _ => tracing::debug!(%conn_id, %error, "request rejected"),
    }
}
