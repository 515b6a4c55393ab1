//! Per-connection handler: reader loop, writer task and cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Open an outbox and spawn a writer task that drains it to the socket
//!   2. Loop: receive frames → decode → route to the lobby
//!   3. On close, the disconnect guard tells the lobby the player is gone

use std::sync::Arc;

use throwdown_protocol::{ClientMessage, Codec, JsonCodec, ServerMessage};
use throwdown_room::{Lobby, Participant};
use throwdown_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::ThrowdownError;
use crate::router;
use crate::server::ServerState;

/// Drop guard that removes a connection from the lobby when the handler
/// exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async lock.
struct DisconnectGuard {
    conn_id: ConnectionId,
    lobby: Lobby,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let lobby = self.lobby.clone();
        tokio::spawn(async move {
            lobby.disconnect(conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), ThrowdownError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::info!(%conn_id, peer = %conn.peer_addr(), "client connected");

    let (outbox, inbox) = mpsc::unbounded_channel();
    let participant = Participant::new(conn_id, outbox);
    let writer = tokio::spawn(write_outbound(Arc::clone(&conn), inbox, state.codec));

    let _guard = DisconnectGuard {
        conn_id,
        lobby: state.lobby.clone(),
    };

    let result = read_inbound(&conn, &state, &participant).await;
    writer.abort();

    // _guard drops here → lobby disconnect fires.
    result
}

/// Reads frames until the peer closes, routing each decoded message.
async fn read_inbound(
    conn: &WebSocketConnection,
    state: &ServerState,
    participant: &Participant,
) -> Result<(), ThrowdownError> {
    let conn_id = conn.id();
    while let Some(data) = conn.recv().await? {
        let msg: ClientMessage = match state.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "malformed message dropped");
                continue;
            }
        };
        router::dispatch(&state.lobby, participant, msg).await;
    }
    tracing::info!(%conn_id, "client disconnected");
    Ok(())
}

/// Drains the outbox onto the socket. Stops at the first failed send;
/// anything still queued for a closed connection is dropped.
async fn write_outbound(
    conn: Arc<WebSocketConnection>,
    mut inbox: mpsc::UnboundedReceiver<ServerMessage>,
    codec: JsonCodec,
) {
    let conn_id = conn.id();
    while let Some(msg) = inbox.recv().await {
        let bytes = match codec.encode(&msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(%conn_id, kind = msg.kind(), error = %e, "encode failed");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, closing writer");
            break;
        }
        tracing::trace!(%conn_id, kind = msg.kind(), "sent");
    }
}
