//! Per-connection handler: read client frames and route them to rooms.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The task only ever reads; all writes to the connection come from the
//! room the client joined.
//!
//!   1. `join_room` → register with the session's room (created on demand)
//!   2. `move` → broadcast to the session's room, if it is running
//!   3. close / error / idle timeout → leave the room

use std::sync::Arc;

use roomcast_protocol::{ClientMessage, Codec, SessionActionMessage};
use roomcast_room::Client;
use roomcast_transport::{Connection, WebSocketConnection};

use crate::RoomcastError;
use crate::server::ServerState;

/// Drop guard that takes a client out of its room when the handler exits.
///
/// Runs on every exit path, including panics. `Drop` is synchronous, so
/// the unregister is handed to a fire-and-forget task.
struct MembershipGuard<C: Codec + Clone> {
    client: Arc<Client<WebSocketConnection>>,
    state: Arc<ServerState<C>>,
}

impl<C: Codec + Clone> Drop for MembershipGuard<C> {
    fn drop(&mut self) {
        let client = Arc::clone(&self.client);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.registry.remove_client(&client).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), RoomcastError>
where
    C: Codec + Clone,
{
    let client = Arc::new(Client::new(conn));
    let conn_id = client.id();
    tracing::debug!(%conn_id, "handling new connection");

    let _guard = MembershipGuard {
        client: Arc::clone(&client),
        state: Arc::clone(&state),
    };

    loop {
        let data = match tokio::time::timeout(
            state.idle_timeout,
            client.connection().recv(),
        )
        .await
        {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection timed out");
                break;
            }
        };

        let msg: ClientMessage = match state.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(
                    %conn_id, error = %e, "failed to decode client message"
                );
                continue;
            }
        };

        match msg {
            ClientMessage::JoinRoom { session_id } => {
                // One session per connection: a second, different join
                // ends the connection with `AlreadyBound`.
                state
                    .registry
                    .join_room(&session_id, Arc::clone(&client))
                    .await?;
                tracing::debug!(%conn_id, %session_id, "joined room");
            }
            ClientMessage::Move {
                session_id,
                position,
            } => {
                let Some(room) = state.registry.find(&session_id).await else {
                    tracing::debug!(
                        %conn_id,
                        %session_id,
                        "move for session without a room, dropped"
                    );
                    continue;
                };
                let action = SessionActionMessage {
                    session_id,
                    position,
                };
                if let Err(e) = room.broadcast(action).await {
                    tracing::debug!(%conn_id, error = %e, "broadcast failed");
                }
            }
        }
    }

    // _guard drops here → client leaves its room.
    Ok(())
}
