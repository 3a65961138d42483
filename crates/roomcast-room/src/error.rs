//! Error types for the room layer.

use roomcast_protocol::{ProtocolError, SessionId};
use roomcast_transport::ConnectionId;

/// Errors that can occur during room operations.
///
/// Delivery failures to individual members are deliberately absent: the
/// room recovers from those itself by evicting the member.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room's event loop has terminated; the handle is stale.
    #[error("room {0} is unavailable")]
    Unavailable(SessionId),

    /// The client was already registered under another session.
    #[error("{client} is bound to session {bound}, not {requested}")]
    AlreadyBound {
        client: ConnectionId,
        bound: SessionId,
        requested: SessionId,
    },

    /// The broadcast message could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
