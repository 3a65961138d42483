//! Wire types for Roomcast.
//!
//! Everything in here is serialized to bytes and sent over a connection:
//! what clients send to the relay ([`ClientMessage`]) and what a room fans
//! out to its members ([`SessionActionMessage`]).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The name of a shared session, and therefore of the room backing it.
///
/// Session ids are generated elsewhere (typically by whoever starts a
/// game) and handed to every participant out of band. This layer treats
/// them as opaque strings.
///
/// `#[serde(transparent)]` keeps the JSON form a plain string:
/// `SessionId("abc")` is `"abc"` on the wire.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps a raw session id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Board positions
// ---------------------------------------------------------------------------

/// A board position: square name (`"e4"`) to piece code (`"wP"`).
///
/// A `BTreeMap` keeps the encoded JSON stable across runs, which makes
/// logs and test fixtures readable.
pub type Position = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// An action performed inside a session, fanned out to every member of
/// the session's room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionActionMessage {
    /// The session the action belongs to.
    pub session_id: SessionId,
    /// The board position after the action.
    pub position: Position,
}

/// Messages a client sends to the relay.
///
/// Internally tagged with snake_case names:
///
/// ```json
/// { "type": "join_room", "session_id": "abc" }
/// { "type": "move", "session_id": "abc", "position": { "e4": "wP" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join the room for `session_id`, creating it if needed.
    JoinRoom { session_id: SessionId },

    /// Publish a new position to everyone in the session.
    Move {
        session_id: SessionId,
        position: Position,
    },
}

impl ClientMessage {
    /// The session this message is addressed to.
    pub fn session_id(&self) -> &SessionId {
        match self {
            Self::JoinRoom { session_id } | Self::Move { session_id, .. } => {
                session_id
            }
        }
    }
}
