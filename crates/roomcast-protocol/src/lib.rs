//! Wire protocol for Roomcast.
//!
//! - **Types** ([`SessionId`], [`ClientMessage`], [`SessionActionMessage`])
//!   — what travels on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   turned into bytes. Rooms encode each broadcast exactly once through a
//!   codec and hand the same bytes to every member.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about connections or rooms.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{ClientMessage, Position, SessionActionMessage, SessionId};
