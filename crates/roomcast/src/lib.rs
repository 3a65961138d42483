//! # Roomcast
//!
//! Realtime fan-out rooms over WebSocket.
//!
//! Clients join a named session; every move a client publishes is
//! broadcast to everyone currently in that session. Each session is served
//! by its own room actor (see [`roomcast_room`]), created on first join and
//! torn down when the last member leaves.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use roomcast::prelude::*;
//!
//! # async fn run() -> Result<(), RoomcastError> {
//! roomcast::init_tracing();
//! let server = RoomcastServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::RoomcastError;
pub use server::{DEFAULT_BIND, RelayRegistry, RoomcastServer, RoomcastServerBuilder};

use tracing_subscriber::EnvFilter;

/// Commonly used types, re-exported for `use roomcast::prelude::*`.
pub mod prelude {
    pub use crate::{RelayRegistry, RoomcastError, RoomcastServer, RoomcastServerBuilder};
    pub use roomcast_protocol::{
        ClientMessage, Codec, JsonCodec, Position, SessionActionMessage, SessionId,
    };
    pub use roomcast_room::{
        Client, Registry, RoomConfig, RoomError, RoomHandle, RoomInfo, RoomState,
    };
    pub use roomcast_transport::{Connection, ConnectionId};
}

/// Installs a `tracing` subscriber that prints to stderr.
///
/// Honors `RUST_LOG`; defaults to `info`. Calling it again is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
