//! `RoomcastServer` builder and accept loop.
//!
//! Ties the layers together: WebSocket transport → JSON protocol → room
//! registry.

use std::sync::Arc;
use std::time::Duration;

use roomcast_protocol::{Codec, JsonCodec, SessionActionMessage};
use roomcast_room::{Registry, RoomConfig};
use roomcast_transport::{Transport, WebSocketConnection, WebSocketTransport};

use crate::RoomcastError;
use crate::handler::handle_connection;

/// Default listen address.
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// How long a connection may stay silent before it is dropped.
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// The registry type the relay runs on: WebSocket members, session
/// actions as broadcast messages.
pub type RelayRegistry<C = JsonCodec> =
    Registry<WebSocketConnection, C, SessionActionMessage>;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: RelayRegistry<C>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a Roomcast server.
///
/// ```rust,ignore
/// let server = RoomcastServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .idle_timeout(Duration::from_secs(30))
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct RoomcastServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    idle_timeout: Duration,
}

impl RoomcastServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND.to_string(),
            room_config: RoomConfig::default(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the configuration every room is started with.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Sets how long a connection may go without sending a frame.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Binds the listener and builds the server with the JSON codec.
    pub async fn build(self) -> Result<RoomcastServer<JsonCodec>, RoomcastError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry: Registry::with_config(JsonCodec, self.room_config),
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
        });

        Ok(RoomcastServer { transport, state })
    }
}

impl Default for RoomcastServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Roomcast server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RoomcastServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl<C> RoomcastServer<C>
where
    C: Codec + Clone,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The room registry, shared with every connection handler.
    pub fn registry(&self) -> RelayRegistry<C> {
        self.state.registry.clone()
    }

    /// Runs the accept loop, spawning a handler task per connection.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), RoomcastError> {
        tracing::info!("Roomcast server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
