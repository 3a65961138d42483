//! `roomcast-relay`: runs the Roomcast WebSocket relay.
//!
//! Environment:
//! - `ROOMCAST_BIND` — listen address (default `127.0.0.1:8080`)
//! - `RUST_LOG` — log filter (default `info`)

use roomcast::{DEFAULT_BIND, RoomcastError, RoomcastServerBuilder};

#[tokio::main]
async fn main() -> Result<(), RoomcastError> {
    roomcast::init_tracing();

    let addr = std::env::var("ROOMCAST_BIND")
        .unwrap_or_else(|_| DEFAULT_BIND.to_string());
    let server = RoomcastServerBuilder::new().bind(&addr).build().await?;
    server.run().await
}
