//! Per-session broadcast rooms for Roomcast.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns the
//! membership set of one session. Clients join a room by session id, the
//! room fans every broadcast out to all current members, and the room
//! tears itself down when its last member leaves.
//!
//! # Key types
//!
//! - [`Registry`] — finds or starts the room for a session id
//! - [`RoomHandle`] — register, unregister, broadcast on a running room
//! - [`Client`] — a connection plus the session it was registered into
//! - [`RoomState`] — `Running` / `Terminated`
//! - [`RoomConfig`] — queue sizing for room actors

mod client;
mod config;
mod error;
mod registry;
mod room;

pub use client::Client;
pub use config::{RoomConfig, RoomState};
pub use error::RoomError;
pub use registry::Registry;
pub use room::{RoomHandle, RoomInfo};
