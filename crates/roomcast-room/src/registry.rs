//! Registry: maps session ids to their running rooms.

use std::collections::HashMap;
use std::sync::Arc;

use roomcast_protocol::{Codec, SessionId};
use roomcast_transport::Connection;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::room::{RoomTable, spawn_room};
use crate::{Client, RoomConfig, RoomError, RoomHandle};

/// How many times [`Registry::join_room`] re-resolves a room that
/// terminated between lookup and registration.
const JOIN_ATTEMPTS: usize = 3;

/// Process-wide table of running rooms, keyed by session id.
///
/// A room is inserted when [`find_or_create`](Self::find_or_create) spawns
/// it and removed by the room itself when its last member leaves, so an
/// entry exists exactly while its actor runs. Both sides go through one
/// mutex; two tasks missing on the same id at once still end up with a
/// single room.
///
/// Clones share the same table. Create one registry at startup and hand
/// clones to whoever needs it.
///
/// Type parameters: `T` is the connection type of members, `C` the codec
/// used to encode broadcasts, `M` the broadcast message type.
pub struct Registry<T: Connection, C, M> {
    rooms: RoomTable<T, M>,
    codec: C,
    config: RoomConfig,
}

impl<T: Connection, C: Clone, M> Clone for Registry<T, C, M> {
    fn clone(&self) -> Self {
        Self {
            rooms: Arc::clone(&self.rooms),
            codec: self.codec.clone(),
            config: self.config.clone(),
        }
    }
}

impl<T, C, M> Registry<T, C, M>
where
    T: Connection,
    C: Codec + Clone,
    M: Serialize + Send + 'static,
{
    /// Creates an empty registry with the default room configuration.
    pub fn new(codec: C) -> Self {
        Self::with_config(codec, RoomConfig::default())
    }

    /// Creates an empty registry whose rooms use `config`.
    pub fn with_config(codec: C, config: RoomConfig) -> Self {
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            codec,
            config,
        }
    }

    /// Returns the room for `session_id`, starting one if none is running.
    pub async fn find_or_create(
        &self,
        session_id: &SessionId,
    ) -> RoomHandle<T, M> {
        let mut rooms = self.rooms.lock().await;
        if let Some(handle) = rooms.get(session_id) {
            return handle.clone();
        }

        let handle = spawn_room(
            session_id.clone(),
            &self.config,
            self.codec.clone(),
            Arc::clone(&self.rooms),
        );
        rooms.insert(session_id.clone(), handle.clone());
        tracing::info!(%session_id, rooms = rooms.len(), "room created");
        handle
    }

    /// Returns the running room for `session_id`, if any. Never creates.
    pub async fn find(&self, session_id: &SessionId) -> Option<RoomHandle<T, M>> {
        self.rooms.lock().await.get(session_id).cloned()
    }

    /// Finds or creates the room for `session_id` and registers `client`.
    ///
    /// A client already bound to another session is refused before any
    /// room is looked up, so a refused join never starts a room.
    ///
    /// A room found here may terminate before the registration reaches it
    /// (its last member left in between). In that case the lookup is
    /// repeated, which creates a fresh room.
    ///
    /// # Errors
    /// [`RoomError::AlreadyBound`] if the client belongs to another
    /// session; [`RoomError::Unavailable`] if every attempt raced a
    /// terminating room.
    pub async fn join_room(
        &self,
        session_id: &SessionId,
        client: Arc<Client<T>>,
    ) -> Result<RoomHandle<T, M>, RoomError> {
        match client.session_id() {
            Some(bound) if bound != session_id => {
                return Err(RoomError::AlreadyBound {
                    client: client.id(),
                    bound: bound.clone(),
                    requested: session_id.clone(),
                });
            }
            _ => {}
        }

        let mut attempt = 1;
        loop {
            let room = self.find_or_create(session_id).await;
            match room.register(Arc::clone(&client)).await {
                Ok(()) => return Ok(room),
                Err(RoomError::Unavailable(_)) if attempt < JOIN_ATTEMPTS => {
                    tracing::debug!(
                        %session_id,
                        attempt,
                        "room terminated before registration, retrying lookup"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Unregisters `client` from the room its session tag points at.
    ///
    /// Does nothing if the client never joined a room or the room is
    /// already gone.
    pub async fn remove_client(&self, client: &Client<T>) {
        let Some(session_id) = client.session_id() else {
            return;
        };
        let Some(room) = self.find(session_id).await else {
            return;
        };
        if let Err(e) = room.unregister(client).await {
            tracing::debug!(
                %session_id,
                client_id = %client.id(),
                error = %e,
                "room terminated before unregister"
            );
        }
    }

    /// Number of running rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Session ids of all running rooms.
    pub async fn session_ids(&self) -> Vec<SessionId> {
        self.rooms.lock().await.keys().cloned().collect()
    }
}
