//! Room actor: one Tokio task per session owning that session's members.
//!
//! The membership set lives inside the actor and nothing else touches it,
//! so it needs no lock. The outside world talks to the room through a
//! [`RoomHandle`], which turns every operation into an event on one of the
//! room's queues:
//!
//! - **register**: tag the client with the session id and add it.
//! - **broadcast**: encode once, then write to every member in turn. A
//!   member whose write fails is evicted on the spot.
//! - **unregister**: remove the client if present.
//!
//! Each kind has its own queue, so events of one kind are handled in the
//! order a given sender issued them. Across kinds the loop picks fairly
//! among whichever queues are ready; a register and a broadcast sent at
//! the same moment from different tasks may be handled in either order.
//!
//! When a removal (unregister or eviction) or a refused registration leaves
//! the room empty, the room takes itself out of the registry and its loop
//! exits. Handles to it then
//! report [`RoomError::Unavailable`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use roomcast_protocol::{Codec, SessionId};
use roomcast_transport::{Connection, ConnectionId};
use serde::Serialize;
use tokio::sync::{Mutex, mpsc, oneshot};

use crate::{Client, RoomConfig, RoomError, RoomState};

/// Counter distinguishing successive rooms for the same session id.
static NEXT_ROOM_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// The registry's table, shared with every room so a room can remove its
/// own entry on the way out.
pub(crate) type RoomTable<T, M> =
    Arc<Mutex<HashMap<SessionId, RoomHandle<T, M>>>>;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

// Each event carries a reply channel. The sender awaits it, so a call on
// the handle returns only after the loop has taken the event.

struct Register<T: Connection> {
    client: Arc<Client<T>>,
    reply: oneshot::Sender<Result<(), RoomError>>,
}

struct Unregister {
    client_id: ConnectionId,
    reply: oneshot::Sender<()>,
}

struct Broadcast<M> {
    message: M,
    reply: oneshot::Sender<Result<(), RoomError>>,
}

/// A snapshot of a room's metadata.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    /// The session the room serves.
    pub session_id: SessionId,
    /// Current lifecycle state.
    pub state: RoomState,
    /// Number of members right now.
    pub member_count: usize,
}

// ---------------------------------------------------------------------------
// RoomHandle
// ---------------------------------------------------------------------------

/// Handle to a running room actor.
///
/// Cheap to clone: it is a bundle of `mpsc::Sender`s. The registry holds
/// one per running room and hands out clones.
pub struct RoomHandle<T: Connection, M> {
    session_id: SessionId,
    instance: u64,
    register: mpsc::Sender<Register<T>>,
    unregister: mpsc::Sender<Unregister>,
    broadcast: mpsc::Sender<Broadcast<M>>,
    info: mpsc::Sender<oneshot::Sender<RoomInfo>>,
}

impl<T: Connection, M> Clone for RoomHandle<T, M> {
    fn clone(&self) -> Self {
        Self {
            session_id: self.session_id.clone(),
            instance: self.instance,
            register: self.register.clone(),
            unregister: self.unregister.clone(),
            broadcast: self.broadcast.clone(),
            info: self.info.clone(),
        }
    }
}

impl<T: Connection, M> RoomHandle<T, M> {
    /// The session this room serves.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Returns `true` if both handles point at the same room actor.
    ///
    /// Two rooms that served the same session id one after another are
    /// different rooms.
    pub fn same_room(&self, other: &Self) -> bool {
        self.instance == other.instance
    }

    /// Returns `true` once the room's loop has exited.
    pub fn is_terminated(&self) -> bool {
        self.register.is_closed()
    }

    pub(crate) fn instance(&self) -> u64 {
        self.instance
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.session_id.clone())
    }

    /// Adds `client` to the room and tags it with the room's session id.
    ///
    /// Resolves after the client is a member. Registering a current member
    /// again is harmless.
    ///
    /// # Errors
    /// [`RoomError::AlreadyBound`] if the client belongs to another
    /// session, [`RoomError::Unavailable`] if the room has terminated.
    pub async fn register(
        &self,
        client: Arc<Client<T>>,
    ) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.register
            .send(Register {
                client,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Removes `client` from the room. Removing a non-member does nothing.
    ///
    /// Resolves after the removal, and after the room has left the
    /// registry if this was its last member.
    pub async fn unregister(&self, client: &Client<T>) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.unregister
            .send(Unregister {
                client_id: client.id(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Hands `message` to the room for delivery to every member.
    ///
    /// Resolves once the room has accepted and encoded the message; the
    /// writes to members happen afterwards. Delivery failures are handled
    /// by the room and never reported here.
    ///
    /// # Errors
    /// [`RoomError::Protocol`] if the message cannot be encoded,
    /// [`RoomError::Unavailable`] if the room has terminated.
    pub async fn broadcast(&self, message: M) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.broadcast
            .send(Broadcast {
                message,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Requests the current room info.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.info
            .send(reply_tx)
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }
}

// ---------------------------------------------------------------------------
// RoomActor
// ---------------------------------------------------------------------------

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<T: Connection, C, M> {
    session_id: SessionId,
    instance: u64,
    state: RoomState,
    members: HashMap<ConnectionId, Arc<Client<T>>>,
    codec: C,
    rooms: RoomTable<T, M>,
    register_rx: mpsc::Receiver<Register<T>>,
    unregister_rx: mpsc::Receiver<Unregister>,
    broadcast_rx: mpsc::Receiver<Broadcast<M>>,
    info_rx: mpsc::Receiver<oneshot::Sender<RoomInfo>>,
}

impl<T, C, M> RoomActor<T, C, M>
where
    T: Connection,
    C: Codec,
    M: Serialize + Send + 'static,
{
    /// Runs the actor loop until the room terminates.
    async fn run(mut self) {
        tracing::info!(session_id = %self.session_id, "room actor started");

        while self.state.is_running() {
            tokio::select! {
                Some(event) = self.register_rx.recv() => {
                    self.handle_register(event).await;
                }
                Some(event) = self.broadcast_rx.recv() => {
                    self.handle_broadcast(event).await;
                }
                Some(event) = self.unregister_rx.recv() => {
                    self.handle_unregister(event).await;
                }
                Some(reply) = self.info_rx.recv() => {
                    let _ = reply.send(self.info());
                }
                // All queues closed. Cannot happen while the registry
                // entry holds a handle, but select! panics without an
                // arm for it.
                else => self.terminate().await,
            }
        }

        tracing::info!(session_id = %self.session_id, "room actor stopped");
    }

    async fn handle_register(&mut self, event: Register<T>) {
        let Register { client, reply } = event;
        let client_id = client.id();

        let result = match client.bind(&self.session_id) {
            Ok(()) => {
                self.members.insert(client_id, client);
                tracing::info!(
                    session_id = %self.session_id,
                    %client_id,
                    members = self.members.len(),
                    "client registered"
                );
                Ok(())
            }
            Err(bound) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    %client_id,
                    %bound,
                    "client already bound to another session"
                );
                Err(RoomError::AlreadyBound {
                    client: client_id,
                    bound,
                    requested: self.session_id.clone(),
                })
            }
        };
        // A room whose only registration was refused would never see a
        // removal, so it ends here instead.
        if result.is_err() {
            self.terminate_if_empty().await;
        }
        let _ = reply.send(result);
    }

    async fn handle_broadcast(&mut self, event: Broadcast<M>) {
        let Broadcast { message, reply } = event;

        let payload = match self.codec.encode(&message) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(
                    session_id = %self.session_id,
                    error = %e,
                    "failed to encode broadcast"
                );
                let _ = reply.send(Err(e.into()));
                return;
            }
        };
        let _ = reply.send(Ok(()));

        tracing::debug!(
            session_id = %self.session_id,
            bytes = payload.len(),
            members = self.members.len(),
            "broadcasting message"
        );

        // Writes are serial: a slow member holds up the whole room.
        let recipients: Vec<Arc<Client<T>>> =
            self.members.values().cloned().collect();
        for client in recipients {
            if let Err(e) = client.send(&payload).await {
                tracing::warn!(
                    session_id = %self.session_id,
                    client_id = %client.id(),
                    error = %e,
                    "delivery failed, evicting client"
                );
                self.evict(&client).await;
            }
        }
    }

    async fn handle_unregister(&mut self, event: Unregister) {
        let Unregister { client_id, reply } = event;

        if self.members.remove(&client_id).is_some() {
            tracing::info!(
                session_id = %self.session_id,
                %client_id,
                members = self.members.len(),
                "client unregistered"
            );
            self.terminate_if_empty().await;
        } else {
            tracing::debug!(
                session_id = %self.session_id,
                %client_id,
                "unregister for non-member ignored"
            );
        }

        let _ = reply.send(());
    }

    /// Drops a member whose delivery failed: close notification, close,
    /// remove. The emptiness check runs here too.
    async fn evict(&mut self, client: &Client<T>) {
        client.shut_down().await;
        self.members.remove(&client.id());
        tracing::info!(
            session_id = %self.session_id,
            client_id = %client.id(),
            members = self.members.len(),
            "client evicted"
        );
        self.terminate_if_empty().await;
    }

    async fn terminate_if_empty(&mut self) {
        if self.members.is_empty() {
            tracing::info!(session_id = %self.session_id, "room is empty");
            self.terminate().await;
        }
    }

    /// Running → Terminated. Removes the registry entry, but only if it
    /// still belongs to this room.
    async fn terminate(&mut self) {
        self.state = RoomState::Terminated;

        let mut rooms = self.rooms.lock().await;
        let owns_entry = rooms
            .get(&self.session_id)
            .is_some_and(|handle| handle.instance() == self.instance);
        if owns_entry {
            rooms.remove(&self.session_id);
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            session_id: self.session_id.clone(),
            state: self.state,
            member_count: self.members.len(),
        }
    }
}

/// Spawns a new room actor task and returns a handle to it.
///
/// The caller is responsible for inserting the handle into `rooms`; the
/// registry does so under the same lock it used to look the id up.
pub(crate) fn spawn_room<T, C, M>(
    session_id: SessionId,
    config: &RoomConfig,
    codec: C,
    rooms: RoomTable<T, M>,
) -> RoomHandle<T, M>
where
    T: Connection,
    C: Codec,
    M: Serialize + Send + 'static,
{
    let size = config.channel_size();
    let (register_tx, register_rx) = mpsc::channel(size);
    let (unregister_tx, unregister_rx) = mpsc::channel(size);
    let (broadcast_tx, broadcast_rx) = mpsc::channel(size);
    let (info_tx, info_rx) = mpsc::channel(size);
    let instance = NEXT_ROOM_INSTANCE.fetch_add(1, Ordering::Relaxed);

    let actor = RoomActor {
        session_id: session_id.clone(),
        instance,
        state: RoomState::Running,
        members: HashMap::new(),
        codec,
        rooms,
        register_rx,
        unregister_rx,
        broadcast_rx,
        info_rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        session_id,
        instance,
        register: register_tx,
        unregister: unregister_tx,
        broadcast: broadcast_tx,
        info: info_tx,
    }
}
