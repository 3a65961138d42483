//! The client handle rooms keep in their membership sets.

use std::sync::OnceLock;

use roomcast_protocol::SessionId;
use roomcast_transport::{Connection, ConnectionId};

/// A connected client as seen by the room layer.
///
/// Wraps a [`Connection`] together with the session the client was
/// registered into. The session tag is written once, by the room, when it
/// accepts the registration; afterwards it only serves to route
/// [`Registry::remove_client`](crate::Registry::remove_client) to the
/// right room.
///
/// Clients are shared as `Arc<Client<T>>` between the task reading from
/// the connection and the room writing to it.
pub struct Client<T: Connection> {
    conn: T,
    session_id: OnceLock<SessionId>,
}

impl<T: Connection> Client<T> {
    /// Wraps a connection that has not joined any session yet.
    pub fn new(conn: T) -> Self {
        Self {
            conn,
            session_id: OnceLock::new(),
        }
    }

    /// The client's identity: its connection id.
    pub fn id(&self) -> ConnectionId {
        self.conn.id()
    }

    /// The underlying connection.
    pub fn connection(&self) -> &T {
        &self.conn
    }

    /// The session this client was registered into, if any.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.get()
    }

    /// Tags the client with `session_id`.
    ///
    /// Succeeds when the client is untagged or already carries the same
    /// tag. Otherwise returns the session it is already bound to.
    pub(crate) fn bind(&self, session_id: &SessionId) -> Result<(), SessionId> {
        let bound = self.session_id.get_or_init(|| session_id.clone());
        if bound == session_id {
            Ok(())
        } else {
            Err(bound.clone())
        }
    }

    pub(crate) async fn send(&self, data: &[u8]) -> Result<(), T::Error> {
        self.conn.send(data).await
    }

    /// Sends a close notification, then closes the connection. Errors are
    /// logged; the client is being dropped either way.
    pub(crate) async fn shut_down(&self) {
        if let Err(e) = self.conn.notify_close().await {
            tracing::debug!(conn_id = %self.id(), error = %e, "close notification failed");
        }
        if let Err(e) = self.conn.close().await {
            tracing::debug!(conn_id = %self.id(), error = %e, "close failed");
        }
    }
}

impl<T: Connection> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id())
            .field("session_id", &self.session_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use roomcast_transport::TransportError;

    use super::*;

    struct NullConnection;

    impl Connection for NullConnection {
        type Error = TransportError;

        async fn send(&self, _data: &[u8]) -> Result<(), Self::Error> {
            Ok(())
        }

        async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
            Ok(None)
        }

        async fn close(&self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn id(&self) -> ConnectionId {
            ConnectionId::new(9)
        }
    }

    #[test]
    fn test_new_client_is_untagged() {
        let client = Client::new(NullConnection);
        assert!(client.session_id().is_none());
        assert_eq!(client.id(), ConnectionId::new(9));
    }

    #[test]
    fn test_bind_is_write_once() {
        let client = Client::new(NullConnection);
        let abc = SessionId::new("abc");

        assert!(client.bind(&abc).is_ok());
        assert!(client.bind(&abc).is_ok(), "same session rebinds fine");

        let err = client.bind(&SessionId::new("xyz")).unwrap_err();
        assert_eq!(err, abc);
        assert_eq!(client.session_id(), Some(&abc));
    }

    #[test]
    fn test_debug_shows_identity_and_session() {
        let client = Client::new(NullConnection);
        client.bind(&SessionId::new("abc")).unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("ConnectionId(9)"));
        assert!(debug.contains("abc"));
    }
}
