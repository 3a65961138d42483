//! Room configuration and state machine.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration shared by every room a registry spawns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Capacity of each per-kind event queue (register, unregister,
    /// broadcast). The default of 1 keeps the handoff close to a
    /// rendezvous: a sender waits until the loop has room for its event,
    /// and then again until the loop has handled it.
    ///
    /// Values below 1 are treated as 1.
    pub event_buffer: usize,
}

impl RoomConfig {
    /// The queue capacity actually used by a room.
    pub(crate) fn channel_size(&self) -> usize {
        self.event_buffer.max(1)
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self { event_buffer: 1 }
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// ```text
/// Running ──(membership drops to zero)──→ Terminated
/// ```
///
/// - **Running**: the event loop is processing events and the room is
///   listed in the registry.
/// - **Terminated**: the loop has exited and the registry entry is gone.
///   There is no way back; the next lookup for the same session id
///   creates a fresh room.
///
/// The zero-membership check runs after every removal, whether the member
/// unregistered or was evicted for a failed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomState {
    Running,
    Terminated,
}

impl RoomState {
    /// Returns `true` while the event loop should keep going.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "Running"),
            Self::Terminated => write!(f, "Terminated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_state_is_running() {
        assert!(RoomState::Running.is_running());
        assert!(!RoomState::Terminated.is_running());
    }

    #[test]
    fn test_room_state_display() {
        assert_eq!(RoomState::Running.to_string(), "Running");
        assert_eq!(RoomState::Terminated.to_string(), "Terminated");
    }

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.event_buffer, 1);
        assert_eq!(config.channel_size(), 1);
    }

    #[test]
    fn test_room_config_zero_buffer_is_clamped() {
        let config = RoomConfig { event_buffer: 0 };
        assert_eq!(config.channel_size(), 1);
    }
}
