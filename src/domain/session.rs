//! Session entity: one live connection and its chat state.

use std::sync::Arc;

use super::SessionChannel;

/// Identifier assigned to a session for the lifetime of the process.
/// Never reused; used as the map key and for diagnostics.
pub type SessionId = u64;

/// One live connection in the room.
pub struct Session {
    /// Monotonically assigned id, starting at 1.
    pub id: SessionId,
    /// Empty string means the session is a lurker.
    pub nickname: String,
    /// Current score. Set from the configured initial points on claim.
    pub points: i64,
    /// Time of the last accepted tell; starts before any representable time.
    pub last_tell: f64,
    /// False once the transport reported close; the reaper removes it.
    pub open: bool,
    /// Outbound half of the connection.
    pub channel: Arc<dyn SessionChannel>,
    /// Sender name used for per-session diagnostics.
    pub diagnostics_sender_name: String,
}

impl Session {
    /// Create a fresh lurker session around an open channel.
    pub fn new(id: SessionId, channel: Arc<dyn SessionChannel>) -> Self {
        Self {
            id,
            nickname: String::new(),
            points: 0,
            last_tell: f64::NEG_INFINITY,
            open: true,
            channel,
            diagnostics_sender_name: format!("Session #{id}"),
        }
    }

    /// A lurker has no nickname: invisible to listings, cannot send tells.
    pub fn is_lurker(&self) -> bool {
        self.nickname.is_empty()
    }
}
