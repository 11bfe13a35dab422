//! Outbound message channel abstraction.
//!
//! The room never touches a socket directly: it hands encoded text frames to
//! this trait. The infrastructure layer provides the WebSocket-backed
//! implementation; tests substitute an in-memory recorder.

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a session channel.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The peer side of the channel is gone.
    #[error("channel to the peer is closed")]
    Closed,
}

/// One session's outbound half.
#[async_trait]
pub trait SessionChannel: Send + Sync {
    /// Queue one text frame for delivery to the peer.
    async fn send_text(&self, text: String) -> Result<(), ChannelError>;

    /// Ask the transport to close the connection after pending frames.
    async fn close(&self);
}
