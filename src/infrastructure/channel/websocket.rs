//! WebSocket-backed session channel.
//!
//! The room queues frames on an unbounded sender; a per-connection writer
//! task in the UI layer drains the receiver into the socket. Close is a frame
//! too, so the writer shuts the connection down in send order.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{ChannelError, SessionChannel};

/// Frame queued for the per-connection writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// One text frame for the peer.
    Text(String),
    /// Close the connection after the frames queued before it.
    Close,
}

/// Channel half handed to the room; the receiver goes to the writer task.
pub struct WebSocketSessionChannel {
    frames: mpsc::UnboundedSender<OutboundFrame>,
}

impl WebSocketSessionChannel {
    /// Create the channel pair for one connection.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (frames, writer) = mpsc::unbounded_channel();
        (Self { frames }, writer)
    }
}

#[async_trait]
impl SessionChannel for WebSocketSessionChannel {
    async fn send_text(&self, text: String) -> Result<(), ChannelError> {
        self.frames
            .send(OutboundFrame::Text(text))
            .map_err(|_| ChannelError::Closed)
    }

    async fn close(&self) {
        // The writer may already be gone; closing twice is harmless.
        let _ = self.frames.send(OutboundFrame::Close);
    }
}
