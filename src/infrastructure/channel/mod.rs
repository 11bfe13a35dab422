//! Session channel implementations.

mod websocket;

pub use websocket::{OutboundFrame, WebSocketSessionChannel};
