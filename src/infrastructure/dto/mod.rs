//! Wire-level data transfer objects.

pub mod websocket;
