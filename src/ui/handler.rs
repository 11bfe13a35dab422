//! Resource handler: session admission and socket shuttling.
//!
//! A WebSocket upgrade at the chat path becomes a session in the room; any
//! other request gets the plain-text fallback. After the upgrade, one task
//! drains the room's outbound frames into the socket while this handler
//! forwards inbound text to the dispatcher. A transport close (either
//! direction) marks the session for the reaper.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use futures_util::{sink::SinkExt, stream::StreamExt};

use crate::infrastructure::channel::{OutboundFrame, WebSocketSessionChannel};
use crate::room::Room;

/// Body returned to plain HTTP requests at the chat path.
pub const NOT_A_WEBSOCKET_BODY: &str = "Try again, but next time use a WebSocket.  Kthxbye!";

/// Handle a request at the configured chat path.
pub async fn chat_room_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(room): State<Arc<Room>>,
) -> Response {
    match ws {
        Ok(ws) => ws
            .on_upgrade(move |socket| handle_socket(socket, room))
            .into_response(),
        Err(rejection) => {
            tracing::debug!("non-WebSocket request at the chat path: {rejection}");
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/plain")],
                NOT_A_WEBSOCKET_BODY,
            )
                .into_response()
        }
    }
}

async fn handle_socket(socket: WebSocket, room: Arc<Room>) {
    let (mut socket_sender, mut socket_receiver) = socket.split();
    let (channel, mut frames) = WebSocketSessionChannel::new();
    let session_id = room.add_session(Arc::new(channel)).await;
    tracing::info!("session #{session_id} connected");

    // Drain room broadcasts into the socket.
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            match frame {
                OutboundFrame::Text(text) => {
                    if socket_sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                OutboundFrame::Close => {
                    let _ = socket_sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    // Forward inbound text to the dispatcher. One message at a time, so
    // inbound handling per session stays serialised.
    let receiver_room = Arc::clone(&room);
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = socket_receiver.next().await {
            let message = match result {
                Ok(message) => message,
                Err(error) => {
                    tracing::debug!("session #{session_id} socket error: {error}");
                    break;
                }
            };
            match message {
                Message::Text(text) => {
                    receiver_room.receive_message(session_id, text.as_str()).await;
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Either direction ending tears the other down.
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    }

    room.connection_closed(session_id).await;
    tracing::info!("session #{session_id} disconnected");
}
