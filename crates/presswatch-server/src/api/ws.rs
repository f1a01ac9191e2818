//! WebSocket relay of pipeline events to the dashboard.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use presswatch_pipeline::PipelineEvent;
use tokio::sync::broadcast::{self, error::RecvError};

use super::AppState;

pub(super) const GREETING: &str =
    r#"{"type":"connected","message":"Connected to presswatch live updates"}"#;

pub(super) async fn events_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let events = state.status.subscribe();
    ws.on_upgrade(move |socket| relay(socket, events))
}

/// Forwards every event as a JSON text frame until either side goes away.
///
/// Incoming frames are read only to notice the close.
async fn relay(socket: WebSocket, mut events: broadcast::Receiver<PipelineEvent>) {
    let (mut sender, mut receiver) = socket.split();

    if sender.send(Message::Text(GREETING.into())).await.is_err() {
        return;
    }

    let mut send_task = tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "websocket subscriber lagged; events dropped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let Some(frame) = encode_event(&event) else {
                continue;
            };
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    tracing::debug!("websocket client disconnected");
}

pub(super) fn encode_event(event: &PipelineEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize pipeline event");
            None
        }
    }
}
