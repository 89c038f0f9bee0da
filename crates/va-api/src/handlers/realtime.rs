//! WebSocket push channel
//!
//! A client joins its room with `{"event":"join","userId":"<id>"}` and then
//! receives every notification pushed to that user. Joining again switches
//! rooms.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::{self, error::RecvError};
use va_core::Id;
use va_notifications::PushMessage;

use crate::extractors::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
enum ClientFrame {
    Join {
        #[serde(rename = "userId")]
        user_id: String,
    },
}

/// User id carried by a join frame, if the text is one
fn join_request(text: &str) -> Option<Id> {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(ClientFrame::Join { user_id }) => uuid::Uuid::parse_str(user_id.trim()).ok(),
        Err(_) => None,
    }
}

async fn next_push(room: &mut Option<broadcast::Receiver<PushMessage>>) -> Result<PushMessage, RecvError> {
    match room {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| session(socket, state))
}

async fn session(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut room: Option<broadcast::Receiver<PushMessage>> = None;
    tracing::debug!("WebSocket connected");

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => match join_request(&text) {
                    Some(user_id) => {
                        tracing::debug!(user_id = %user_id, "WebSocket joined room");
                        room = Some(state.ctx.hub.subscribe(user_id));
                    }
                    None => tracing::debug!("Ignoring unknown WebSocket frame"),
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "WebSocket receive failed");
                    break;
                }
            },
            pushed = next_push(&mut room) => match pushed {
                Ok(message) => {
                    let text = match serde_json::to_string(&message) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to encode push message");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "WebSocket client lagging, dropped messages");
                }
                Err(RecvError::Closed) => room = None,
            },
        }
    }

    tracing::debug!("WebSocket disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_request() {
        let id = uuid::Uuid::new_v4();
        let frame = format!(r#"{{"event":"join","userId":"{}"}}"#, id);
        assert_eq!(join_request(&frame), Some(id));
    }

    #[test]
    fn test_join_request_rejects_other_frames() {
        assert_eq!(join_request(r#"{"event":"join","userId":"nope"}"#), None);
        assert_eq!(join_request(r#"{"event":"leave","userId":"x"}"#), None);
        assert_eq!(join_request("not json"), None);
    }
}
