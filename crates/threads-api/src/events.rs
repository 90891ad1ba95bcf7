use axum::{
    Extension,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use threads_types::api::Claims;
use threads_types::events::RealtimeEvent;

use crate::state::AppState;

/// GET /events: upgrade to a WebSocket that streams realtime events.
pub async fn subscribe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    // Subscribe before the upgrade so nothing published in between is lost
    let rx = state.notifier.subscribe();
    ws.on_upgrade(move |socket| forward(socket, rx, claims.sub))
}

async fn forward(socket: WebSocket, mut rx: broadcast::Receiver<RealtimeEvent>, user_id: String) {
    let (mut sender, mut receiver) = socket.split();
    info!("{} subscribed to events", user_id);

    loop {
        tokio::select! {
            result = rx.recv() => {
                let event = match result {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("{} lagged behind, skipped {} events", user_id, skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                if event.private_to().is_some_and(|owner| owner != user_id) {
                    continue;
                }

                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to encode {:?}: {}", event, e);
                        continue;
                    }
                };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    // Clients only listen; anything but a close is ignored
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    debug!("{} unsubscribed from events", user_id);
}
