//! Real-time channel.
//!
//! Each socket owns one hub connection. A single writer loop drains the
//! connection's queue in order, so snapshots reach the socket in tick order.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};

use super::FeedServerState;

pub(super) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<FeedServerState>>,
) -> Response {
    ws.on_upgrade(move |socket| stream_snapshots(socket, state))
}

async fn stream_snapshots(socket: WebSocket, state: Arc<FeedServerState>) {
    let mut subscription = state.hub.subscribe();
    let connection_id = subscription.id();
    tracing::info!(%connection_id, "Feed connection opened");

    let (mut sink, mut stream) = socket.split();
    let mut frames_sent: u64 = 0;

    loop {
        tokio::select! {
            () = state.shutdown.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            snapshot = subscription.recv() => {
                let Some(snapshot) = snapshot else {
                    break;
                };
                let frame = match state.codec.encode(&snapshot) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::error!(%connection_id, error = %e, "Failed to encode snapshot");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(frame.into())).await {
                    tracing::debug!(%connection_id, error = %e, "Socket send failed");
                    break;
                }
                frames_sent += 1;
            }
            incoming = stream.next() => match incoming {
                None | Some(Ok(Message::Close(_))) => break,
                Some(Err(e)) => {
                    tracing::debug!(%connection_id, error = %e, "Socket receive failed");
                    break;
                }
                Some(Ok(_)) => {}
            }
        }
    }

    drop(subscription);
    tracing::info!(%connection_id, frames_sent, "Feed connection closed");
}
