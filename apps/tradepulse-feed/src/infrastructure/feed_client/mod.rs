//! Feed WebSocket Client
//!
//! Consumes the real-time channel and reduces it into display state.
//!
//! Every connection gets a fresh [`ClientSession`]; nothing survives a
//! reconnect, so deltas restart at zero and histories refill from empty.
//! Dropped connections are retried with exponential backoff.

mod reconnect;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

pub use reconnect::{ReconnectConfig, ReconnectPolicy};

use crate::ClientConfig;
use crate::domain::session::{ClientSession, ClientState, SessionError, SkippedEntry};
use crate::infrastructure::codec::{CodecError, JsonSnapshotCodec};
use crate::infrastructure::metrics;

// =============================================================================
// Error Type
// =============================================================================

/// Errors that can occur in the feed client.
#[derive(Debug, thiserror::Error)]
pub enum FeedClientError {
    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Session state machine rejected a transition.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Event receiver dropped.
    #[error("channel send error")]
    ChannelSend,

    /// Maximum reconnection attempts exceeded.
    #[error("maximum reconnection attempts exceeded")]
    MaxReconnectAttemptsExceeded,

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,
}

// =============================================================================
// Feed Client Events
// =============================================================================

/// Events emitted by the feed client.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// Connected with a cold session.
    Connected,
    /// A snapshot was reduced.
    Snapshot {
        /// State after the snapshot.
        state: ClientState,
        /// Entries left untouched because they did not parse.
        skipped: Vec<SkippedEntry>,
    },
    /// Connection lost; all state discarded.
    Disconnected,
    /// Waiting before the next connection attempt.
    Reconnecting {
        /// Reconnection attempt number.
        attempt: u32,
        /// Wait before the attempt.
        delay: Duration,
    },
}

// =============================================================================
// Feed Client Configuration
// =============================================================================

/// Configuration for the feed client.
#[derive(Debug, Clone)]
pub struct FeedClientConfig {
    /// WebSocket URL.
    pub url: String,
    /// Reconnection configuration.
    pub reconnect: ReconnectConfig,
}

impl FeedClientConfig {
    /// Create a new configuration with default reconnection.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl From<&ClientConfig> for FeedClientConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            url: config.feed_url.clone(),
            reconnect: ReconnectConfig::from(&config.reconnect),
        }
    }
}

// =============================================================================
// Feed Client
// =============================================================================

/// WebSocket client for the real-time channel.
pub struct FeedClient {
    config: FeedClientConfig,
    codec: JsonSnapshotCodec,
    event_tx: mpsc::Sender<FeedEvent>,
    cancel: CancellationToken,
}

impl FeedClient {
    /// Create a new feed client.
    #[must_use]
    pub const fn new(
        config: FeedClientConfig,
        event_tx: mpsc::Sender<FeedEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            codec: JsonSnapshotCodec::new(),
            event_tx,
            cancel,
        }
    }

    /// Run the connection loop until cancelled or attempts are exhausted.
    ///
    /// # Errors
    ///
    /// Returns `MaxReconnectAttemptsExceeded` when the policy gives up, or
    /// `ChannelSend` once the event receiver is gone.
    pub async fn run(self) -> Result<(), FeedClientError> {
        let mut reconnect_policy = ReconnectPolicy::new(self.config.reconnect.clone());

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Feed client cancelled");
                return Ok(());
            }

            match self.connect_and_run(&mut reconnect_policy).await {
                Ok(()) => {
                    tracing::info!("Feed connection closed by client");
                    return Ok(());
                }
                Err(FeedClientError::ChannelSend) => return Err(FeedClientError::ChannelSend),
                Err(e) => {
                    tracing::warn!(error = %e, "Feed connection error");
                    self.emit(FeedEvent::Disconnected).await?;

                    let Some(delay) = reconnect_policy.next_delay() else {
                        return Err(FeedClientError::MaxReconnectAttemptsExceeded);
                    };
                    let attempt = reconnect_policy.attempt_count();
                    metrics::record_client_reconnect();
                    tracing::info!(
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Reconnecting to feed"
                    );
                    self.emit(FeedEvent::Reconnecting { attempt, delay }).await?;

                    tokio::select! {
                        () = self.cancel.cancelled() => {
                            tracing::info!("Feed client cancelled during reconnect delay");
                            return Ok(());
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    async fn connect_and_run(
        &self,
        reconnect_policy: &mut ReconnectPolicy,
    ) -> Result<(), FeedClientError> {
        tracing::info!(url = %self.config.url, "Connecting to feed");
        let (ws_stream, _response) = tokio_tungstenite::connect_async(&self.config.url).await?;
        reconnect_policy.reset();

        let mut session = ClientSession::new();
        session.connect()?;
        self.emit(FeedEvent::Connected).await?;

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    session.disconnect();
                    return Ok(());
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_frame(&mut session, &text).await?;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("Server sent close frame");
                            session.disconnect();
                            return Err(FeedClientError::ConnectionClosed);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            session.disconnect();
                            return Err(e.into());
                        }
                        None => {
                            tracing::info!("WebSocket stream ended");
                            session.disconnect();
                            return Err(FeedClientError::ConnectionClosed);
                        }
                    }
                }
            }
        }
    }

    async fn handle_frame(
        &self,
        session: &mut ClientSession,
        text: &str,
    ) -> Result<(), FeedClientError> {
        let raw = match self.codec.decode(text) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping undecodable frame");
                return Ok(());
            }
        };

        let skipped = session.apply(&raw)?;
        if !skipped.is_empty() {
            metrics::record_client_entries_skipped(skipped.len());
            for entry in &skipped {
                tracing::warn!(symbol = %entry.symbol, raw = %entry.raw, "Skipping unparseable price");
            }
        }

        self.emit(FeedEvent::Snapshot {
            state: session.state().clone(),
            skipped,
        })
        .await
    }

    async fn emit(&self, event: FeedEvent) -> Result<(), FeedClientError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| FeedClientError::ChannelSend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReconnectSettings;

    #[test]
    fn config_from_client_config() {
        let client = ClientConfig {
            feed_url: "ws://feed:5000/ws".to_string(),
            api_url: "http://feed:5000/api".to_string(),
            reconnect: ReconnectSettings {
                max_attempts: 4,
                ..ReconnectSettings::default()
            },
        };

        let config = FeedClientConfig::from(&client);

        assert_eq!(config.url, "ws://feed:5000/ws");
        assert_eq!(config.reconnect.max_attempts, 4);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let (tx, mut rx) = mpsc::channel(16);
        let config = FeedClientConfig {
            url: "ws://127.0.0.1:1/ws".to_string(),
            reconnect: ReconnectConfig {
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
                multiplier: 2.0,
                jitter_factor: 0.0,
                max_attempts: 1,
            },
        };
        let client = FeedClient::new(config, tx, CancellationToken::new());

        let result = client.run().await;

        assert!(matches!(
            result,
            Err(FeedClientError::MaxReconnectAttemptsExceeded)
        ));
        assert!(matches!(rx.recv().await, Some(FeedEvent::Disconnected)));
        assert!(matches!(
            rx.recv().await,
            Some(FeedEvent::Reconnecting { attempt: 1, .. })
        ));
    }

    #[tokio::test]
    async fn cancelled_client_returns_immediately() {
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let client = FeedClient::new(FeedClientConfig::new("ws://127.0.0.1:1/ws"), tx, cancel);

        assert!(client.run().await.is_ok());
    }
}
