//! Feed Server
//!
//! HTTP surface of the feed.
//!
//! # Endpoints
//!
//! - `GET /ws` - WebSocket real-time channel, one JSON snapshot per tick
//! - `POST /api/subscribe` - Add a ticker to a user's watchlist
//! - `POST /api/unsubscribe` - Remove a ticker from a user's watchlist
//! - `GET /api/subscriptions?email=` - Read a user's watchlist
//! - `GET /api/instruments` - List the instrument universe

mod api;
mod websocket;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::services::SubscriptionService;
use crate::infrastructure::broadcast::SharedBroadcastHub;
use crate::infrastructure::codec::JsonSnapshotCodec;

pub use api::{
    ErrorResponse, INVALID_TICKER_MESSAGE, SubscriptionRequest, SubscriptionResponse,
};

// =============================================================================
// Server State
// =============================================================================

/// Shared state for the feed server.
pub struct FeedServerState {
    hub: SharedBroadcastHub,
    subscriptions: Arc<SubscriptionService>,
    codec: JsonSnapshotCodec,
    shutdown: CancellationToken,
}

impl FeedServerState {
    /// Create new feed server state.
    ///
    /// Open WebSocket streams close when `shutdown` fires.
    #[must_use]
    pub const fn new(
        hub: SharedBroadcastHub,
        subscriptions: Arc<SubscriptionService>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            hub,
            subscriptions,
            codec: JsonSnapshotCodec::new(),
            shutdown,
        }
    }
}

// =============================================================================
// Feed Server
// =============================================================================

/// WebSocket and subscription API server.
pub struct FeedServer {
    port: u16,
    state: Arc<FeedServerState>,
    cancel: CancellationToken,
}

impl FeedServer {
    /// Create a new feed server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<FeedServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Build the feed router.
    pub fn router(state: Arc<FeedServerState>) -> Router {
        Router::new()
            .route("/ws", get(websocket::ws_handler))
            .route("/api/subscribe", post(api::subscribe_handler))
            .route("/api/unsubscribe", post(api::unsubscribe_handler))
            .route("/api/subscriptions", get(api::subscriptions_handler))
            .route("/api/instruments", get(api::instruments_handler))
            .with_state(state)
    }

    /// Run the feed server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `FeedServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), FeedServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| FeedServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Feed server listening");
        self.serve(listener).await
    }

    /// Serve on an already-bound listener until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `FeedServerError::ServerFailed` on a fatal server error.
    pub async fn serve(self, listener: TcpListener) -> Result<(), FeedServerError> {
        let app = Self::router(self.state);

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| FeedServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Feed server stopped");
        Ok(())
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Feed server errors.
#[derive(Debug, thiserror::Error)]
pub enum FeedServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}
