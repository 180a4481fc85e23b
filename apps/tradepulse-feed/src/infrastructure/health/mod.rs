//! Health Check and Metrics Endpoint
//!
//! HTTP endpoint for health checks, feed status reporting, and Prometheus metrics.
//! Used by container orchestrators, load balancers, and monitoring systems.
//!
//! # Endpoints
//!
//! - `GET /health` - Returns JSON health status
//! - `GET /healthz` - Kubernetes liveness check (simple OK)
//! - `GET /readyz` - Kubernetes readiness check (ready once a tick was published)
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::services::SharedSchedulerStats;
use crate::infrastructure::broadcast::SharedBroadcastHub;
use crate::infrastructure::metrics::get_metrics_handle;

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy", "degraded", or "unhealthy".
    pub status: HealthStatus,
    /// Feed version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Tick scheduler counters.
    pub scheduler: SchedulerInfo,
    /// Connection registry counters.
    pub connections: ConnectionInfo,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Ticks are flowing.
    Healthy,
    /// Warming up, or ticks have been lost or overrun.
    Degraded,
    /// Every tick so far has failed.
    Unhealthy,
}

/// Tick scheduler status.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerInfo {
    /// Ticks fanned out.
    pub ticks_published: u64,
    /// Ticks lost to generation failures.
    pub ticks_lost: u64,
    /// Ticks that ran past their interval.
    pub overruns: u64,
    /// Sequence of the last published snapshot.
    pub last_sequence: u64,
}

/// Connection registry status.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    /// Currently registered connections.
    pub active: usize,
    /// Connections ever registered.
    pub total_joined: u64,
    /// Connections dropped after a failed delivery.
    pub total_dropped: u64,
}

// =============================================================================
// Health Server State
// =============================================================================

/// Shared state for the health server.
pub struct HealthServerState {
    version: String,
    started_at: Instant,
    scheduler: SharedSchedulerStats,
    broadcast_hub: SharedBroadcastHub,
}

impl HealthServerState {
    /// Create new health server state.
    #[must_use]
    pub fn new(
        version: String,
        scheduler: SharedSchedulerStats,
        broadcast_hub: SharedBroadcastHub,
    ) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            scheduler,
            broadcast_hub,
        }
    }
}

// =============================================================================
// Health Server
// =============================================================================

/// Health check HTTP server.
pub struct HealthServer {
    port: u16,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Create a new health server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<HealthServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Build the health router.
    pub fn router(state: Arc<HealthServerState>) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/healthz", get(liveness_handler))
            .route("/readyz", get(readiness_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state)
    }

    /// Run the health server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HealthServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Health server listening");
        self.serve(listener).await
    }

    /// Serve on an already-bound listener until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError::ServerFailed` on a fatal server error.
    pub async fn serve(self, listener: TcpListener) -> Result<(), HealthServerError> {
        axum::serve(listener, Self::router(self.state))
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HealthServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Health server stopped");
        Ok(())
    }
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let response = build_health_response(&state);
    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    if state.scheduler.ticks_published() > 0 {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                handle.render(),
            )
        },
    )
}

fn build_health_response(state: &HealthServerState) -> HealthResponse {
    let scheduler = SchedulerInfo {
        ticks_published: state.scheduler.ticks_published(),
        ticks_lost: state.scheduler.ticks_lost(),
        overruns: state.scheduler.overruns(),
        last_sequence: state.scheduler.last_sequence(),
    };
    let stats = state.broadcast_hub.stats();

    HealthResponse {
        status: determine_health_status(&scheduler),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        scheduler,
        connections: ConnectionInfo {
            active: stats.active_connections,
            total_joined: stats.total_joined,
            total_dropped: stats.total_dropped,
        },
    }
}

const fn determine_health_status(scheduler: &SchedulerInfo) -> HealthStatus {
    match (scheduler.ticks_published, scheduler.ticks_lost) {
        (0, lost) if lost > 0 => HealthStatus::Unhealthy,
        (0, _) => HealthStatus::Degraded,
        _ if scheduler.ticks_lost > 0 || scheduler.overruns > 0 => HealthStatus::Degraded,
        _ => HealthStatus::Healthy,
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Health server errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::application::services::TickScheduler;
    use crate::domain::instrument::Universe;
    use crate::domain::pricing::PriceGenerator;
    use crate::infrastructure::broadcast::BroadcastHub;

    fn info(published: u64, lost: u64, overruns: u64) -> SchedulerInfo {
        SchedulerInfo {
            ticks_published: published,
            ticks_lost: lost,
            overruns,
            last_sequence: published,
        }
    }

    #[test]
    fn health_status_serialization() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Healthy).unwrap(),
            "\"healthy\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Degraded).unwrap(),
            "\"degraded\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Unhealthy).unwrap(),
            "\"unhealthy\""
        );
    }

    #[test]
    fn determine_status_flowing() {
        assert_eq!(determine_health_status(&info(10, 0, 0)), HealthStatus::Healthy);
    }

    #[test]
    fn determine_status_warming_up() {
        assert_eq!(determine_health_status(&info(0, 0, 0)), HealthStatus::Degraded);
    }

    #[test]
    fn determine_status_lossy() {
        assert_eq!(determine_health_status(&info(10, 1, 0)), HealthStatus::Degraded);
        assert_eq!(determine_health_status(&info(10, 0, 2)), HealthStatus::Degraded);
    }

    #[test]
    fn determine_status_all_lost() {
        assert_eq!(determine_health_status(&info(0, 3, 0)), HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn readyz_after_first_tick() {
        let hub = Arc::new(BroadcastHub::with_defaults());
        let mut scheduler = TickScheduler::new(
            PriceGenerator::seeded(Arc::new(Universe::standard()), 3),
            Arc::clone(&hub),
        );
        let state = Arc::new(HealthServerState::new(
            "test".to_string(),
            scheduler.stats(),
            hub,
        ));
        let app = HealthServer::router(state);

        let before = app
            .clone()
            .oneshot(Request::get("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(before.status(), StatusCode::SERVICE_UNAVAILABLE);

        let _ = scheduler.run_once();

        let after = app
            .oneshot(Request::get("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(after.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_reports_scheduler_and_connections() {
        let hub = Arc::new(BroadcastHub::with_defaults());
        let mut scheduler = TickScheduler::new(
            PriceGenerator::seeded(Arc::new(Universe::standard()), 5),
            Arc::clone(&hub),
        );
        let _subscription = hub.subscribe();
        let _ = scheduler.run_once();
        let _ = scheduler.run_once();
        let state = Arc::new(HealthServerState::new(
            "1.2.3".to_string(),
            scheduler.stats(),
            Arc::clone(&hub),
        ));

        let response = HealthServer::router(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], "1.2.3");
        assert_eq!(body["scheduler"]["ticks_published"], 2);
        assert_eq!(body["scheduler"]["last_sequence"], 2);
        assert_eq!(body["connections"]["active"], 1);
        assert_eq!(body["connections"]["total_joined"], 1);
    }
}
