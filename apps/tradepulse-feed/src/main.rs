//! TradePulse Feed Binary
//!
//! Starts the tick scheduler, the WebSocket feed with its subscription API,
//! and the health server.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin tradepulse-feed
//! ```
//!
//! # Environment Variables
//!
//! - `TRADEPULSE_API_PORT`: Feed and API port (default: 5000)
//! - `TRADEPULSE_HEALTH_PORT`: Health check HTTP port (default: 8082)
//! - `TRADEPULSE_TICK_INTERVAL_MS`: Tick interval (default: 1000)
//! - `TRADEPULSE_CONNECTION_QUEUE`: Per-connection queue depth (default: 16)
//! - `TRADEPULSE_SEED_USERS`: Comma-separated e-mails registered at startup
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: tradepulse-feed)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tradepulse_feed::infrastructure::clock::IntervalTicks;
use tradepulse_feed::infrastructure::directory::InMemoryUserDirectory;
use tradepulse_feed::infrastructure::telemetry;
use tradepulse_feed::{
    BroadcastConfig, BroadcastHub, FeedConfig, FeedServer, FeedServerState, HealthServer,
    HealthServerState, PriceGenerator, SubscriptionService, TickScheduler, Universe, init_metrics,
    load_dotenv,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_dotenv();

    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting TradePulse feed");

    let _metrics_handle = init_metrics();

    let config = FeedConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let universe = Arc::new(Universe::standard());
    let broadcast_hub = Arc::new(BroadcastHub::new(BroadcastConfig::from(
        config.broadcast.clone(),
    )));

    let directory = Arc::new(InMemoryUserDirectory::with_users(
        config.seed_users.iter().map(String::as_str),
    ));
    tracing::info!(users = directory.user_count(), "User directory seeded");
    let subscriptions = Arc::new(SubscriptionService::new(Arc::clone(&universe), directory));

    // Scheduler
    let scheduler = TickScheduler::new(
        PriceGenerator::new(Arc::clone(&universe)),
        Arc::clone(&broadcast_hub),
    );
    let scheduler_stats = scheduler.stats();
    let ticks = IntervalTicks::new(config.scheduler.tick_interval);
    let scheduler_cancel = shutdown_token.clone();
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(ticks, scheduler_cancel).await;
    });

    // Health server
    let health_state = Arc::new(HealthServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        scheduler_stats,
        Arc::clone(&broadcast_hub),
    ));
    let health_server = HealthServer::new(
        config.server.health_port,
        health_state,
        shutdown_token.clone(),
    );
    let health_failure = shutdown_token.clone();
    tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "Health server error");
            health_failure.cancel();
        }
    });

    // Feed server
    let feed_state = Arc::new(FeedServerState::new(
        Arc::clone(&broadcast_hub),
        subscriptions,
        shutdown_token.clone(),
    ));
    let feed_server = FeedServer::new(config.server.api_port, feed_state, shutdown_token.clone());
    let feed_failure = shutdown_token.clone();
    let feed_handle = tokio::spawn(async move {
        if let Err(e) = feed_server.run().await {
            tracing::error!(error = %e, "Feed server error");
            feed_failure.cancel();
        }
    });

    tracing::info!("TradePulse feed ready");

    await_shutdown(shutdown_token).await;

    let _ = scheduler_handle.await;
    let _ = feed_handle.await;

    let stats = broadcast_hub.stats();
    tracing::info!(
        snapshots_published = stats.snapshots_published,
        total_connections = stats.total_joined,
        "TradePulse feed stopped"
    );
    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &FeedConfig) {
    tracing::info!(
        api_port = config.server.api_port,
        health_port = config.server.health_port,
        tick_interval_ms = u64::try_from(config.scheduler.tick_interval.as_millis()).unwrap_or(u64::MAX),
        connection_queue = config.broadcast.connection_queue_capacity,
        seed_users = config.seed_users.len(),
        "Configuration loaded"
    );
}

/// Wait for SIGTERM, SIGINT, or a server cancelling the token.
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
        () = shutdown_token.cancelled() => {
            tracing::warn!("Server failed, initiating shutdown");
        }
    }

    shutdown_token.cancel();
    tracing::info!("Graceful shutdown started");
}
