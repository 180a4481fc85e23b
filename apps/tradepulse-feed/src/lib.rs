#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements,
        clippy::redundant_clone
    )
)]

//! TradePulse Feed - Simulated Market Data Broadcaster
//!
//! Generates a price snapshot for a fixed instrument universe on every tick
//! and fans it out to every connected WebSocket client. Each client reduces
//! the stream into per-symbol price, delta and a bounded history.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core feed logic and data types
//!   - `instrument`: Fixed instrument universe
//!   - `pricing`: Random snapshot generator
//!   - `session`: Client state machine and reducer
//!   - `subscription`: Watchlist types
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Connections, tick sources, user directory
//!   - `services`: Tick scheduler, subscription facade
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `broadcast`: Connection registry and fan-out
//!   - `server`: WebSocket feed and subscription API
//!   - `feed_client`: Reconnecting WebSocket consumer
//!   - `directory`: In-memory and HTTP user directories
//!   - `config`: Environment configuration
//!   - `health`: Health check HTTP endpoint
//!
//! # Data Flow
//!
//! ```text
//!                ┌──────────────┐     ┌─────────────┐
//! Tick Source ──►│  Scheduler   │────►│  Broadcast  │──► /ws ──► Client 1 (reducer)
//!                │ (generator)  │     │     Hub     │──► /ws ──► Client 2 (reducer)
//!                └──────────────┘     └─────────────┘──► /ws ──► Client N (reducer)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core feed types with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::instrument::{Instrument, SharedUniverse, Symbol, Universe};
pub use domain::pricing::{GenerationError, PriceGenerator};
pub use domain::session::{
    ClientSession, ClientState, PriceState, SessionError, SessionPhase, SkippedEntry, reduce,
};
pub use domain::snapshot::{PriceSnapshot, RawSnapshot};
pub use domain::subscription::{SubscriptionError, SubscriptionSet, UserId};

// Application
pub use application::ports::{
    ConnectionId, ConnectionPort, DeliveryError, DirectoryError, PriceSourcePort, SharedSnapshot,
    TickSourcePort, UserDirectoryPort,
};
pub use application::services::{SubscriptionService, TickReport, TickScheduler};

// Infrastructure config
pub use infrastructure::config::{
    BroadcastSettings, ClientConfig, ConfigError, FeedConfig, ReconnectSettings,
    SchedulerSettings, ServerSettings, load_dotenv,
};

// Broadcast hub (for integration tests)
pub use infrastructure::broadcast::{
    BroadcastConfig, BroadcastHub, BroadcastStats, PublishReport, SharedBroadcastHub,
    SnapshotSubscription,
};

// Servers
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};
pub use infrastructure::server::{FeedServer, FeedServerError, FeedServerState};

// Client
pub use infrastructure::feed_client::{FeedClient, FeedClientConfig, FeedClientError, FeedEvent};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
