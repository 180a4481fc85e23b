//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Connection registry and snapshot fan-out.
pub mod broadcast;

/// Tick sources driving the scheduler.
pub mod clock;

/// JSON wire codec for snapshots.
pub mod codec;

/// Configuration loading.
pub mod config;

/// User directory adapters.
pub mod directory;

/// WebSocket client for the real-time channel.
pub mod feed_client;

/// Health check HTTP endpoint.
pub mod health;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Feed HTTP and WebSocket server.
pub mod server;

/// OpenTelemetry tracing integration.
pub mod telemetry;
