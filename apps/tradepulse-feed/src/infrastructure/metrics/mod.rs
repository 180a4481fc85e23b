//! Prometheus Metrics Module
//!
//! Exposes feed metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Ticks**: Published and lost ticks, tick duration, overruns
//! - **Fan-out**: Deliveries, skipped deliveries, dropped connections
//! - **Subscriptions**: Requests by operation and outcome
//! - **Client**: Reconnects and unparseable entries seen by feed clients
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!("tradepulse_ticks_total", "Scheduler ticks by outcome");
    describe_counter!(
        "tradepulse_tick_overruns_total",
        "Ticks whose work took longer than the tick interval"
    );
    describe_histogram!(
        "tradepulse_tick_duration_seconds",
        "Time to generate and fan out one snapshot"
    );

    describe_counter!(
        "tradepulse_snapshots_delivered_total",
        "Snapshots handed to connection queues"
    );
    describe_counter!(
        "tradepulse_snapshots_skipped_total",
        "Snapshots skipped because a connection queue was full"
    );
    describe_counter!(
        "tradepulse_connections_dropped_total",
        "Connections removed after a failed delivery"
    );
    describe_gauge!(
        "tradepulse_active_connections",
        "Connections currently registered with the broadcast hub"
    );

    describe_counter!(
        "tradepulse_subscription_requests_total",
        "Subscription requests by operation and outcome"
    );

    describe_counter!(
        "tradepulse_client_reconnects_total",
        "Feed client reconnection attempts"
    );
    describe_counter!(
        "tradepulse_client_entries_skipped_total",
        "Snapshot entries a feed client could not parse"
    );
}

// =============================================================================
// Metric Labels
// =============================================================================

/// Metric labels for tick outcomes.
#[derive(Debug, Clone, Copy)]
pub enum TickOutcome {
    /// Snapshot generated and fanned out.
    Published,
    /// Generation failed; nothing was published.
    Lost,
}

impl TickOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Lost => "lost",
        }
    }
}

/// Metric labels for subscription operations.
#[derive(Debug, Clone, Copy)]
pub enum SubscriptionOperation {
    /// Add a symbol.
    Subscribe,
    /// Remove a symbol.
    Unsubscribe,
    /// Read the stored set.
    List,
}

impl SubscriptionOperation {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
            Self::List => "list",
        }
    }
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record the outcome of one tick.
pub fn record_tick(outcome: TickOutcome) {
    counter!("tradepulse_ticks_total", "outcome" => outcome.as_str()).increment(1);
}

/// Record a tick that ran past its interval.
pub fn record_tick_overrun() {
    counter!("tradepulse_tick_overruns_total").increment(1);
}

/// Record how long one tick took.
pub fn record_tick_duration(duration: Duration) {
    histogram!("tradepulse_tick_duration_seconds").record(duration.as_secs_f64());
}

/// Record the result of one fan-out.
pub fn record_fanout(delivered: u64, skipped: u64, dropped: u64) {
    counter!("tradepulse_snapshots_delivered_total").increment(delivered);
    if skipped > 0 {
        counter!("tradepulse_snapshots_skipped_total").increment(skipped);
    }
    if dropped > 0 {
        counter!("tradepulse_connections_dropped_total").increment(dropped);
    }
}

/// Update the registered connection count.
#[allow(clippy::cast_precision_loss)]
pub fn set_active_connections(count: usize) {
    gauge!("tradepulse_active_connections").set(count as f64);
}

/// Record one subscription request.
pub fn record_subscription_request(operation: SubscriptionOperation, outcome: &'static str) {
    counter!(
        "tradepulse_subscription_requests_total",
        "operation" => operation.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a feed client reconnection attempt.
pub fn record_client_reconnect() {
    counter!("tradepulse_client_reconnects_total").increment(1);
}

/// Record snapshot entries a feed client skipped.
pub fn record_client_entries_skipped(count: usize) {
    counter!("tradepulse_client_entries_skipped_total").increment(count as u64);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_outcome_as_str() {
        assert_eq!(TickOutcome::Published.as_str(), "published");
        assert_eq!(TickOutcome::Lost.as_str(), "lost");
    }

    #[test]
    fn subscription_operation_as_str() {
        assert_eq!(SubscriptionOperation::Subscribe.as_str(), "subscribe");
        assert_eq!(SubscriptionOperation::Unsubscribe.as_str(), "unsubscribe");
        assert_eq!(SubscriptionOperation::List.as_str(), "list");
    }

    #[test]
    fn recording_without_recorder_is_noop() {
        record_tick(TickOutcome::Published);
        record_fanout(3, 1, 0);
        set_active_connections(2);
        record_subscription_request(SubscriptionOperation::List, "ok");
    }
}
