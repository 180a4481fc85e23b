//! Broadcast Hub
//!
//! Fans each price snapshot out to every registered connection.
//!
//! # Architecture
//!
//! The `BroadcastHub` keeps an ordered registry of [`ConnectionPort`]s.
//! `publish` walks the registry in join order and hands the same
//! [`SharedSnapshot`] to each connection without waiting:
//! - a full queue skips that connection for this tick only
//! - a closed connection is removed from the registry
//!
//! Connections that join mid-stream see snapshots from their join point on.
//! Nothing is replayed.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::BroadcastSettings;
use crate::application::ports::{ConnectionId, ConnectionPort, DeliveryError, SharedSnapshot};
use crate::domain::snapshot::PriceSnapshot;
use crate::infrastructure::metrics;

// =============================================================================
// Configuration
// =============================================================================

/// Broadcast hub configuration.
#[derive(Debug, Clone, Copy)]
pub struct BroadcastConfig {
    /// Outbound queue depth for connections created by [`BroadcastHub::subscribe`].
    pub connection_queue_capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            connection_queue_capacity: 16,
        }
    }
}

impl From<BroadcastSettings> for BroadcastConfig {
    fn from(settings: BroadcastSettings) -> Self {
        Self {
            connection_queue_capacity: settings.connection_queue_capacity.max(1),
        }
    }
}

// =============================================================================
// Publish Report
// =============================================================================

/// Outcome of one fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Tick sequence of the published snapshot.
    pub sequence: u64,
    /// Connections that accepted the snapshot.
    pub delivered: Vec<ConnectionId>,
    /// Connections whose queue was full; still registered.
    pub skipped: Vec<ConnectionId>,
    /// Connections found closed and removed.
    pub dropped: Vec<ConnectionId>,
}

impl PublishReport {
    /// Number of connections the hub attempted.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.skipped.len() + self.dropped.len()
    }
}

// =============================================================================
// Broadcast Hub
// =============================================================================

/// Registry of active connections plus the fan-out loop.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use tradepulse_feed::infrastructure::broadcast::{BroadcastConfig, BroadcastHub};
///
/// let hub = Arc::new(BroadcastHub::new(BroadcastConfig::default()));
/// let subscription = hub.subscribe();
/// assert_eq!(hub.connection_count(), 1);
///
/// drop(subscription);
/// assert_eq!(hub.connection_count(), 0);
/// ```
pub struct BroadcastHub {
    config: BroadcastConfig,
    connections: RwLock<Vec<Arc<dyn ConnectionPort>>>,
    total_joined: AtomicU64,
    total_dropped: AtomicU64,
    snapshots_published: AtomicU64,
}

impl std::fmt::Debug for BroadcastHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastHub")
            .field("config", &self.config)
            .field("connections", &self.connection_count())
            .finish_non_exhaustive()
    }
}

impl BroadcastHub {
    /// Create a new broadcast hub with the given configuration.
    #[must_use]
    pub fn new(config: BroadcastConfig) -> Self {
        Self {
            config,
            connections: RwLock::new(Vec::new()),
            total_joined: AtomicU64::new(0),
            total_dropped: AtomicU64::new(0),
            snapshots_published: AtomicU64::new(0),
        }
    }

    /// Create a new broadcast hub with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(BroadcastConfig::default())
    }

    // =========================================================================
    // Registry
    // =========================================================================

    /// Register a connection. Returns `false` if its id is already present.
    pub fn join(&self, connection: Arc<dyn ConnectionPort>) -> bool {
        let id = connection.id();
        let count = {
            let mut connections = self.connections.write();
            if connections.iter().any(|c| c.id() == id) {
                return false;
            }
            connections.push(connection);
            connections.len()
        };

        self.total_joined.fetch_add(1, Ordering::Relaxed);
        metrics::set_active_connections(count);
        tracing::debug!(connection_id = %id, active = count, "Connection joined");
        true
    }

    /// Remove a connection. Returns `false` if it was not registered.
    pub fn leave(&self, id: ConnectionId) -> bool {
        let (removed, count) = {
            let mut connections = self.connections.write();
            let before = connections.len();
            connections.retain(|c| c.id() != id);
            (connections.len() != before, connections.len())
        };

        if removed {
            metrics::set_active_connections(count);
            tracing::debug!(connection_id = %id, active = count, "Connection left");
        }
        removed
    }

    /// Create a queue-backed connection, register it, and hand back the
    /// receiving end. Dropping the returned subscription leaves the hub.
    #[must_use]
    pub fn subscribe(self: &Arc<Self>) -> SnapshotSubscription {
        let (tx, rx) = mpsc::channel(self.config.connection_queue_capacity);
        let connection = Arc::new(ChannelConnection::new(tx));
        let id = connection.id();
        self.join(connection);

        SnapshotSubscription {
            id,
            rx,
            hub: Arc::clone(self),
        }
    }

    /// Whether a connection is registered.
    #[must_use]
    pub fn is_registered(&self, id: ConnectionId) -> bool {
        self.connections.read().iter().any(|c| c.id() == id)
    }

    /// Number of registered connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    // =========================================================================
    // Fan-out
    // =========================================================================

    /// Deliver one snapshot to every registered connection in join order.
    ///
    /// A failure on one connection never stops delivery to the rest.
    pub fn publish(&self, snapshot: PriceSnapshot) -> PublishReport {
        let snapshot: SharedSnapshot = Arc::new(snapshot);
        let recipients = self.connections.read().clone();

        let mut report = PublishReport {
            sequence: snapshot.sequence(),
            ..PublishReport::default()
        };

        for connection in &recipients {
            let id = connection.id();
            match connection.deliver(&snapshot) {
                Ok(()) => report.delivered.push(id),
                Err(DeliveryError::Full) => {
                    tracing::warn!(connection_id = %id, sequence = report.sequence, "Connection queue full, skipping tick");
                    report.skipped.push(id);
                }
                Err(DeliveryError::Closed) => {
                    tracing::info!(connection_id = %id, "Connection closed, removing from registry");
                    report.dropped.push(id);
                }
            }
        }

        if !report.dropped.is_empty() {
            let count = {
                let mut connections = self.connections.write();
                connections.retain(|c| !report.dropped.contains(&c.id()));
                connections.len()
            };
            self.total_dropped
                .fetch_add(report.dropped.len() as u64, Ordering::Relaxed);
            metrics::set_active_connections(count);
        }

        self.snapshots_published.fetch_add(1, Ordering::Relaxed);
        metrics::record_fanout(
            report.delivered.len() as u64,
            report.skipped.len() as u64,
            report.dropped.len() as u64,
        );

        report
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Get registry statistics.
    #[must_use]
    pub fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            active_connections: self.connection_count(),
            total_joined: self.total_joined.load(Ordering::Relaxed),
            total_dropped: self.total_dropped.load(Ordering::Relaxed),
            snapshots_published: self.snapshots_published.load(Ordering::Relaxed),
        }
    }
}

/// Shared broadcast hub reference.
pub type SharedBroadcastHub = Arc<BroadcastHub>;

/// Statistics about the connection registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastStats {
    /// Currently registered connections.
    pub active_connections: usize,
    /// Connections ever registered.
    pub total_joined: u64,
    /// Connections removed because delivery found them closed.
    pub total_dropped: u64,
    /// Snapshots fanned out.
    pub snapshots_published: u64,
}

// =============================================================================
// Channel Connection
// =============================================================================

/// Connection backed by a bounded tokio mpsc queue.
#[derive(Debug)]
pub struct ChannelConnection {
    id: ConnectionId,
    tx: mpsc::Sender<SharedSnapshot>,
}

impl ChannelConnection {
    /// Wrap the sending half of a queue.
    #[must_use]
    pub fn new(tx: mpsc::Sender<SharedSnapshot>) -> Self {
        Self {
            id: ConnectionId::new(),
            tx,
        }
    }
}

impl ConnectionPort for ChannelConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn deliver(&self, snapshot: &SharedSnapshot) -> Result<(), DeliveryError> {
        self.tx
            .try_send(Arc::clone(snapshot))
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
                mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
            })
    }
}

/// Receiving end of a hub connection.
///
/// Leaves the hub when dropped.
#[derive(Debug)]
pub struct SnapshotSubscription {
    id: ConnectionId,
    rx: mpsc::Receiver<SharedSnapshot>,
    hub: SharedBroadcastHub,
}

impl SnapshotSubscription {
    /// The registered connection id.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Wait for the next snapshot. `None` once the connection is closed.
    pub async fn recv(&mut self) -> Option<SharedSnapshot> {
        self.rx.recv().await
    }

    /// Take a queued snapshot without waiting.
    pub fn try_recv(&mut self) -> Option<SharedSnapshot> {
        self.rx.try_recv().ok()
    }
}

impl Drop for SnapshotSubscription {
    fn drop(&mut self) {
        self.hub.leave(self.id);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;

    fn make_snapshot(sequence: u64) -> PriceSnapshot {
        let mut prices = BTreeMap::new();
        prices.insert("GOOG".to_string(), Decimal::new(43217, 2));
        prices.insert("TSLA".to_string(), Decimal::new(11802, 2));
        PriceSnapshot::new(sequence, Utc::now(), prices)
    }

    struct RecordingConnection {
        id: ConnectionId,
        received: Mutex<Vec<u64>>,
        fail_with: Option<DeliveryError>,
    }

    impl RecordingConnection {
        fn new(fail_with: Option<DeliveryError>) -> Arc<Self> {
            Arc::new(Self {
                id: ConnectionId::new(),
                received: Mutex::new(Vec::new()),
                fail_with,
            })
        }

        fn received(&self) -> Vec<u64> {
            self.received.lock().unwrap().clone()
        }
    }

    impl ConnectionPort for RecordingConnection {
        fn id(&self) -> ConnectionId {
            self.id
        }

        fn deliver(&self, snapshot: &SharedSnapshot) -> Result<(), DeliveryError> {
            if let Some(err) = self.fail_with {
                return Err(err);
            }
            self.received.lock().unwrap().push(snapshot.sequence());
            Ok(())
        }
    }

    #[test]
    fn broadcast_hub_creation() {
        let hub = BroadcastHub::with_defaults();
        assert_eq!(hub.connection_count(), 0);
        assert_eq!(hub.stats(), BroadcastStats::default());
    }

    #[test]
    fn join_is_idempotent_per_id() {
        let hub = BroadcastHub::with_defaults();
        let conn = RecordingConnection::new(None);

        assert!(hub.join(conn.clone()));
        assert!(!hub.join(conn.clone()));
        assert_eq!(hub.connection_count(), 1);
    }

    #[test]
    fn leave_unknown_returns_false() {
        let hub = BroadcastHub::with_defaults();
        assert!(!hub.leave(ConnectionId::new()));
    }

    #[test]
    fn publish_reaches_every_connection_in_order() {
        let hub = BroadcastHub::with_defaults();
        let a = RecordingConnection::new(None);
        let b = RecordingConnection::new(None);
        hub.join(a.clone());
        hub.join(b.clone());

        let report = hub.publish(make_snapshot(1));

        assert_eq!(report.sequence, 1);
        assert_eq!(report.delivered, vec![a.id, b.id]);
        assert_eq!(a.received(), vec![1]);
        assert_eq!(b.received(), vec![1]);
    }

    #[test]
    fn closed_connection_is_dropped_without_blocking_others() {
        let hub = BroadcastHub::with_defaults();
        let healthy_before = RecordingConnection::new(None);
        let closed = RecordingConnection::new(Some(DeliveryError::Closed));
        let healthy_after = RecordingConnection::new(None);
        hub.join(healthy_before.clone());
        hub.join(closed.clone());
        hub.join(healthy_after.clone());

        let report = hub.publish(make_snapshot(7));

        assert_eq!(report.dropped, vec![closed.id]);
        assert_eq!(healthy_before.received(), vec![7]);
        assert_eq!(healthy_after.received(), vec![7]);
        assert!(!hub.is_registered(closed.id));
        assert_eq!(hub.stats().total_dropped, 1);
    }

    #[test]
    fn full_connection_is_skipped_but_kept() {
        let hub = BroadcastHub::with_defaults();
        let slow = RecordingConnection::new(Some(DeliveryError::Full));
        hub.join(slow.clone());

        let report = hub.publish(make_snapshot(1));

        assert_eq!(report.skipped, vec![slow.id]);
        assert!(hub.is_registered(slow.id));
    }

    #[test]
    fn publish_with_no_connections_is_empty_report() {
        let hub = BroadcastHub::with_defaults();
        let report = hub.publish(make_snapshot(3));
        assert_eq!(report.attempted(), 0);
        assert_eq!(hub.stats().snapshots_published, 1);
    }

    #[tokio::test]
    async fn subscription_receives_shared_snapshot() {
        let hub = Arc::new(BroadcastHub::with_defaults());
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        let _ = hub.publish(make_snapshot(42));

        let a = first.recv().await.unwrap();
        let b = second.recv().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.sequence(), 42);
    }

    #[test]
    fn subscription_leaves_on_drop() {
        let hub = Arc::new(BroadcastHub::with_defaults());
        {
            let sub = hub.subscribe();
            assert!(hub.is_registered(sub.id()));
        }
        assert_eq!(hub.connection_count(), 0);
    }

    #[test]
    fn bounded_queue_skips_when_full() {
        let hub = Arc::new(BroadcastHub::new(BroadcastConfig {
            connection_queue_capacity: 1,
        }));
        let mut sub = hub.subscribe();

        let first = hub.publish(make_snapshot(1));
        let second = hub.publish(make_snapshot(2));

        assert_eq!(first.delivered, vec![sub.id()]);
        assert_eq!(second.skipped, vec![sub.id()]);
        assert_eq!(sub.try_recv().unwrap().sequence(), 1);
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn config_from_settings() {
        let config = BroadcastConfig::from(BroadcastSettings {
            connection_queue_capacity: 64,
        });
        assert_eq!(config.connection_queue_capacity, 64);
    }
}
