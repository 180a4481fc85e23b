//! Connection Port (Driven Port)
//!
//! A recipient registered with the broadcast hub.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::snapshot::PriceSnapshot;

/// Snapshot shared by every recipient of one tick.
pub type SharedSnapshot = Arc<PriceSnapshot>;

/// Unique identifier for a registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Why a snapshot did not reach a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The connection is gone; it must be removed from the registry.
    #[error("connection closed")]
    Closed,

    /// The connection's outbound queue is full; this tick is lost for it.
    #[error("connection queue full")]
    Full,
}

/// Port for delivering snapshots to one connection.
///
/// Delivery is synchronous and must not block: it either hands the snapshot
/// off immediately or fails.
pub trait ConnectionPort: Send + Sync {
    /// Identifier used for registry membership.
    fn id(&self) -> ConnectionId;

    /// Hand one snapshot to the connection.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] if the snapshot could not be handed off.
    fn deliver(&self, snapshot: &SharedSnapshot) -> Result<(), DeliveryError>;
}
