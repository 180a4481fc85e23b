//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `ConnectionPort`: One registered snapshot recipient
//! - `UserDirectoryPort`: The external store of users and their subscriptions
//!
//! ## Driver Ports (Inbound)
//!
//! - `PriceSourcePort`: Produces a snapshot per tick
//! - `TickSourcePort`: Decides when a tick happens

mod connection_port;
mod price_source_port;
mod tick_source_port;
mod user_directory_port;

pub use connection_port::{ConnectionId, ConnectionPort, DeliveryError, SharedSnapshot};
pub use price_source_port::PriceSourcePort;
pub use tick_source_port::{Tick, TickSourcePort};
#[cfg(test)]
pub use user_directory_port::MockUserDirectoryPort;
pub use user_directory_port::{DirectoryError, UserDirectoryPort};
