//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the application services and port interfaces
//! that define how the domain interacts with external systems.

/// Port interfaces for connections, tick sources and the user directory.
pub mod ports;

/// Application services for subscriptions and tick scheduling.
pub mod services;
