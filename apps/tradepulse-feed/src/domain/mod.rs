//! Domain Layer - Core feed types and business logic.
//!
//! This layer contains the instrument universe, snapshot types, the price
//! generator and the client-side reducer. Nothing here performs I/O.

/// Fixed instrument universe.
pub mod instrument;

/// Price snapshot types (server and wire representations).
pub mod snapshot;

/// Random price generation.
pub mod pricing;

/// Bounded per-symbol price history.
pub mod history;

/// Client session state machine and snapshot reducer.
pub mod session;

/// Subscription sets and user identifiers.
pub mod subscription;
