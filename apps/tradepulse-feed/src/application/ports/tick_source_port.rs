//! Tick Source Port (Driver Port)
//!
//! Abstracts the clock that drives the scheduler so tests can fire ticks
//! by hand instead of waiting on wall-clock time.

use std::time::{Duration, Instant};

use async_trait::async_trait;

/// One scheduler tick.
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    /// Tick number, starting at 1.
    pub number: u64,
    /// When the tick fired.
    pub fired_at: Instant,
}

/// Port for tick sources.
#[async_trait]
pub trait TickSourcePort: Send {
    /// Wait for the next tick. `None` means the source is exhausted.
    async fn next_tick(&mut self) -> Option<Tick>;

    /// Nominal spacing between ticks, if the source has one.
    fn period(&self) -> Option<Duration>;
}
