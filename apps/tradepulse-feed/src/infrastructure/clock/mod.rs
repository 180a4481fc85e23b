//! Tick Sources
//!
//! - [`IntervalTicks`]: fixed wall-clock cadence for production
//! - [`ManualTicks`]: fired by hand, used by tests and demos

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{Interval, interval};

use crate::application::ports::{Tick, TickSourcePort};

// =============================================================================
// Interval Ticks
// =============================================================================

/// Ticks on a fixed interval. The first tick fires immediately.
#[derive(Debug)]
pub struct IntervalTicks {
    period: Duration,
    interval: Interval,
    count: u64,
}

impl IntervalTicks {
    /// Create a tick source with the given spacing.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero. Configuration rejects that value first.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: interval(period),
            count: 0,
        }
    }
}

#[async_trait]
impl TickSourcePort for IntervalTicks {
    async fn next_tick(&mut self) -> Option<Tick> {
        self.interval.tick().await;
        self.count += 1;
        Some(Tick {
            number: self.count,
            fired_at: Instant::now(),
        })
    }

    fn period(&self) -> Option<Duration> {
        Some(self.period)
    }
}

// =============================================================================
// Manual Ticks
// =============================================================================

/// Tick source driven through a [`ManualTickHandle`].
///
/// Ends once every handle is dropped and queued ticks are drained.
#[derive(Debug)]
pub struct ManualTicks {
    rx: mpsc::UnboundedReceiver<()>,
    count: u64,
}

/// Fires ticks into a [`ManualTicks`] source.
#[derive(Debug, Clone)]
pub struct ManualTickHandle {
    tx: mpsc::UnboundedSender<()>,
}

impl ManualTicks {
    /// Create a source and its handle.
    #[must_use]
    pub fn new() -> (Self, ManualTickHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx, count: 0 }, ManualTickHandle { tx })
    }
}

impl ManualTickHandle {
    /// Queue one tick. Returns `false` if the source is gone.
    pub fn fire(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

#[async_trait]
impl TickSourcePort for ManualTicks {
    async fn next_tick(&mut self) -> Option<Tick> {
        self.rx.recv().await?;
        self.count += 1;
        Some(Tick {
            number: self.count,
            fired_at: Instant::now(),
        })
    }

    fn period(&self) -> Option<Duration> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_ticks_count_up_and_end() {
        let (mut ticks, handle) = ManualTicks::new();
        assert!(handle.fire());
        assert!(handle.fire());
        drop(handle);

        assert_eq!(ticks.next_tick().await.unwrap().number, 1);
        assert_eq!(ticks.next_tick().await.unwrap().number, 2);
        assert!(ticks.next_tick().await.is_none());
        assert!(ticks.period().is_none());
    }

    #[tokio::test]
    async fn fire_after_source_dropped_fails() {
        let (ticks, handle) = ManualTicks::new();
        drop(ticks);
        assert!(!handle.fire());
    }

    #[tokio::test(start_paused = true)]
    async fn interval_ticks_first_tick_is_immediate() {
        let mut ticks = IntervalTicks::new(Duration::from_millis(1000));
        assert_eq!(ticks.period(), Some(Duration::from_millis(1000)));

        let first = ticks.next_tick().await.unwrap();
        let second = ticks.next_tick().await.unwrap();
        assert_eq!(first.number, 1);
        assert_eq!(second.number, 2);
    }
}
