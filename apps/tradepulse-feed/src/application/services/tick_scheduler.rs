//! Tick Scheduler
//!
//! Drives the price source from a tick source and publishes every snapshot
//! through the broadcast hub. One tick runs at a time; a tick whose
//! generation fails is lost and the loop carries on.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

use crate::application::ports::{PriceSourcePort, TickSourcePort};
use crate::domain::pricing::GenerationError;
use crate::infrastructure::broadcast::{PublishReport, SharedBroadcastHub};
use crate::infrastructure::metrics;

// =============================================================================
// Scheduler Statistics
// =============================================================================

/// Counters shared with the health server.
#[derive(Debug, Default)]
pub struct SchedulerStats {
    ticks_published: AtomicU64,
    ticks_lost: AtomicU64,
    overruns: AtomicU64,
    last_sequence: AtomicU64,
}

impl SchedulerStats {
    /// Ticks whose snapshot was fanned out.
    #[must_use]
    pub fn ticks_published(&self) -> u64 {
        self.ticks_published.load(Ordering::Relaxed)
    }

    /// Ticks lost to generation failures.
    #[must_use]
    pub fn ticks_lost(&self) -> u64 {
        self.ticks_lost.load(Ordering::Relaxed)
    }

    /// Ticks that took longer than the tick interval.
    #[must_use]
    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }

    /// Sequence of the last published snapshot (0 before the first).
    #[must_use]
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence.load(Ordering::Relaxed)
    }
}

/// Shared scheduler statistics.
pub type SharedSchedulerStats = Arc<SchedulerStats>;

// =============================================================================
// Tick Report
// =============================================================================

/// What happened on one tick.
#[derive(Debug)]
pub enum TickReport {
    /// Snapshot generated and fanned out.
    Published(PublishReport),
    /// Generation failed; nothing was sent.
    Lost(GenerationError),
}

// =============================================================================
// Scheduler
// =============================================================================

/// Process-owned generate-and-publish loop.
#[derive(Debug)]
pub struct TickScheduler<P> {
    source: P,
    hub: SharedBroadcastHub,
    stats: SharedSchedulerStats,
}

impl<P: PriceSourcePort> TickScheduler<P> {
    /// Create a scheduler publishing `source`'s snapshots into `hub`.
    #[must_use]
    pub fn new(source: P, hub: SharedBroadcastHub) -> Self {
        Self {
            source,
            hub,
            stats: Arc::new(SchedulerStats::default()),
        }
    }

    /// Statistics handle, valid after the scheduler is moved into a task.
    #[must_use]
    pub fn stats(&self) -> SharedSchedulerStats {
        Arc::clone(&self.stats)
    }

    /// Generate one snapshot and publish it.
    pub fn run_once(&mut self) -> TickReport {
        match self.source.next_snapshot() {
            Ok(snapshot) => {
                let report = self.hub.publish(snapshot);
                self.stats.ticks_published.fetch_add(1, Ordering::Relaxed);
                self.stats
                    .last_sequence
                    .store(report.sequence, Ordering::Relaxed);
                metrics::record_tick(metrics::TickOutcome::Published);
                tracing::debug!(
                    sequence = report.sequence,
                    delivered = report.delivered.len(),
                    skipped = report.skipped.len(),
                    dropped = report.dropped.len(),
                    "Snapshot published"
                );
                TickReport::Published(report)
            }
            Err(err) => {
                self.stats.ticks_lost.fetch_add(1, Ordering::Relaxed);
                metrics::record_tick(metrics::TickOutcome::Lost);
                tracing::error!(error = %err, "Price generation failed, tick lost");
                TickReport::Lost(err)
            }
        }
    }

    /// Run until the tick source ends or `cancel` fires.
    pub async fn run<T: TickSourcePort>(mut self, mut ticks: T, cancel: CancellationToken) {
        let period = ticks.period();
        tracing::info!(
            period_ms = period.map(|p| u64::try_from(p.as_millis()).unwrap_or(u64::MAX)),
            "Tick scheduler started"
        );

        loop {
            let tick = tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Tick scheduler cancelled");
                    break;
                }
                tick = ticks.next_tick() => tick,
            };

            let Some(tick) = tick else {
                tracing::info!("Tick source ended");
                break;
            };

            let _ = self.run_once();

            let elapsed = tick.fired_at.elapsed();
            metrics::record_tick_duration(elapsed);

            if let Some(period) = period
                && elapsed >= period
            {
                self.stats.overruns.fetch_add(1, Ordering::Relaxed);
                metrics::record_tick_overrun();
                tracing::error!(
                    tick = tick.number,
                    elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
                    "Tick overran its interval, next snapshot may queue behind this one"
                );
            }
        }

        tracing::info!(
            published = self.stats.ticks_published(),
            lost = self.stats.ticks_lost(),
            "Tick scheduler stopped"
        );
    }
}

// =============================================================================
// Tests
// =============================================================================
