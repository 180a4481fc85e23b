//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `SubscriptionService`: Validates and forwards watchlist changes
//! - `TickScheduler`: Generates and publishes one snapshot per tick

mod subscription_service;
mod tick_scheduler;

pub use subscription_service::SubscriptionService;
pub use tick_scheduler::{SchedulerStats, SharedSchedulerStats, TickReport, TickScheduler};
