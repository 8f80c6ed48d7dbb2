//! Periodic background work
//!
//! Collection and evaluation run as two independent actors, each a tokio task
//! with its own interval timer and command channel.
//!
//! ```text
//!   ┌──────────────┐  append   ┌─────────────┐  latest   ┌──────────────┐
//!   │  Collector   │──────────▶│ MetricStore │◀──────────│  Evaluator   │
//!   └──────┬───────┘           └─────────────┘           └──────┬───────┘
//!          │ SampleEvent                                        │ transitions
//!          ▼                                                    ▼
//!   broadcast channel                                  AlertStateMachine
//! ```
//!
//! The first tick of each actor fires one interval after it was spawned.
//! A tick runs to completion before the actor looks at its timer again, so
//! ticks never overlap; deadlines missed while a tick was running are skipped.
//! A tick that fails or panics is logged and the actor keeps running.

pub mod collector;
pub mod evaluator;
pub mod messages;
pub mod scheduler;

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

use crate::config::MAX_INTERVAL_SECS;

pub use collector::CollectorHandle;
pub use evaluator::EvaluatorHandle;
pub use messages::{CollectorCommand, EvaluatorCommand, SampleEvent};
pub use scheduler::Scheduler;

/// Interval timer first firing one period from now; deadlines missed by a
/// slow tick are skipped. Periods are capped at [`MAX_INTERVAL_SECS`].
pub(crate) fn ticker(period: Duration) -> Interval {
    let period = period.min(Duration::from_secs(MAX_INTERVAL_SECS));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Run one tick, turning a panic into an error
pub(crate) async fn run_guarded<T, F>(tick: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match AssertUnwindSafe(tick).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => anyhow::bail!("tick panicked: {}", panic_message(panic.as_ref())),
    }
}
