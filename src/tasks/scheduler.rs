//! Refresh Scheduler Task
//!
//! Background task that keeps resources warm. A frequent loop requests a
//! background refresh of every `Frequent` resource; an infrequent loop, a
//! whole multiple of the frequent period, does the same for `Infrequent`
//! resources. Both go through `refresh_async`, so the staleness policy still
//! decides whether anything is fetched.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cache::RefreshCache;
use crate::resource::Cadence;

/// Outcome of one scheduler tick over a group of resources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Background refreshes started
    pub started: usize,
    /// Resources fresh or already refreshing
    pub skipped: usize,
    /// Resources the cache refused to refresh
    pub failed: usize,
}

/// Requests a background refresh of every resource with `cadence`.
///
/// Each refresh runs on its own task, so a slow or failing resource never
/// delays its siblings or the caller.
pub fn run_group(cache: &RefreshCache, cadence: Cadence) -> TickReport {
    let mut report = TickReport::default();

    for id in cache.ids_with_cadence(cadence) {
        match cache.refresh_async(id.as_str()) {
            Ok(true) => report.started += 1,
            Ok(false) => report.skipped += 1,
            Err(err) => {
                report.failed += 1;
                warn!(resource = %id, error = %err, "Scheduled refresh not started");
            }
        }
    }

    report
}

/// Spawns the scheduler loop.
///
/// Both groups run once immediately, then every `frequent` and every
/// `frequent * infrequent_every` respectively. Missed ticks are skipped.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
pub fn spawn_scheduler(
    cache: Arc<RefreshCache>,
    frequent: Duration,
    infrequent_every: u32,
) -> JoinHandle<()> {
    let infrequent = frequent * infrequent_every.max(1);

    tokio::spawn(async move {
        let mut frequent_interval = interval(frequent);
        frequent_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut infrequent_interval = interval(infrequent);
        infrequent_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            frequent_secs = frequent.as_secs_f64(),
            infrequent_secs = infrequent.as_secs_f64(),
            "Starting refresh scheduler"
        );

        loop {
            let (cadence, report) = tokio::select! {
                _ = frequent_interval.tick() => (Cadence::Frequent, run_group(&cache, Cadence::Frequent)),
                _ = infrequent_interval.tick() => (Cadence::Infrequent, run_group(&cache, Cadence::Infrequent)),
            };

            if report.started > 0 || report.failed > 0 {
                info!(
                    ?cadence,
                    started = report.started,
                    skipped = report.skipped,
                    failed = report.failed,
                    "Scheduler tick"
                );
            } else {
                debug!(?cadence, skipped = report.skipped, "Scheduler tick, nothing stale");
            }
        }
    })
}
