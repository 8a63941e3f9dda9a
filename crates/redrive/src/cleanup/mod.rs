//! Periodic purge of terminal instance records
//!
//! Terminal instances stay queryable for a while after they finish, then
//! get swept. Completed instances age out quickly; failed ones are kept
//! much longer so operators can inspect them.

use std::time::Duration;

use chrono::Duration as ChronoDuration;
use tracing::{debug, info, instrument};

use crate::substrate::LocalRuntime;

/// How long terminal instance records are retained before purging
#[derive(Debug, Clone, PartialEq)]
pub struct RetentionPolicy {
    /// Retention window for completed instances
    pub completed: ChronoDuration,

    /// Retention window for failed instances
    pub failed: ChronoDuration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            completed: ChronoDuration::days(7),
            failed: ChronoDuration::days(100),
        }
    }
}

/// Counts of records removed by one purge pass
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PurgeSummary {
    /// Completed instances purged
    pub completed: u64,

    /// Failed instances purged
    pub failed: u64,
}

impl PurgeSummary {
    /// Total records purged
    pub fn total(&self) -> u64 {
        self.completed + self.failed
    }
}

/// Background job sweeping expired terminal records on an interval
pub struct CleanupJob {
    runtime: LocalRuntime,
    retention: RetentionPolicy,
    interval: Duration,
}

impl CleanupJob {
    /// Create a cleanup job over `runtime`
    pub fn new(runtime: LocalRuntime, retention: RetentionPolicy, interval: Duration) -> Self {
        Self {
            runtime,
            retention,
            interval,
        }
    }

    /// Run the sweep loop forever; spawn this on its own task
    #[instrument(skip(self), fields(interval_secs = self.interval.as_secs()))]
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        // The first tick fires immediately; skip it so a fresh process
        // does not sweep before anything can have expired
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let summary = self.runtime.purge_terminal(&self.retention, self.runtime.now());
            if summary.total() > 0 {
                info!(
                    purged_completed = summary.completed,
                    purged_failed = summary.failed,
                    "purged expired instance records"
                );
            } else {
                debug!("cleanup pass found nothing to purge");
            }
        }
    }
}
