//! Auto-trigger: resynchronize when F# sources change on disk.

use crate::error::SyncError;
use crate::fs::FileSystem;
use crate::orchestrator::Orchestrator;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info};

/// Newest last-modified time across every `.fs` file under `root`.
///
/// A newly added file advances this just like an edit does.
pub fn newest_source_mtime(fs: &dyn FileSystem, root: &Path) -> Option<SystemTime> {
    let sources = fs.find_files(root, "fs", true).ok()?;
    sources.iter().filter_map(|s| fs.modified(s)).max()
}

/// Poll `host_root` and run a synchronization pass whenever the newest F#
/// source timestamp advances. Runs once immediately, then forever.
///
/// Triggers that land while a pass is in flight are absorbed by the
/// orchestrator's re-entrancy guard.
pub async fn watch(
    orchestrator: &Orchestrator,
    fs: &dyn FileSystem,
    host_root: &Path,
    interval: Duration,
) -> Result<(), SyncError> {
    info!(
        interval_secs = interval.as_secs(),
        "watching {} for F# source changes",
        host_root.display()
    );

    run_once(orchestrator, host_root).await;
    let mut last_seen = newest_source_mtime(fs, host_root);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;

        let newest = newest_source_mtime(fs, host_root);
        if newest > last_seen {
            debug!("F# sources changed, triggering synchronization");
            last_seen = newest;
            run_once(orchestrator, host_root).await;
        }
    }
}

async fn run_once(orchestrator: &Orchestrator, host_root: &Path) {
    match orchestrator.run(host_root).await {
        Ok(report) => {
            if report.failed_count() > 0 {
                error!("{} project(s) failed to synchronize", report.failed_count());
            }
        }
        // Keep watching; the condition is user-fixable between polls.
        Err(e) => error!("synchronization failed: {}", e),
    }
}
