use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::services::directory::{CachedDirectory, Directory};

/// Every minute, at second zero
pub const SWEEP_SCHEDULE: &str = "0 * * * * *";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub parents_evicted: usize,
    pub students_evicted: usize,
    pub remaining: usize,
}

/// Drops expired parent and student lookups from the directory cache
pub fn sweep<D: Directory>(directory: &CachedDirectory<D>) -> SweepStats {
    let (parents_evicted, students_evicted) = directory.purge_expired();

    let stats = SweepStats {
        parents_evicted,
        students_evicted,
        remaining: directory.cached_entries(),
    };

    if stats.parents_evicted + stats.students_evicted > 0 {
        tracing::debug!(?stats, "Lookup cache sweep completed");
    }

    stats
}

/// Registers and starts the sweep job
pub async fn start<D>(directory: Arc<CachedDirectory<D>>) -> anyhow::Result<JobScheduler>
where
    D: Directory + 'static,
{
    let scheduler = JobScheduler::new().await?;

    let job = Job::new(SWEEP_SCHEDULE, move |_uuid, _lock| {
        sweep(&directory);
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    tracing::info!(schedule = SWEEP_SCHEDULE, "Lookup cache sweeper started");

    Ok(scheduler)
}
