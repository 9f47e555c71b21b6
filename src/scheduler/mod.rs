//! Cron-driven background jobs
//!
//! The delta reindex runs on a fixed schedule so that town changes reach the
//! search index without a request having to wait for it. Job executions are
//! timed out, logged and counted in Prometheus; a failing run never stops
//! the scheduler and the next tick is the retry.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use villagerdb::indexer::Indexer;
//! use villagerdb::scheduler::{register_indexer_jobs, SchedulerConfig, SchedulerService};
//!
//! async fn run(indexer: Arc<Indexer>) -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SchedulerConfig::default();
//!     let mut scheduler = SchedulerService::new(config.clone()).await?;
//!     register_indexer_jobs(&scheduler, indexer, &config).await?;
//!     scheduler.start().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod jobs;
mod metrics;
mod tasks;

pub use config::{JobConfig, JobsConfig, SchedulerConfig, SchedulerConfigBuilder};
pub use core::{SchedulerService, SchedulerStats};
pub use error::{SchedulerError, SchedulerResult};
pub use jobs::{Job, JobContext, JobId, JobMetadata, JobStatus};
pub use metrics::{init_scheduler_metrics, SCHEDULER_METRICS};
pub use tasks::{delta_reindex_job, sweep_orphans_job, DELTA_REINDEX_JOB, SWEEP_ORPHANS_JOB};

use crate::indexer::Indexer;
use std::sync::Arc;

/// Register every enabled indexer job, returning the ids added
pub async fn register_indexer_jobs(
    scheduler: &SchedulerService,
    indexer: Arc<Indexer>,
    config: &SchedulerConfig,
) -> SchedulerResult<Vec<JobId>> {
    let mut ids = Vec::new();

    if config.jobs.delta_reindex.enabled {
        let job = delta_reindex_job(indexer.clone(), &config.jobs.delta_reindex);
        ids.push(scheduler.add_job(job).await?);
    }

    if config.jobs.sweep_orphans.enabled {
        let job = sweep_orphans_job(indexer, &config.jobs.sweep_orphans);
        ids.push(scheduler.add_job(job).await?);
    }

    Ok(ids)
}
