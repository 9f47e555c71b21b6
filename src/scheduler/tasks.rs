//! Scheduled indexer jobs

use super::config::JobConfig;
use super::jobs::{Job, JobMetadata};
use crate::indexer::{DeltaOutcome, Indexer};
use std::sync::Arc;
use tracing::{debug, info};

pub const DELTA_REINDEX_JOB: &str = "delta_reindex";
pub const SWEEP_ORPHANS_JOB: &str = "sweep_orphans";

/// Replay pending change events into the live generation.
///
/// A busy indexer or a missing live generation is not a failure; the next
/// tick tries again.
///
/// Default schedule: every 5 minutes (`0 */5 * * * *`)
pub fn delta_reindex_job(indexer: Arc<Indexer>, config: &JobConfig) -> Job {
    let metadata = JobMetadata::new(DELTA_REINDEX_JOB, config.schedule.clone())
        .with_description("Apply pending town changes to the search index");

    Job::new(metadata, move |_ctx| {
        let indexer = indexer.clone();
        async move {
            let report = indexer.delta_reindex().await.map_err(|e| e.to_string())?;
            match report.outcome {
                DeltaOutcome::Processed => debug!(
                    applied = report.applied,
                    remaining = ?report.remaining,
                    "Scheduled delta run finished"
                ),
                DeltaOutcome::Busy => info!("Indexer busy, delta run deferred to the next tick"),
                DeltaOutcome::NoLiveIndex => {
                    info!("No live generation yet, delta run skipped")
                }
            }
            Ok(())
        }
    })
}

/// Delete generations that are not live.
///
/// Disabled by default; the service also sweeps once on start.
pub fn sweep_orphans_job(indexer: Arc<Indexer>, config: &JobConfig) -> Job {
    let metadata = JobMetadata::new(SWEEP_ORPHANS_JOB, config.schedule.clone())
        .with_description("Remove search index generations that never became live");

    Job::new(metadata, move |_ctx| {
        let indexer = indexer.clone();
        async move {
            let report = indexer.sweep_orphans().await.map_err(|e| e.to_string())?;
            info!(removed = report.removed.len(), "Scheduled orphan sweep finished");
            Ok(())
        }
    })
}
