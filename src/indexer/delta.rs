//! Delta reindex: replay the change log into the live generation

use super::core::Indexer;
use super::error::{IndexerError, IndexerResult};
use super::metrics::INDEXER_METRICS;
use super::report::{DeltaOutcome, DeltaReport};
use crate::models::{ChangeEvent, ChangeEventType};
use crate::search::shape_document;
use tracing::{debug, error, info};

impl Indexer {
    /// Apply pending change events to the live generation, oldest first.
    ///
    /// Each event is applied, committed and only then acknowledged. The
    /// first failing event stops the run and stays in the log together
    /// with everything after it.
    pub async fn delta_reindex(&self) -> IndexerResult<DeltaReport> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            info!(index = %self.config.index_name, "Indexer busy, skipping delta run");
            INDEXER_METRICS.record_delta("busy");
            return Ok(DeltaReport::busy());
        };

        let Some(generation) = self.pointer.get(&self.config.index_name).await? else {
            info!(index = %self.config.index_name, "No live generation, skipping delta run");
            INDEXER_METRICS.record_delta("no_live_index");
            return Ok(DeltaReport::no_live_index());
        };

        let batch_size = self.config.batch_size.max(1);
        let mut applied = 0usize;
        let mut batches = 0usize;

        while batches < self.config.max_batches_per_run.max(1) {
            let events = self.change_log.pending(batch_size).await?;
            if events.is_empty() {
                break;
            }
            batches += 1;
            let fetched = events.len();

            for event in events {
                if let Err(e) = self.apply_and_acknowledge(&generation, &event).await {
                    error!(
                        generation = %generation,
                        event_id = %event.id,
                        applied,
                        error = %e,
                        "Delta batch halted"
                    );
                    INDEXER_METRICS.record_delta("failed");
                    return Err(IndexerError::BatchHalted {
                        event_id: event.id,
                        applied,
                        source: Box::new(e),
                    });
                }
                applied += 1;
            }

            if fetched < batch_size {
                break;
            }
        }

        let remaining = self.change_log.backlog().await?;
        INDEXER_METRICS.change_log_backlog.set(remaining as i64);
        INDEXER_METRICS.record_delta("processed");

        if applied > 0 {
            info!(generation = %generation, applied, batches, remaining, "Delta run applied events");
        } else {
            debug!(generation = %generation, "Delta run found no events");
        }

        Ok(DeltaReport {
            outcome: DeltaOutcome::Processed,
            generation: Some(generation),
            applied,
            batches,
            remaining: Some(remaining),
        })
    }

    async fn apply_and_acknowledge(&self, generation: &str, event: &ChangeEvent) -> IndexerResult<()> {
        self.apply_event(generation, event).await?;
        self.search.refresh(generation).await?;
        self.change_log.acknowledge(event.id).await?;
        INDEXER_METRICS.record_event(&event.event_type.to_string());
        Ok(())
    }

    /// Write one change event into `generation` without committing it.
    ///
    /// Create and update upsert the shaped snapshot; delete removes the
    /// document and succeeds if it was never indexed. Applying the same
    /// event twice leaves the index as applying it once.
    pub async fn apply_event(&self, generation: &str, event: &ChangeEvent) -> IndexerResult<()> {
        let doc_id = event.document_id();

        match event.event_type {
            ChangeEventType::Create | ChangeEventType::Update => {
                let snapshot = event
                    .snapshot
                    .as_ref()
                    .ok_or(IndexerError::MalformedEvent(event.id))?;
                let doc = shape_document(&event.key, snapshot);
                self.search.index_document(generation, &doc_id, &doc).await?;
            }
            ChangeEventType::Delete => {
                self.search.delete_document(generation, &doc_id).await?;
            }
        }

        debug!(
            generation = %generation,
            event_id = %event.id,
            event_type = %event.event_type,
            doc_id = %doc_id,
            "Applied change event"
        );
        Ok(())
    }
}
