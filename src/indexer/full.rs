//! Full reindex into a fresh generation

use super::core::Indexer;
use super::error::IndexerResult;
use super::metrics::INDEXER_METRICS;
use super::report::FullReindexReport;
use crate::search::{shape_document, SearchError};
use futures::StreamExt;
use std::time::Instant;
use tracing::{error, info, warn};

impl Indexer {
    /// Rebuild the index from the document store.
    ///
    /// Builds a new generation, swaps the pointer to it in one atomic
    /// replace and then deletes the generation it replaced. Searches see
    /// either the old or the new generation, never a partial one. A failed
    /// build leaves an unpointed generation behind for the orphan sweep.
    pub async fn full_reindex(&self) -> IndexerResult<FullReindexReport> {
        let _guard = self.run_lock.lock().await;
        let start = Instant::now();

        let generation = self.allocate_generation().await?;
        info!(generation = %generation, "Full reindex started");

        let (documents, previous) = match self.build_and_swap(&generation).await {
            Ok(result) => result,
            Err(e) => {
                error!(
                    generation = %generation,
                    error = %e,
                    "Full reindex failed, generation left orphaned"
                );
                INDEXER_METRICS.record_full(false, 0, start.elapsed().as_secs_f64());
                return Err(e);
            }
        };

        let retired_previous = match previous.as_deref() {
            Some(old) if old != generation => self.retire(old).await,
            _ => false,
        };

        let duration = start.elapsed();
        INDEXER_METRICS.record_full(true, documents, duration.as_secs_f64());

        info!(
            generation = %generation,
            previous = ?previous,
            documents,
            duration_ms = duration.as_millis() as u64,
            "Full reindex completed"
        );

        Ok(FullReindexReport {
            generation,
            previous,
            retired_previous,
            documents,
            duration_ms: duration.as_millis() as u64,
        })
    }

    async fn build_and_swap(&self, generation: &str) -> IndexerResult<(u64, Option<String>)> {
        let mut documents = 0u64;
        let mut towns = self.documents.stream_towns();

        while let Some(town) = towns.next().await {
            let town = town?;
            let doc = shape_document(&town.key, &town.fields);
            self.search
                .index_document(generation, &town.key.document_id(), &doc)
                .await?;
            documents += 1;
        }

        self.search.refresh(generation).await?;

        let previous = self
            .pointer
            .replace(&self.config.index_name, generation)
            .await?;
        INDEXER_METRICS.generation_swaps.inc();

        Ok((documents, previous))
    }

    /// Delete a generation that is no longer live. Failures are logged; the
    /// orphan sweep removes anything left behind.
    async fn retire(&self, generation: &str) -> bool {
        match self.search.delete_index(generation).await {
            Ok(()) => {
                info!(generation = %generation, "Retired previous generation");
                true
            }
            Err(SearchError::IndexNotFound(_)) => {
                warn!(generation = %generation, "Previous generation was already gone");
                false
            }
            Err(e) => {
                error!(
                    generation = %generation,
                    error = %e,
                    "Failed to retire previous generation"
                );
                false
            }
        }
    }
}
