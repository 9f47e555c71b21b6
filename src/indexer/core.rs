//! The indexer: owns the run lock and the stores it synchronises

use super::config::IndexerConfig;
use super::error::{IndexerError, IndexerResult};
use super::generation::{generation_name, is_generation_of};
use super::metrics::INDEXER_METRICS;
use super::report::{IndexerStatus, SweepReport};
use crate::search::{town_index_schema, SearchError, SearchIndexStore};
use crate::state::{ChangeLog, DocumentStore, IndexPointerCache};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Keeps the search index in step with the document store.
///
/// Full reindex, delta reindex and the orphan sweep all take the same run
/// lock. Delta runs only try it and report `Busy` when it is held; full
/// reindex and sweep wait for it.
pub struct Indexer {
    pub(super) documents: Arc<dyn DocumentStore>,
    pub(super) change_log: Arc<dyn ChangeLog>,
    pub(super) search: Arc<dyn SearchIndexStore>,
    pub(super) pointer: Arc<dyn IndexPointerCache>,
    pub(super) config: IndexerConfig,
    pub(super) run_lock: Mutex<()>,
}

impl Indexer {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        change_log: Arc<dyn ChangeLog>,
        search: Arc<dyn SearchIndexStore>,
        pointer: Arc<dyn IndexPointerCache>,
        config: IndexerConfig,
    ) -> Self {
        Self {
            documents,
            change_log,
            search,
            pointer,
            config,
            run_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    pub fn index_name(&self) -> &str {
        &self.config.index_name
    }

    /// Name of the live generation, if any
    pub async fn live_generation(&self) -> IndexerResult<Option<String>> {
        Ok(self.pointer.get(&self.config.index_name).await?)
    }

    /// Create a new, empty generation with a unique name
    pub(super) async fn allocate_generation(&self) -> IndexerResult<String> {
        let index = &self.config.index_name;
        let schema = town_index_schema();
        let mut millis = Utc::now().timestamp_millis();

        for _ in 0..self.config.generation_attempts {
            let name = generation_name(index, millis);
            match self.search.create_index(&name, &schema).await {
                Ok(()) => return Ok(name),
                Err(SearchError::IndexAlreadyExists(_)) => {
                    debug!(generation = %name, "Generation name taken, trying the next one");
                    millis += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(IndexerError::GenerationAllocation {
            index: index.clone(),
            attempts: self.config.generation_attempts,
        })
    }

    /// Generations of this index in the search store, oldest first
    async fn generations(&self) -> IndexerResult<Vec<String>> {
        let index = &self.config.index_name;
        let mut names: Vec<String> = self
            .search
            .list_indices()
            .await?
            .into_iter()
            .filter(|name| is_generation_of(index, name))
            .collect();
        names.sort_by_key(|name| super::generation::parse_generation(index, name));
        Ok(names)
    }

    /// Delete every generation that is not live.
    ///
    /// Runs under the run lock, so a generation being built by a full
    /// reindex is never touched. Does nothing while no pointer is set.
    pub async fn sweep_orphans(&self) -> IndexerResult<SweepReport> {
        let _guard = self.run_lock.lock().await;

        let Some(live) = self.pointer.get(&self.config.index_name).await? else {
            info!(index = %self.config.index_name, "No live generation, skipping orphan sweep");
            return Ok(SweepReport {
                live: None,
                removed: Vec::new(),
            });
        };

        let mut removed = Vec::new();
        for name in self.generations().await? {
            if name == live {
                continue;
            }
            match self.search.delete_index(&name).await {
                Ok(()) => {
                    info!(generation = %name, "Removed orphaned generation");
                    INDEXER_METRICS.orphans_removed.inc();
                    removed.push(name);
                }
                Err(SearchError::IndexNotFound(_)) => {
                    debug!(generation = %name, "Orphaned generation already gone");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(SweepReport {
            live: Some(live),
            removed,
        })
    }

    pub async fn status(&self) -> IndexerResult<IndexerStatus> {
        let live_generation = self.pointer.get(&self.config.index_name).await?;
        let backlog = self.change_log.backlog().await?;
        let generations = self.generations().await?;

        let live_documents = match &live_generation {
            Some(name) => match self.search.stats(name).await {
                Ok(stats) => Some(stats.total_documents),
                Err(SearchError::IndexNotFound(_)) => {
                    warn!(generation = %name, "Live generation is missing from the search store");
                    None
                }
                Err(e) => return Err(e.into()),
            },
            None => None,
        };

        Ok(IndexerStatus {
            index_name: self.config.index_name.clone(),
            live_generation,
            live_documents,
            backlog,
            generations,
        })
    }
}
