//! Results of indexer runs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullReindexReport {
    /// The generation that is now live
    pub generation: String,

    /// The generation it replaced, if any
    pub previous: Option<String>,

    /// Whether the previous generation was deleted by this run
    pub retired_previous: bool,

    pub documents: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaOutcome {
    /// No generation is live yet; nothing was consumed
    NoLiveIndex,

    /// Another indexer run holds the run lock
    Busy,

    /// Events (possibly zero) were applied
    Processed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaReport {
    pub outcome: DeltaOutcome,
    pub generation: Option<String>,
    pub applied: usize,
    pub batches: usize,

    /// Events still in the change log after the run
    pub remaining: Option<u64>,
}

impl DeltaReport {
    pub fn busy() -> Self {
        Self {
            outcome: DeltaOutcome::Busy,
            generation: None,
            applied: 0,
            batches: 0,
            remaining: None,
        }
    }

    pub fn no_live_index() -> Self {
        Self {
            outcome: DeltaOutcome::NoLiveIndex,
            ..Self::busy()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub live: Option<String>,
    pub removed: Vec<String>,
}

/// Snapshot of the indexing pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerStatus {
    pub index_name: String,
    pub live_generation: Option<String>,
    pub live_documents: Option<u64>,
    pub backlog: u64,

    /// Every generation of the index present in the search store
    pub generations: Vec<String>,
}
