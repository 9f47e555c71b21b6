//! Indexer configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Logical index name; also the pointer key and generation prefix
    pub index_name: String,

    /// Change events fetched per delta batch
    pub batch_size: usize,

    /// Batches a single delta run may drain. With 1, a run processes one
    /// batch and leaves the rest for the next tick.
    pub max_batches_per_run: usize,

    /// Remove orphaned generations when the service starts
    pub sweep_on_start: bool,

    /// Name collisions tolerated when allocating a generation
    pub generation_attempts: u32,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            index_name: "towns".to_string(),
            batch_size: 100,
            max_batches_per_run: 1,
            sweep_on_start: true,
            generation_attempts: 16,
        }
    }
}
