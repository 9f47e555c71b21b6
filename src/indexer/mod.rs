//! Search index synchronisation
//!
//! Towns are written to the document store together with a change event.
//! The indexer brings the search index up to date in two ways:
//!
//! - **Delta reindex** replays pending change events, oldest first, into
//!   the live generation and acknowledges each one once it is committed.
//! - **Full reindex** builds a brand new generation from the document
//!   store, atomically points the logical index name at it and deletes the
//!   generation it replaced.
//!
//! Generations that never became live (a full reindex that failed part
//! way) are removed by the orphan sweep.

mod config;
mod core;
mod delta;
mod error;
mod full;
mod generation;
mod metrics;
mod report;

pub use config::IndexerConfig;
pub use core::Indexer;
pub use error::{IndexerError, IndexerResult};
pub use generation::{generation_name, is_generation_of, parse_generation};
pub use metrics::{init_indexer_metrics, INDEXER_METRICS};
pub use report::{DeltaOutcome, DeltaReport, FullReindexReport, IndexerStatus, SweepReport};
