//! Error types for the indexer

use crate::error::AppError;
use crate::models::ChangeId;
use crate::search::SearchError;

/// Result type for indexer operations
pub type IndexerResult<T> = std::result::Result<T, IndexerError>;

#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    /// Document store, change log or pointer cache failure
    #[error("Store error: {0}")]
    Store(#[from] AppError),

    /// Search index store failure
    #[error("Search index error: {0}")]
    Search(#[from] SearchError),

    /// A create or update event without a snapshot
    #[error("Change event {0} has no snapshot")]
    MalformedEvent(ChangeId),

    /// A delta batch stopped at a failing event. Events before it were
    /// applied and acknowledged; it and everything after stay in the log.
    #[error("Delta batch halted at event {event_id} after {applied} applied: {source}")]
    BatchHalted {
        event_id: ChangeId,
        applied: usize,
        source: Box<IndexerError>,
    },

    /// No free generation name was found
    #[error("Could not allocate a generation of '{index}' after {attempts} attempts")]
    GenerationAllocation { index: String, attempts: u32 },
}

impl From<IndexerError> for AppError {
    fn from(err: IndexerError) -> Self {
        match err {
            IndexerError::Store(err) => err,
            IndexerError::Search(err) => err.into(),
            other => AppError::Search(other.to_string()),
        }
    }
}
