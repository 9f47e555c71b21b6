//! VillagerDB town store and search-index synchronisation.
//!
//! Towns live in a transactional document store that records a change
//! event with every write. The [`indexer`] turns those events into updates
//! of a Tantivy search index, either incrementally (delta reindex) or by
//! building a fresh index generation and swapping a pointer to it (full
//! reindex).

pub mod api;
pub mod config;
pub mod error;
pub mod indexer;
pub mod metrics;
pub mod models;
pub mod scheduler;
pub mod search;
pub mod state;
pub mod towns;

pub use error::{AppError, Result};
