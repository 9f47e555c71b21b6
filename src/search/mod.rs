//! Full-text town search powered by Tantivy
//!
//! The search layer holds any number of index *generations* (one Tantivy
//! directory each) and answers paged town searches against whichever
//! generation the index pointer names as live.
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │           TownSearch (paged search)              │
//! └─────────────────────────────────────────────────┘
//!                      │  pointer → live generation
//!                      ▼
//! ┌─────────────────────────────────────────────────┐
//! │           SearchIndexStore                       │
//! │  create / delete / list generations              │
//! │  index / delete documents, refresh               │
//! └─────────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────────┐
//! │    IndexManager (one per generation)             │
//! │    writer + manually reloaded reader             │
//! └─────────────────────────────────────────────────┘
//! ```

mod config;
mod document;
mod error;
mod index;
mod query;
mod schema;
mod service;
mod store;

pub use config::{SearchConfig, SearchConfigBuilder};
pub use document::{shape_document, TownDocument};
pub use error::{SearchError, SearchResult};
pub use index::{IndexManager, IndexStats, SearchHit};
pub use query::{QueryBuilder, SearchQuery};
pub use schema::{town_index_schema, FieldKind, FieldMapping, IndexSchema, ID_FIELD};
pub use service::{page_window, TownHit, TownSearch, TownSearchPage};
pub use store::{SearchIndexStore, TantivyIndexStore};
