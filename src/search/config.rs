//! Search configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Search index store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Root directory; each index generation lives in its own subdirectory
    pub index_root: PathBuf,

    /// Index writer heap size in bytes (default: 50MB)
    pub writer_heap_size: usize,

    /// Upper bound on `from + size` for a single search
    pub max_results: usize,

    /// Towns per search results page
    pub page_size: usize,

    /// Queries longer than this are treated as browse-all
    pub max_query_length: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_root: PathBuf::from("./data/search"),
            writer_heap_size: 50_000_000,
            max_results: 10_000,
            page_size: 20,
            max_query_length: 64,
        }
    }
}

/// Builder for SearchConfig
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    pub fn index_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.index_root = path.into();
        self
    }

    pub fn writer_heap_size(mut self, size: usize) -> Self {
        self.config.writer_heap_size = size;
        self
    }

    pub fn max_results(mut self, max: usize) -> Self {
        self.config.max_results = max;
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn max_query_length(mut self, len: usize) -> Self {
        self.config.max_query_length = len;
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
