//! Search index store: named index generations under one root directory

use crate::search::config::SearchConfig;
use crate::search::document::TownDocument;
use crate::search::error::{SearchError, SearchResult};
use crate::search::index::{IndexManager, IndexStats, SearchHit};
use crate::search::query::SearchQuery;
use crate::search::schema::IndexSchema;
use async_trait::async_trait;
use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

/// Full-text engine holding any number of named indices
#[async_trait]
pub trait SearchIndexStore: Send + Sync {
    /// Create an empty index with the given schema. Fails with
    /// `IndexAlreadyExists` if the name is taken.
    async fn create_index(&self, name: &str, schema: &IndexSchema) -> SearchResult<()>;

    /// Add or replace a document
    async fn index_document(&self, index: &str, doc_id: &str, doc: &TownDocument)
        -> SearchResult<()>;

    /// Delete a document. A missing document is not an error.
    async fn delete_document(&self, index: &str, doc_id: &str) -> SearchResult<()>;

    /// Delete a whole index. Fails with `IndexNotFound` if it does not exist.
    async fn delete_index(&self, name: &str) -> SearchResult<()>;

    /// Commit pending writes and make them searchable
    async fn refresh(&self, index: &str) -> SearchResult<()>;

    async fn count(&self, index: &str, query: &SearchQuery) -> SearchResult<u64>;

    async fn search(
        &self,
        index: &str,
        query: &SearchQuery,
        from: usize,
        size: usize,
    ) -> SearchResult<Vec<SearchHit>>;

    /// Names of every index in the store, sorted
    async fn list_indices(&self) -> SearchResult<Vec<String>>;

    async fn stats(&self, index: &str) -> SearchResult<IndexStats>;
}

/// Tantivy backed store, one directory per index
pub struct TantivyIndexStore {
    config: SearchConfig,
    indices: DashMap<String, Arc<IndexManager>>,
}

impl TantivyIndexStore {
    pub fn new(config: SearchConfig) -> SearchResult<Self> {
        std::fs::create_dir_all(&config.index_root).map_err(|e| {
            SearchError::IndexInitFailed(format!("Failed to create index root: {}", e))
        })?;

        tracing::info!(root = ?config.index_root, "Initialized Tantivy index store");

        Ok(Self {
            config,
            indices: DashMap::new(),
        })
    }

    fn index_path(&self, name: &str) -> SearchResult<PathBuf> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(SearchError::IndexInitFailed(format!(
                "Invalid index name '{}'",
                name
            )));
        }
        Ok(self.config.index_root.join(name))
    }

    /// Open manager for `name`, opening it from disk on first use
    fn manager(&self, name: &str) -> SearchResult<Arc<IndexManager>> {
        if let Some(manager) = self.indices.get(name) {
            return Ok(manager.clone());
        }

        let path = self.index_path(name)?;
        let entry = self.indices.entry(name.to_string());
        match entry {
            dashmap::mapref::entry::Entry::Occupied(e) => Ok(e.get().clone()),
            dashmap::mapref::entry::Entry::Vacant(e) => {
                let manager = Arc::new(IndexManager::open(
                    name,
                    &path,
                    self.config.writer_heap_size,
                )?);
                tracing::debug!(index = %name, "Reopened index from disk");
                Ok(e.insert(manager).clone())
            }
        }
    }

    fn clamp_window(&self, from: usize, size: usize) -> usize {
        size.min(self.config.max_results.saturating_sub(from))
    }
}

#[async_trait]
impl SearchIndexStore for TantivyIndexStore {
    async fn create_index(&self, name: &str, schema: &IndexSchema) -> SearchResult<()> {
        let path = self.index_path(name)?;

        match std::fs::create_dir(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(SearchError::IndexAlreadyExists(name.to_string()));
            }
            Err(e) => return Err(SearchError::IoError(e)),
        }

        let manager = IndexManager::create(name, &path, schema, self.config.writer_heap_size)?;
        self.indices.insert(name.to_string(), Arc::new(manager));

        tracing::info!(index = %name, "Created index");
        Ok(())
    }

    async fn index_document(
        &self,
        index: &str,
        doc_id: &str,
        doc: &TownDocument,
    ) -> SearchResult<()> {
        self.manager(index)?.upsert(doc_id, doc).await
    }

    async fn delete_document(&self, index: &str, doc_id: &str) -> SearchResult<()> {
        self.manager(index)?.delete(doc_id).await
    }

    async fn delete_index(&self, name: &str) -> SearchResult<()> {
        let path = self.index_path(name)?;
        self.indices.remove(name);

        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {
                tracing::info!(index = %name, "Deleted index");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(SearchError::IndexNotFound(name.to_string()))
            }
            Err(e) => Err(SearchError::IoError(e)),
        }
    }

    async fn refresh(&self, index: &str) -> SearchResult<()> {
        self.manager(index)?.refresh().await
    }

    async fn count(&self, index: &str, query: &SearchQuery) -> SearchResult<u64> {
        self.manager(index)?.count(query)
    }

    async fn search(
        &self,
        index: &str,
        query: &SearchQuery,
        from: usize,
        size: usize,
    ) -> SearchResult<Vec<SearchHit>> {
        let size = self.clamp_window(from, size);
        self.manager(index)?.search(query, from, size)
    }

    async fn list_indices(&self) -> SearchResult<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.config.index_root).await?;

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }

    async fn stats(&self, index: &str) -> SearchResult<IndexStats> {
        self.manager(index)?.stats()
    }
}
