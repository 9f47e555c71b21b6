//! Management of a single index generation

use crate::search::document::TownDocument;
use crate::search::error::{SearchError, SearchResult};
use crate::search::query::{QueryBuilder, SearchQuery};
use crate::search::schema::{IndexSchema, ID_FIELD};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tantivy::collector::{Count, TopDocs};
use tantivy::schema::Schema;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;

/// Index statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Index (generation) name
    pub name: String,

    /// Documents visible to searches
    pub total_documents: u64,

    /// Index size in bytes
    pub index_size_bytes: u64,

    /// Number of segments
    pub num_segments: usize,
}

/// One search hit: the document id plus its stored fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub document: TownDocument,
}

/// Owns the Tantivy index, writer and reader of one generation.
///
/// Writes become visible to searches only after [`IndexManager::refresh`].
pub struct IndexManager {
    name: String,
    path: PathBuf,
    index: Index,
    schema: Schema,
    writer: Arc<RwLock<IndexWriter>>,
    reader: IndexReader,
}

impl IndexManager {
    /// Create a new index in an existing, empty directory
    pub fn create(
        name: &str,
        path: &Path,
        schema: &IndexSchema,
        writer_heap_size: usize,
    ) -> SearchResult<Self> {
        let index = Index::create_in_dir(path, schema.to_tantivy()).map_err(|e| {
            SearchError::IndexInitFailed(format!("Failed to create index {}: {}", name, e))
        })?;
        Self::from_index(name, path, index, writer_heap_size)
    }

    /// Open an index created earlier (e.g. before a restart)
    pub fn open(name: &str, path: &Path, writer_heap_size: usize) -> SearchResult<Self> {
        if !Self::index_exists(path) {
            return Err(SearchError::IndexNotFound(name.to_string()));
        }
        let index = Index::open_in_dir(path).map_err(|e| {
            SearchError::IndexInitFailed(format!("Failed to open index {}: {}", name, e))
        })?;
        Self::from_index(name, path, index, writer_heap_size)
    }

    fn from_index(
        name: &str,
        path: &Path,
        index: Index,
        writer_heap_size: usize,
    ) -> SearchResult<Self> {
        let schema = index.schema();

        let writer = index
            .writer(writer_heap_size)
            .map_err(|e| SearchError::IndexInitFailed(format!("Failed to create writer: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| SearchError::IndexInitFailed(format!("Failed to create reader: {}", e)))?;

        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            index,
            schema,
            writer: Arc::new(RwLock::new(writer)),
            reader,
        })
    }

    /// Check if an index exists at the given path
    pub fn index_exists(path: &Path) -> bool {
        path.join("meta.json").exists()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn id_term(&self, doc_id: &str) -> SearchResult<Term> {
        let id_field = self
            .schema
            .get_field(ID_FIELD)
            .map_err(|_| SearchError::SchemaError(format!("Index {} has no id field", self.name)))?;
        Ok(Term::from_field_text(id_field, doc_id))
    }

    /// Add or replace the document stored under `doc_id`
    pub async fn upsert(&self, doc_id: &str, document: &TownDocument) -> SearchResult<()> {
        let tantivy_doc = document.to_tantivy_doc(doc_id, &self.schema)?;
        let term = self.id_term(doc_id)?;

        let writer = self.writer.write().await;
        writer.delete_term(term);
        writer.add_document(tantivy_doc).map_err(|e| {
            SearchError::IndexingFailed(format!("Failed to add document {}: {}", doc_id, e))
        })?;

        Ok(())
    }

    /// Delete the document stored under `doc_id`. Deleting an id that is
    /// not in the index is a no-op.
    pub async fn delete(&self, doc_id: &str) -> SearchResult<()> {
        let term = self.id_term(doc_id)?;
        let writer = self.writer.write().await;
        writer.delete_term(term);
        Ok(())
    }

    /// Commit pending writes and make them visible to searches
    pub async fn refresh(&self) -> SearchResult<()> {
        let mut writer = self.writer.write().await;
        writer
            .commit()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to commit: {}", e)))?;
        self.reader.reload()?;
        Ok(())
    }

    pub fn count(&self, query: &SearchQuery) -> SearchResult<u64> {
        let tantivy_query = QueryBuilder::new(&self.schema, &self.index).build(query)?;
        let searcher = self.reader.searcher();

        let count = searcher
            .search(&*tantivy_query, &Count)
            .map_err(|e| SearchError::SearchFailed(format!("Count failed: {}", e)))?;

        Ok(count as u64)
    }

    pub fn search(
        &self,
        query: &SearchQuery,
        from: usize,
        size: usize,
    ) -> SearchResult<Vec<SearchHit>> {
        if size == 0 {
            return Ok(Vec::new());
        }

        let tantivy_query = QueryBuilder::new(&self.schema, &self.index).build(query)?;
        let searcher = self.reader.searcher();

        let top_docs = searcher
            .search(&*tantivy_query, &TopDocs::with_limit(size).and_offset(from))
            .map_err(|e| SearchError::SearchFailed(format!("Search execution failed: {}", e)))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (_score, doc_address) in top_docs {
            let retrieved: TantivyDocument = searcher
                .doc(doc_address)
                .map_err(|e| SearchError::SearchFailed(format!("Failed to retrieve doc: {}", e)))?;
            let (id, document) = TownDocument::from_tantivy_doc(&retrieved, &self.schema)?;
            hits.push(SearchHit { id, document });
        }

        Ok(hits)
    }

    pub fn stats(&self) -> SearchResult<IndexStats> {
        let searcher = self.reader.searcher();

        let index_size_bytes = std::fs::read_dir(&self.path)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| e.metadata().ok())
                    .map(|m| m.len())
                    .sum()
            })
            .unwrap_or(0);

        Ok(IndexStats {
            name: self.name.clone(),
            total_documents: searcher.num_docs(),
            index_size_bytes,
            num_segments: searcher.segment_readers().len(),
        })
    }
}
