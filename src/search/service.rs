//! Paged town search over the live index generation

use crate::error::Result;
use crate::search::config::SearchConfig;
use crate::search::error::SearchError;
use crate::search::index::SearchHit;
use crate::search::query::SearchQuery;
use crate::search::store::SearchIndexStore;
use crate::state::IndexPointerCache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A town as shown in search results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TownHit {
    pub id: String,
    pub town_name: String,
    pub town_tags: Vec<String>,
    pub town_description: String,
}

impl From<SearchHit> for TownHit {
    fn from(hit: SearchHit) -> Self {
        Self {
            id: hit.id,
            town_name: hit.document.town_name,
            town_tags: hit.document.town_tags,
            town_description: hit.document.town_description,
        }
    }
}

/// One page of search results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TownSearchPage {
    /// The query as interpreted; `None` when browsing everything
    pub query: Option<String>,
    pub total: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub page_size: usize,
    pub results: Vec<TownHit>,
}

impl TownSearchPage {
    fn empty(query: &SearchQuery, page_size: usize) -> Self {
        Self {
            query: query_text(query),
            total: 0,
            total_pages: 1,
            current_page: 1,
            page_size,
            results: Vec::new(),
        }
    }
}

fn query_text(query: &SearchQuery) -> Option<String> {
    match query {
        SearchQuery::MatchAll => None,
        SearchQuery::Town(text) => Some(text.clone()),
    }
}

/// Page arithmetic: `(total_pages, current_page, from)` for `total` hits.
pub fn page_window(total: u64, requested_page: u64, page_size: usize) -> (u64, u64, usize) {
    let size = page_size.max(1) as u64;
    let total_pages = total.div_ceil(size).max(1);
    let current_page = requested_page.clamp(1, total_pages);
    let from = (size * (current_page - 1)) as usize;
    (total_pages, current_page, from)
}

/// Searches whichever generation the pointer names as live
pub struct TownSearch {
    store: Arc<dyn SearchIndexStore>,
    pointer: Arc<dyn IndexPointerCache>,
    index_name: String,
    config: SearchConfig,
}

impl TownSearch {
    pub fn new(
        store: Arc<dyn SearchIndexStore>,
        pointer: Arc<dyn IndexPointerCache>,
        index_name: impl Into<String>,
        config: SearchConfig,
    ) -> Self {
        Self {
            store,
            pointer,
            index_name: index_name.into(),
            config,
        }
    }

    pub async fn search_towns(&self, q: Option<&str>, page: Option<u64>) -> Result<TownSearchPage> {
        let query = SearchQuery::from_user_input(q, self.config.max_query_length);
        let page_size = self.config.page_size;

        let Some(generation) = self.pointer.get(&self.index_name).await? else {
            tracing::debug!(index = %self.index_name, "No live index, returning empty page");
            return Ok(TownSearchPage::empty(&query, page_size));
        };

        let total = match self.store.count(&generation, &query).await {
            Ok(total) => total,
            Err(SearchError::IndexNotFound(_)) => {
                tracing::warn!(generation = %generation, "Live index pointer names a missing index");
                return Ok(TownSearchPage::empty(&query, page_size));
            }
            Err(e) => return Err(e.into()),
        };

        let (total_pages, current_page, from) = page_window(total, page.unwrap_or(1), page_size);

        let results = if total == 0 {
            Vec::new()
        } else {
            self.store
                .search(&generation, &query, from, page_size)
                .await?
                .into_iter()
                .map(TownHit::from)
                .collect()
        };

        Ok(TownSearchPage {
            query: query_text(&query),
            total,
            total_pages,
            current_page,
            page_size,
            results,
        })
    }
}
