//! Integration tests for full and delta reindexing

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Notify;
use villagerdb::indexer::{generation_name, DeltaOutcome, Indexer, IndexerConfig, IndexerError};
use villagerdb::error::AppError;
use villagerdb::models::{ChangeEvent, TownInput};
use villagerdb::search::{
    town_index_schema, IndexSchema, IndexStats, SearchConfig, SearchError, SearchHit,
    SearchIndexStore, SearchQuery, SearchResult, TantivyIndexStore, TownDocument, TownSearch,
};
use villagerdb::state::{create_in_memory_stores, Stores};
use villagerdb::towns::TownService;

const HEAP: usize = 15_000_000;

/// Search store wrapper that can fail or pause on chosen documents
struct TestSearchStore {
    inner: TantivyIndexStore,
    fail_on: Option<String>,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

#[async_trait]
impl SearchIndexStore for TestSearchStore {
    async fn create_index(&self, name: &str, schema: &IndexSchema) -> SearchResult<()> {
        self.inner.create_index(name, schema).await
    }

    async fn index_document(
        &self,
        index: &str,
        doc_id: &str,
        doc: &TownDocument,
    ) -> SearchResult<()> {
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        if self.fail_on.as_deref() == Some(doc_id) {
            return Err(SearchError::IndexingFailed(format!("refusing {}", doc_id)));
        }
        self.inner.index_document(index, doc_id, doc).await
    }

    async fn delete_document(&self, index: &str, doc_id: &str) -> SearchResult<()> {
        self.inner.delete_document(index, doc_id).await
    }

    async fn delete_index(&self, name: &str) -> SearchResult<()> {
        self.inner.delete_index(name).await
    }

    async fn refresh(&self, index: &str) -> SearchResult<()> {
        self.inner.refresh(index).await
    }

    async fn count(&self, index: &str, query: &SearchQuery) -> SearchResult<u64> {
        self.inner.count(index, query).await
    }

    async fn search(
        &self,
        index: &str,
        query: &SearchQuery,
        from: usize,
        size: usize,
    ) -> SearchResult<Vec<SearchHit>> {
        self.inner.search(index, query, from, size).await
    }

    async fn list_indices(&self) -> SearchResult<Vec<String>> {
        self.inner.list_indices().await
    }

    async fn stats(&self, index: &str) -> SearchResult<IndexStats> {
        self.inner.stats(index).await
    }
}

struct Harness {
    _dir: TempDir,
    stores: Stores,
    search: Arc<dyn SearchIndexStore>,
    indexer: Arc<Indexer>,
    towns: TownService,
    town_search: Arc<TownSearch>,
}

fn search_config(dir: &TempDir) -> SearchConfig {
    SearchConfig {
        index_root: dir.path().join("indices"),
        writer_heap_size: HEAP,
        ..Default::default()
    }
}

fn build(config: IndexerConfig, wrap: impl FnOnce(TantivyIndexStore) -> Arc<dyn SearchIndexStore>) -> Harness {
    let dir = TempDir::new().unwrap();
    let stores = create_in_memory_stores();
    let search = wrap(TantivyIndexStore::new(search_config(&dir)).unwrap());

    let indexer = Arc::new(Indexer::new(
        stores.documents.clone(),
        stores.change_log.clone(),
        search.clone(),
        stores.pointer.clone(),
        config.clone(),
    ));
    let town_search = Arc::new(TownSearch::new(
        search.clone(),
        stores.pointer.clone(),
        config.index_name.clone(),
        search_config(&dir),
    ));

    Harness {
        towns: TownService::new(stores.documents.clone()),
        _dir: dir,
        stores,
        search,
        indexer,
        town_search,
    }
}

fn harness() -> Harness {
    harness_with(IndexerConfig::default())
}

fn harness_with(config: IndexerConfig) -> Harness {
    build(config, |store| Arc::new(store))
}

fn town(name: &str, description: &str, tags: &[&str]) -> TownInput {
    TownInput {
        name: name.to_string(),
        address: "DA-1234-5678-9012".to_string(),
        description: description.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        image: None,
    }
}

async fn all_docs(search: &Arc<dyn SearchIndexStore>, index: &str) -> Vec<SearchHit> {
    search.search(index, &SearchQuery::MatchAll, 0, 100).await.unwrap()
}

#[tokio::test]
async fn test_alice_my_town_lifecycle() {
    let h = harness();

    // First deploy: empty store, empty live generation
    let first = h.indexer.full_reindex().await.unwrap();
    assert_eq!(first.documents, 0);
    assert_eq!(first.previous, None);
    assert_eq!(h.indexer.live_generation().await.unwrap(), Some(first.generation.clone()));

    h.towns
        .create_town("alice", town("My Town", "A quiet island with apples", &["Beach"]))
        .await
        .unwrap();

    // Not searchable until the delta run
    let page = h.town_search.search_towns(Some("My Town"), None).await.unwrap();
    assert_eq!(page.total, 0);
    assert_eq!(h.stores.change_log.backlog().await.unwrap(), 1);

    let report = h.indexer.delta_reindex().await.unwrap();
    assert_eq!(report.outcome, DeltaOutcome::Processed);
    assert_eq!(report.applied, 1);
    assert_eq!(report.remaining, Some(0));

    let by_name = h.town_search.search_towns(Some("My Town"), None).await.unwrap();
    assert_eq!(by_name.total, 1);
    assert_eq!(by_name.results[0].id, "alice-my-town");
    assert_eq!(by_name.results[0].town_tags, vec!["beach"]);

    let by_tag = h.town_search.search_towns(Some("BEACH"), None).await.unwrap();
    assert_eq!(by_tag.total, 1);

    let by_description = h.town_search.search_towns(Some("apples"), None).await.unwrap();
    assert_eq!(by_description.total, 1);

    // Update reaches the index through the next delta run
    h.towns
        .update_town("alice", "my-town", town("My Town", "Now full of pears", &["Beach"]))
        .await
        .unwrap();
    h.indexer.delta_reindex().await.unwrap();

    assert_eq!(h.town_search.search_towns(Some("apples"), None).await.unwrap().total, 0);
    assert_eq!(h.town_search.search_towns(Some("pears"), None).await.unwrap().total, 1);

    // Delete removes it
    h.towns.delete_town("alice", "my-town").await.unwrap();
    h.indexer.delta_reindex().await.unwrap();

    assert_eq!(h.town_search.search_towns(None, None).await.unwrap().total, 0);
    assert_eq!(h.stores.change_log.backlog().await.unwrap(), 0);
}

#[tokio::test]
async fn test_full_reindex_replaces_and_retires_generation() {
    let h = harness();
    h.towns.create_town("alice", town("My Town", "Peaceful", &[])).await.unwrap();
    h.towns.create_town("bob", town("Bobville", "Busy", &[])).await.unwrap();

    let g1 = h.indexer.full_reindex().await.unwrap();
    assert_eq!(g1.documents, 2);

    h.towns.create_town("carol", town("Carolina", "Sunny", &[])).await.unwrap();

    let g2 = h.indexer.full_reindex().await.unwrap();
    assert_ne!(g2.generation, g1.generation);
    assert_eq!(g2.previous.as_deref(), Some(g1.generation.as_str()));
    assert!(g2.retired_previous);
    assert_eq!(g2.documents, 3);

    assert_eq!(h.search.list_indices().await.unwrap(), vec![g2.generation.clone()]);
    assert_eq!(h.indexer.live_generation().await.unwrap(), Some(g2.generation));
    assert_eq!(h.town_search.search_towns(None, None).await.unwrap().total, 3);
}

#[tokio::test]
async fn test_document_ids_stay_unique_per_town() {
    let h = harness();

    // "a-b" + "cc" would share the id of "a" + "b-cc"
    let rejected = h.towns.create_town("a-b", town("Cc", "Taken", &[])).await;
    assert!(matches!(rejected, Err(AppError::Validation(_))));

    h.towns.create_town("a", town("B Cc", "First", &[])).await.unwrap();
    h.towns.create_town("a_b", town("Cc", "Second", &[])).await.unwrap();
    h.towns.create_town("ab", town("Cc", "Third", &[])).await.unwrap();

    let report = h.indexer.full_reindex().await.unwrap();
    assert_eq!(report.documents, 3);
    let mut ids: Vec<String> = all_docs(&h.search, &report.generation)
        .await
        .into_iter()
        .map(|hit| hit.id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["a-b-cc", "a_b-cc", "ab-cc"]);

    // Deleting one town leaves the others indexed
    h.towns.delete_town("a", "b-cc").await.unwrap();
    h.indexer.delta_reindex().await.unwrap();
    assert_eq!(
        h.search.count(&report.generation, &SearchQuery::MatchAll).await.unwrap(),
        2
    );
}

#[tokio::test]
async fn test_full_and_delta_shape_documents_identically() {
    let h = harness();
    h.indexer.full_reindex().await.unwrap();

    h.towns
        .create_town("alice", town("My Town", "Peaceful", &["Beach, Fruit"]))
        .await
        .unwrap();
    h.indexer.delta_reindex().await.unwrap();
    let live = h.indexer.live_generation().await.unwrap().unwrap();
    let via_delta = all_docs(&h.search, &live).await;

    let rebuilt = h.indexer.full_reindex().await.unwrap();
    let via_full = all_docs(&h.search, &rebuilt.generation).await;

    assert_eq!(via_delta.len(), 1);
    assert_eq!(via_delta[0].id, via_full[0].id);
    assert_eq!(via_delta[0].document, via_full[0].document);
}

#[tokio::test]
async fn test_out_of_order_replay_diverges_delta_preserves_order() {
    let h = harness();
    h.indexer.full_reindex().await.unwrap();

    h.towns.create_town("alice", town("My Town", "First", &[])).await.unwrap();
    h.towns
        .update_town("alice", "my-town", town("My Town", "Second", &[]))
        .await
        .unwrap();
    h.towns.delete_town("alice", "my-town").await.unwrap();

    let events: Vec<ChangeEvent> = h.stores.change_log.pending(10).await.unwrap();
    assert_eq!(events.len(), 3);
    assert!(events.windows(2).all(|w| w[0].id < w[1].id));

    // Replaying the delete before the create resurrects the town
    let replay = "replay_scratch";
    h.search.create_index(replay, &town_index_schema()).await.unwrap();
    for event in [&events[2], &events[1], &events[0]] {
        h.indexer.apply_event(replay, event).await.unwrap();
    }
    h.search.refresh(replay).await.unwrap();
    let diverged = all_docs(&h.search, replay).await;
    assert_eq!(diverged.len(), 1);
    assert_eq!(diverged[0].document.town_description, "First");

    // The delta run applies them in log order and matches the store
    let report = h.indexer.delta_reindex().await.unwrap();
    assert_eq!(report.applied, 3);
    let live = h.indexer.live_generation().await.unwrap().unwrap();
    assert!(all_docs(&h.search, &live).await.is_empty());
    assert!(h.stores.documents.find_towns("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let h = harness();
    let report = h.indexer.full_reindex().await.unwrap();
    let live = report.generation;

    h.towns.create_town("alice", town("My Town", "Peaceful", &[])).await.unwrap();
    h.towns.delete_town("alice", "my-town").await.unwrap();
    let events = h.stores.change_log.pending(10).await.unwrap();
    let delete = &events[1];

    // Deleting a document that was never indexed succeeds
    h.indexer.apply_event(&live, delete).await.unwrap();
    h.indexer.apply_event(&live, delete).await.unwrap();

    // And so does deleting it twice after it was indexed
    h.indexer.apply_event(&live, &events[0]).await.unwrap();
    h.indexer.apply_event(&live, delete).await.unwrap();
    h.indexer.apply_event(&live, delete).await.unwrap();
    h.search.refresh(&live).await.unwrap();

    assert_eq!(h.search.count(&live, &SearchQuery::MatchAll).await.unwrap(), 0);
}

#[tokio::test]
async fn test_delta_consumes_batches_and_leaves_the_rest() {
    let h = harness_with(IndexerConfig {
        batch_size: 2,
        max_batches_per_run: 1,
        ..Default::default()
    });
    h.indexer.full_reindex().await.unwrap();

    for name in ["One", "Two", "Three", "Four", "Five"] {
        h.towns.create_town("alice", town(name, "Somewhere", &[])).await.unwrap();
    }

    let first = h.indexer.delta_reindex().await.unwrap();
    assert_eq!((first.applied, first.batches, first.remaining), (2, 1, Some(3)));
    assert_eq!(h.town_search.search_towns(None, None).await.unwrap().total, 2);

    let second = h.indexer.delta_reindex().await.unwrap();
    assert_eq!((second.applied, second.remaining), (2, Some(1)));

    let third = h.indexer.delta_reindex().await.unwrap();
    assert_eq!((third.applied, third.remaining), (1, Some(0)));

    let idle = h.indexer.delta_reindex().await.unwrap();
    assert_eq!((idle.applied, idle.batches), (0, 0));
    assert_eq!(h.town_search.search_towns(None, None).await.unwrap().total, 5);
}

#[tokio::test]
async fn test_delta_drains_several_batches_when_allowed() {
    let h = harness_with(IndexerConfig {
        batch_size: 2,
        max_batches_per_run: 10,
        ..Default::default()
    });
    h.indexer.full_reindex().await.unwrap();

    for name in ["One", "Two", "Three", "Four", "Five"] {
        h.towns.create_town("alice", town(name, "Somewhere", &[])).await.unwrap();
    }

    let report = h.indexer.delta_reindex().await.unwrap();
    assert_eq!(report.applied, 5);
    assert_eq!(report.batches, 3);
    assert_eq!(report.remaining, Some(0));
}

#[tokio::test]
async fn test_failing_event_halts_batch_in_place() {
    let h = build(IndexerConfig::default(), |inner| {
        Arc::new(TestSearchStore {
            inner,
            fail_on: Some("alice-broken".to_string()),
            gate: None,
        })
    });
    h.indexer.full_reindex().await.unwrap();

    h.towns.create_town("alice", town("Alpha", "First", &[])).await.unwrap();
    h.towns.create_town("alice", town("Broken", "Second", &[])).await.unwrap();
    h.towns.create_town("alice", town("Gamma", "Third", &[])).await.unwrap();
    let events = h.stores.change_log.pending(10).await.unwrap();

    let err = h.indexer.delta_reindex().await.unwrap_err();
    match err {
        IndexerError::BatchHalted { event_id, applied, .. } => {
            assert_eq!(event_id, events[1].id);
            assert_eq!(applied, 1);
        }
        other => panic!("expected BatchHalted, got {other:?}"),
    }

    // The applied event is gone, the failing one and its successor remain
    let left = h.stores.change_log.pending(10).await.unwrap();
    assert_eq!(left.iter().map(|e| e.id).collect::<Vec<_>>(), vec![events[1].id, events[2].id]);
    assert_eq!(h.town_search.search_towns(None, None).await.unwrap().total, 1);
}

#[tokio::test]
async fn test_failed_full_reindex_keeps_live_generation() {
    let h = build(IndexerConfig::default(), |inner| {
        Arc::new(TestSearchStore {
            inner,
            fail_on: Some("bob-broken".to_string()),
            gate: None,
        })
    });
    h.towns.create_town("alice", town("Alpha", "First", &[])).await.unwrap();
    h.towns.create_town("alice", town("Gamma", "Second", &[])).await.unwrap();
    let g1 = h.indexer.full_reindex().await.unwrap().generation;

    h.towns.create_town("bob", town("Broken", "Third", &[])).await.unwrap();
    assert!(h.indexer.full_reindex().await.is_err());

    // The pointer still names G1, which still holds every document
    assert_eq!(h.indexer.live_generation().await.unwrap(), Some(g1.clone()));
    assert_eq!(h.search.count(&g1, &SearchQuery::MatchAll).await.unwrap(), 2);

    // The half-built generation is left unpointed until the sweep
    let indices = h.search.list_indices().await.unwrap();
    assert_eq!(indices.len(), 2);
    let orphan = indices.into_iter().find(|name| *name != g1).unwrap();

    let sweep = h.indexer.sweep_orphans().await.unwrap();
    assert_eq!(sweep.removed, vec![orphan]);
    assert_eq!(h.search.list_indices().await.unwrap(), vec![g1]);
}

#[tokio::test]
async fn test_delta_without_live_generation_consumes_nothing() {
    let h = harness();
    h.towns.create_town("alice", town("My Town", "Peaceful", &[])).await.unwrap();

    let report = h.indexer.delta_reindex().await.unwrap();
    assert_eq!(report.outcome, DeltaOutcome::NoLiveIndex);
    assert_eq!(report.applied, 0);
    assert_eq!(h.stores.change_log.backlog().await.unwrap(), 1);

    // Searching without a live generation is an empty page, not an error
    let page = h.town_search.search_towns(Some("My Town"), Some(3)).await.unwrap();
    assert_eq!((page.total, page.total_pages, page.current_page), (0, 1, 1));
}

#[tokio::test]
async fn test_delta_reports_busy_during_full_reindex() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let gate = (entered.clone(), release.clone());
    let h = build(IndexerConfig::default(), move |inner| {
        Arc::new(TestSearchStore {
            inner,
            fail_on: None,
            gate: Some(gate),
        })
    });
    h.towns.create_town("alice", town("My Town", "Peaceful", &[])).await.unwrap();

    let indexer = h.indexer.clone();
    let full = tokio::spawn(async move { indexer.full_reindex().await });

    // Full reindex is now parked inside index_document, holding the run lock
    entered.notified().await;
    let report = h.indexer.delta_reindex().await.unwrap();
    assert_eq!(report.outcome, DeltaOutcome::Busy);
    assert_eq!(h.stores.change_log.backlog().await.unwrap(), 1);

    release.notify_one();
    let full = full.await.unwrap().unwrap();
    assert_eq!(full.documents, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pointer_readers_only_see_complete_generations() {
    let h = harness();
    for i in 0..25 {
        h.towns
            .create_town("alice", town(&format!("Town {}", i), "Somewhere", &[]))
            .await
            .unwrap();
    }
    h.indexer.full_reindex().await.unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let mut readers = Vec::new();
    for _ in 0..4 {
        let stop = stop.clone();
        let pointer = h.stores.pointer.clone();
        let search = h.search.clone();
        readers.push(tokio::spawn(async move {
            let mut observed = 0usize;
            while !stop.load(Ordering::Relaxed) {
                let live = pointer.get("towns").await.unwrap();
                let live = live.expect("pointer is never unset once a generation is live");
                // A retired generation may vanish between the two calls;
                // a readable one must hold every town.
                if let Ok(count) = search.count(&live, &SearchQuery::MatchAll).await {
                    assert_eq!(count, 25, "generation {} was incomplete", live);
                    observed += 1;
                }
                tokio::task::yield_now().await;
            }
            observed
        }));
    }

    for _ in 0..3 {
        h.indexer.full_reindex().await.unwrap();
    }
    stop.store(true, Ordering::Relaxed);

    let mut observed = 0;
    for reader in readers {
        observed += reader.await.unwrap();
    }
    assert!(observed > 0);
}

#[tokio::test]
async fn test_sweep_removes_only_orphaned_generations() {
    let h = harness();

    // Nothing is live yet, so nothing may be removed
    let orphan = generation_name("towns", 1);
    h.search.create_index(&orphan, &town_index_schema()).await.unwrap();
    let idle = h.indexer.sweep_orphans().await.unwrap();
    assert!(idle.removed.is_empty());

    let live = h.indexer.full_reindex().await.unwrap().generation;
    h.search.create_index("villagers_1", &town_index_schema()).await.unwrap();

    let report = h.indexer.sweep_orphans().await.unwrap();
    assert_eq!(report.live.as_deref(), Some(live.as_str()));
    assert_eq!(report.removed, vec![orphan]);

    let mut expected = vec![live.clone(), "villagers_1".to_string()];
    expected.sort();
    assert_eq!(h.search.list_indices().await.unwrap(), expected);

    let status = h.indexer.status().await.unwrap();
    assert_eq!(status.live_generation, Some(live.clone()));
    assert_eq!(status.generations, vec![live]);
    assert_eq!(status.live_documents, Some(0));
    assert_eq!(status.backlog, 0);
}
