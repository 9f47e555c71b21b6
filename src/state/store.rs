use crate::error::{AppError, Result};
use crate::models::{ChangeEvent, ChangeId, Town, TownKey};
use crate::state::{ChangeLog, DocumentStore, IndexPointerCache};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Default)]
struct Tables {
    towns: BTreeMap<TownKey, Town>,
    events: BTreeMap<ChangeId, ChangeEvent>,
    next_event_id: u64,
}

impl Tables {
    fn next_id(&mut self) -> ChangeId {
        self.next_event_id += 1;
        ChangeId(self.next_event_id)
    }
}

/// In-memory town store and change log (for development and testing).
///
/// Both tables sit behind one mutex, so an entity write and its change
/// event are applied together or not at all.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn insert_town(&self, town: &Town) -> Result<ChangeEvent> {
        let mut tables = self.tables.lock();
        if tables.towns.contains_key(&town.key) {
            return Err(AppError::Conflict(format!("Town {} already exists", town.key)));
        }

        let event = ChangeEvent::created(tables.next_id(), town);
        tables.towns.insert(town.key.clone(), town.clone());
        tables.events.insert(event.id, event.clone());

        tracing::debug!(town = %town.key, event_id = %event.id, "Town created");
        Ok(event)
    }

    async fn update_town(&self, town: &Town) -> Result<ChangeEvent> {
        let mut tables = self.tables.lock();
        if !tables.towns.contains_key(&town.key) {
            return Err(AppError::NotFound(format!("Town {} not found", town.key)));
        }

        let event = ChangeEvent::updated(tables.next_id(), town);
        tables.towns.insert(town.key.clone(), town.clone());
        tables.events.insert(event.id, event.clone());

        tracing::debug!(town = %town.key, event_id = %event.id, "Town updated");
        Ok(event)
    }

    async fn delete_town(&self, key: &TownKey) -> Result<ChangeEvent> {
        let mut tables = self.tables.lock();
        if tables.towns.remove(key).is_none() {
            return Err(AppError::NotFound(format!("Town {} not found", key)));
        }

        let event = ChangeEvent::deleted(tables.next_id(), key);
        tables.events.insert(event.id, event.clone());

        tracing::debug!(town = %key, event_id = %event.id, "Town deleted");
        Ok(event)
    }

    async fn find_town(&self, key: &TownKey) -> Result<Option<Town>> {
        Ok(self.tables.lock().towns.get(key).cloned())
    }

    async fn find_towns(&self, owner: &str) -> Result<Vec<Town>> {
        Ok(self
            .tables
            .lock()
            .towns
            .values()
            .filter(|town| town.key.owner == owner)
            .cloned()
            .collect())
    }

    fn stream_towns(&self) -> BoxStream<'static, Result<Town>> {
        let towns: Vec<Town> = self.tables.lock().towns.values().cloned().collect();
        stream::iter(towns.into_iter().map(Ok)).boxed()
    }
}

#[async_trait]
impl ChangeLog for InMemoryStore {
    async fn pending(&self, limit: usize) -> Result<Vec<ChangeEvent>> {
        Ok(self
            .tables
            .lock()
            .events
            .values()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn acknowledge(&self, id: ChangeId) -> Result<()> {
        self.tables.lock().events.remove(&id);
        Ok(())
    }

    async fn backlog(&self) -> Result<u64> {
        Ok(self.tables.lock().events.len() as u64)
    }
}

/// Process-local pointer cache. Only suitable when a single process both
/// serves searches and runs the indexer.
#[derive(Clone, Default)]
pub struct InMemoryPointerCache {
    slots: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryPointerCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IndexPointerCache for InMemoryPointerCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.slots.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn replace(&self, key: &str, value: &str) -> Result<Option<String>> {
        Ok(self.slots.write().insert(key.to_string(), value.to_string()))
    }
}
