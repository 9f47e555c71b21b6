use crate::error::{AppError, Result};
use crate::models::{ChangeEvent, ChangeId, Town, TownKey};
use crate::state::{ChangeLog, DocumentStore, IndexPointerCache};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use sled::transaction::{
    ConflictableTransactionError, TransactionError, TransactionalTree, Transactional,
};
use sled::Db;
use std::path::Path;
use std::sync::Arc;

const SEQ_KEY: &[u8] = b"next_event_id";

/// Persistent town store, change log and pointer cache using Sled
///
/// Town writes and their change events commit in one multi-tree
/// transaction. The event id counter is read and written inside that
/// transaction, so conflicting writers serialize and ids follow commit order.
#[derive(Clone)]
pub struct SledStore {
    db: Arc<Db>,
    towns_tree: sled::Tree,
    events_tree: sled::Tree,
    seq_tree: sled::Tree,
    pointers_tree: sled::Tree,
}

impl SledStore {
    /// Open (or create) a Sled store at the specified path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path.as_ref()).map_err(|e| {
            AppError::Database(format!("Failed to open Sled database: {}", e))
        })?;

        let towns_tree = db.open_tree("towns")?;
        let events_tree = db.open_tree("town_events")?;
        let seq_tree = db.open_tree("town_event_seq")?;
        let pointers_tree = db.open_tree("index_pointers")?;

        tracing::info!(path = ?path.as_ref(), "Initialized Sled store");

        Ok(Self {
            db: Arc::new(db),
            towns_tree,
            events_tree,
            seq_tree,
            pointers_tree,
        })
    }

    fn town_key(key: &TownKey) -> Vec<u8> {
        let mut bytes = Self::owner_prefix(&key.owner);
        bytes.extend_from_slice(key.town_id.as_bytes());
        bytes
    }

    fn owner_prefix(owner: &str) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(owner.len() + 1);
        bytes.extend_from_slice(owner.as_bytes());
        bytes.push(0);
        bytes
    }

    fn decode_town(bytes: &[u8]) -> Result<Town> {
        Ok(bincode::deserialize(bytes)?)
    }

    fn decode_event(bytes: &[u8]) -> Result<ChangeEvent> {
        Ok(bincode::deserialize(bytes)?)
    }

    fn abort<T>(err: impl Into<AppError>) -> std::result::Result<T, ConflictableTransactionError<AppError>> {
        Err(ConflictableTransactionError::Abort(err.into()))
    }

    /// Allocate the next event id inside a transaction
    fn next_event_id(
        seq: &TransactionalTree,
    ) -> std::result::Result<ChangeId, ConflictableTransactionError<AppError>> {
        let current = match seq.get(SEQ_KEY)? {
            Some(bytes) => match <[u8; 8]>::try_from(bytes.as_ref()) {
                Ok(raw) => u64::from_be_bytes(raw),
                Err(_) => {
                    return Self::abort(AppError::Database(
                        "Corrupt change event sequence".to_string(),
                    ))
                }
            },
            None => 0,
        };

        let next = current + 1;
        seq.insert(SEQ_KEY, &next.to_be_bytes()[..])?;
        Ok(ChangeId(next))
    }

    /// Write a town (or remove it when `town` is `None`) together with its
    /// change event. `must_exist` selects update/delete vs insert semantics.
    fn commit(
        &self,
        key: &TownKey,
        town: Option<&Town>,
        must_exist: bool,
    ) -> Result<ChangeEvent> {
        let town_key = Self::town_key(key);
        let town_bytes = match town {
            Some(town) => Some(bincode::serialize(town)?),
            None => None,
        };

        let result = (&self.towns_tree, &self.events_tree, &self.seq_tree).transaction(
            |(towns, events, seq)| {
                let exists = towns.get(&town_key)?.is_some();
                if must_exist && !exists {
                    return Self::abort(AppError::NotFound(format!("Town {} not found", key)));
                }
                if !must_exist && exists {
                    return Self::abort(AppError::Conflict(format!(
                        "Town {} already exists",
                        key
                    )));
                }

                let id = Self::next_event_id(seq)?;
                let event = match town {
                    Some(town) if must_exist => ChangeEvent::updated(id, town),
                    Some(town) => ChangeEvent::created(id, town),
                    None => ChangeEvent::deleted(id, key),
                };

                match &town_bytes {
                    Some(bytes) => {
                        towns.insert(town_key.as_slice(), bytes.as_slice())?;
                    }
                    None => {
                        towns.remove(town_key.as_slice())?;
                    }
                }

                let event_bytes = match bincode::serialize(&event) {
                    Ok(bytes) => bytes,
                    Err(e) => return Self::abort(e),
                };
                events.insert(&id.to_key()[..], event_bytes)?;

                Ok(event)
            },
        );

        result.map_err(|e| match e {
            TransactionError::Abort(err) => err,
            TransactionError::Storage(err) => AppError::from(err),
        })
    }

    /// Flush pending writes to disk
    pub async fn flush(&self) -> Result<()> {
        self.db.flush_async().await?;
        Ok(())
    }

    /// Get database size in bytes
    pub fn size_on_disk(&self) -> Result<u64> {
        Ok(self.db.size_on_disk()?)
    }
}

#[async_trait]
impl DocumentStore for SledStore {
    async fn insert_town(&self, town: &Town) -> Result<ChangeEvent> {
        let event = self.commit(&town.key, Some(town), false)?;
        self.flush().await?;

        tracing::debug!(town = %town.key, event_id = %event.id, "Town created in Sled");
        Ok(event)
    }

    async fn update_town(&self, town: &Town) -> Result<ChangeEvent> {
        let event = self.commit(&town.key, Some(town), true)?;
        self.flush().await?;

        tracing::debug!(town = %town.key, event_id = %event.id, "Town updated in Sled");
        Ok(event)
    }

    async fn delete_town(&self, key: &TownKey) -> Result<ChangeEvent> {
        let event = self.commit(key, None, true)?;
        self.flush().await?;

        tracing::debug!(town = %key, event_id = %event.id, "Town deleted from Sled");
        Ok(event)
    }

    async fn find_town(&self, key: &TownKey) -> Result<Option<Town>> {
        match self.towns_tree.get(Self::town_key(key))? {
            Some(bytes) => Ok(Some(Self::decode_town(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn find_towns(&self, owner: &str) -> Result<Vec<Town>> {
        self.towns_tree
            .scan_prefix(Self::owner_prefix(owner))
            .values()
            .map(|value| Self::decode_town(&value?))
            .collect()
    }

    fn stream_towns(&self) -> BoxStream<'static, Result<Town>> {
        let values = self
            .towns_tree
            .iter()
            .values()
            .map(|value| Self::decode_town(&value?));
        stream::iter(values).boxed()
    }
}

#[async_trait]
impl ChangeLog for SledStore {
    async fn pending(&self, limit: usize) -> Result<Vec<ChangeEvent>> {
        self.events_tree
            .iter()
            .values()
            .take(limit)
            .map(|value| Self::decode_event(&value?))
            .collect()
    }

    async fn acknowledge(&self, id: ChangeId) -> Result<()> {
        self.events_tree.remove(id.to_key())?;
        self.flush().await
    }

    async fn backlog(&self) -> Result<u64> {
        Ok(self.events_tree.len() as u64)
    }
}

#[async_trait]
impl IndexPointerCache for SledStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.pointers_tree.get(key)? {
            Some(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.pointers_tree.insert(key, value.as_bytes())?;
        self.flush().await
    }

    async fn replace(&self, key: &str, value: &str) -> Result<Option<String>> {
        let previous = self.pointers_tree.insert(key, value.as_bytes())?;
        self.flush().await?;
        Ok(previous.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }
}
