pub mod factory;
pub mod redis_store;
pub mod sled_store;
pub mod store;

pub use factory::{create_in_memory_stores, create_stores, Stores};
pub use redis_store::RedisPointerCache;
pub use sled_store::SledStore;
pub use store::*;

use crate::error::Result;
use crate::models::{ChangeEvent, ChangeId, Town, TownKey};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Primary record of towns.
///
/// Every mutation appends exactly one [`ChangeEvent`] in the same
/// transaction as the entity write and returns it. Implementations must not
/// expose a way to write one without the other.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new town. Fails with `Conflict` if the key is taken.
    async fn insert_town(&self, town: &Town) -> Result<ChangeEvent>;

    /// Replace an existing town. Fails with `NotFound` if absent.
    async fn update_town(&self, town: &Town) -> Result<ChangeEvent>;

    /// Delete a town. Fails with `NotFound` if absent.
    async fn delete_town(&self, key: &TownKey) -> Result<ChangeEvent>;

    /// Find a town by key
    async fn find_town(&self, key: &TownKey) -> Result<Option<Town>>;

    /// All towns of one owner, ordered by town id
    async fn find_towns(&self, owner: &str) -> Result<Vec<Town>>;

    /// Lazily walk every town. Each call starts a fresh walk.
    fn stream_towns(&self) -> BoxStream<'static, Result<Town>>;
}

/// Append-only log of town mutations, consumed by the delta indexer.
#[async_trait]
pub trait ChangeLog: Send + Sync {
    /// Up to `limit` oldest unconsumed events, in insertion order
    async fn pending(&self, limit: usize) -> Result<Vec<ChangeEvent>>;

    /// Remove a consumed event. Removing an unknown id is not an error.
    async fn acknowledge(&self, id: ChangeId) -> Result<()>;

    /// Number of unconsumed events
    async fn backlog(&self) -> Result<u64>;
}

/// Single-slot mapping from a logical index name to its live generation.
#[async_trait]
pub trait IndexPointerCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Atomically store `value` and return the value it replaced.
    async fn replace(&self, key: &str, value: &str) -> Result<Option<String>>;
}
